//! Event Mapper & Stream State Machine (spec §4.4).
//!
//! Grounded on `ResponsesAPIStreamBuffer` in the reference responses-API
//! streaming buffer (`other_examples/28170f28_...`) for the overall
//! per-stream-state shape, and on the teacher's `ToolCallAssembler`
//! (`llm/provider.rs`) for the index→partial-call bookkeeping that precedes
//! a `ToolCallDone` reaching this mapper.

use std::collections::HashMap;

use crate::ids;
use crate::model::{Item, ItemKind, ItemStatus, OutputContentPart, ProviderEvent, StreamEvent};

#[derive(Debug, Clone)]
struct ToolCallState {
    item_id: String,
    output_index: usize,
}

/// Per-stream state carried across the life of one streaming response.
#[derive(Debug, Default)]
pub struct StreamMapper {
    seq: u64,
    next_output_index: usize,

    text_item_id: Option<String>,
    text_output_index: Option<usize>,
    text_started: bool,

    reasoning_item_id: Option<String>,
    reasoning_output_index: Option<usize>,
    reasoning_started: bool,
    reasoning_done: bool,
    reasoning_accum: String,

    tool_calls: HashMap<usize, ToolCallState>,

    /// Tool-call items completed so far this turn, in completion order.
    pub completed_tool_calls: Vec<Item>,

    /// Reasoning items flushed so far this turn (spec §4.4: reasoning
    /// precedes the text message item in `output`). Drained by the
    /// orchestrator alongside `completed_tool_calls`.
    pub reasoning_items: Vec<Item>,
}

impl StreamMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// The item id allocated for the in-progress text message, once text has
    /// started (used by the orchestrator to emit `output_item.added` /
    /// `content_part.added` for the message item itself).
    pub fn text_item_id(&self) -> Option<&str> {
        self.text_item_id.as_deref()
    }

    pub fn text_output_index(&self) -> Option<usize> {
        self.text_output_index
    }

    pub fn text_started(&self) -> bool {
        self.text_started
    }

    /// The shared sequence counter (spec §4.4: "holds per-stream state: seq,
    /// starts at 0"). The mapper is the sole owner of this counter; the
    /// orchestrator draws from it directly for the events it emits itself
    /// (`response.created`, the text message's `output_item`/`content_part`
    /// lifecycle, and the terminal `response.*` event) so that every event
    /// on the wire carries one monotonic sequence regardless of which side
    /// produced it.
    pub fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    pub fn alloc_output_index(&mut self) -> usize {
        let index = self.next_output_index;
        self.next_output_index += 1;
        index
    }

    /// Seed the output-index counter from items already present before
    /// streaming began (e.g. a reasoning item replayed into an agentic
    /// loop's subsequent turn). Most single-shot streams start at zero.
    pub fn seed_output_index(&mut self, starting_at: usize) {
        self.next_output_index = starting_at;
    }

    fn reasoning_done_sequence(&mut self) -> Vec<StreamEvent> {
        if !self.reasoning_started || self.reasoning_done {
            return Vec::new();
        }
        self.reasoning_done = true;
        let item_id = self.reasoning_item_id.clone().unwrap_or_default();
        let output_index = self.reasoning_output_index.unwrap_or(0);
        let mut events = vec![StreamEvent::ReasoningDone {
            sequence_number: self.next_seq(),
            item_id: item_id.clone(),
            output_index,
            content_index: 0,
            delta: self.reasoning_accum.clone(),
        }];
        let item = Item::new(
            item_id,
            ItemStatus::Completed,
            ItemKind::Reasoning {
                content: self.reasoning_accum.clone(),
            },
        );
        events.push(StreamEvent::OutputItemDone {
            sequence_number: self.next_seq(),
            output_index,
            item: item.clone(),
        });
        self.reasoning_items.push(item);
        // Leave a gap so subsequent text appears after reasoning (spec §4.4).
        self.alloc_output_index();
        events
    }

    /// Force-flush a pending reasoning item that never got a chance to flush
    /// inline (the turn ended with tool calls or no further text after
    /// reasoning). A no-op if no reasoning is pending.
    pub fn flush_reasoning(&mut self) -> Vec<StreamEvent> {
        self.reasoning_done_sequence()
    }

    /// Allocate (or return the existing) item id/output_index for the
    /// in-progress text message, flushing any pending reasoning first
    /// (reasoning precedes text in `output`, spec §4.4). The orchestrator
    /// calls this before the first non-empty `TextDelta` reaches [`map`], so
    /// it can emit `output_item.added`/`content_part.added` for the message
    /// item with sequence numbers that precede the delta's own.
    pub fn begin_text_item(&mut self) -> (Vec<StreamEvent>, String, usize) {
        if let Some(item_id) = self.text_item_id.clone() {
            return (Vec::new(), item_id, self.text_output_index.unwrap_or(0));
        }
        let events = self.reasoning_done_sequence();
        let item_id = ids::generate_item_id();
        let output_index = self.alloc_output_index();
        self.text_item_id = Some(item_id.clone());
        self.text_output_index = Some(output_index);
        (events, item_id, output_index)
    }

    /// Reset per-turn state between agentic-loop turns (spec §4.6): the
    /// text/reasoning/tool-call bookkeeping starts fresh for the next turn,
    /// but `seq` and the output-index counter keep growing across the whole
    /// response.
    pub fn reset_for_next_turn(&mut self) {
        self.text_item_id = None;
        self.text_output_index = None;
        self.text_started = false;
        self.reasoning_item_id = None;
        self.reasoning_output_index = None;
        self.reasoning_started = false;
        self.reasoning_done = false;
        self.reasoning_accum.clear();
        self.tool_calls.clear();
        self.completed_tool_calls.clear();
        self.reasoning_items.clear();
    }

    /// Map one `ProviderEvent` to the ordered `StreamEvent`s it produces.
    /// `Done`/`Error` are handled by the orchestrator and never passed here.
    pub fn map(&mut self, event: ProviderEvent) -> Vec<StreamEvent> {
        match event {
            ProviderEvent::TextDelta { delta } if delta.is_empty() && !self.text_started => {
                self.text_started = true;
                Vec::new()
            }
            ProviderEvent::TextDelta { delta } if !delta.is_empty() => {
                let mut events = self.reasoning_done_sequence();
                if self.text_item_id.is_none() {
                    self.text_item_id = Some(ids::generate_item_id());
                    self.text_output_index = Some(self.alloc_output_index());
                }
                self.text_started = true;
                events.push(StreamEvent::OutputTextDelta {
                    sequence_number: self.next_seq(),
                    item_id: self.text_item_id.clone().unwrap_or_default(),
                    output_index: self.text_output_index.unwrap_or(0),
                    content_index: 0,
                    delta,
                });
                events
            }
            ProviderEvent::TextDelta { .. } => Vec::new(),
            ProviderEvent::TextDone { r#final } => {
                if !self.text_started {
                    return Vec::new();
                }
                vec![StreamEvent::OutputTextDone {
                    sequence_number: self.next_seq(),
                    item_id: self.text_item_id.clone().unwrap_or_default(),
                    output_index: self.text_output_index.unwrap_or(0),
                    content_index: 0,
                    delta: r#final,
                }]
            }
            ProviderEvent::ToolCallDelta {
                index,
                call_id,
                function_name,
                delta,
            } => {
                let mut events = Vec::new();
                if !self.tool_calls.contains_key(&index) {
                    let item_id = ids::generate_item_id();
                    let output_index = self.alloc_output_index();
                    events.push(StreamEvent::OutputItemAdded {
                        sequence_number: self.next_seq(),
                        output_index,
                        item: Item::new(
                            item_id.clone(),
                            ItemStatus::InProgress,
                            ItemKind::FunctionCall {
                                name: function_name.unwrap_or_default(),
                                call_id: call_id.unwrap_or_default(),
                                arguments: String::new(),
                            },
                        ),
                    });
                    self.tool_calls.insert(index, ToolCallState { item_id, output_index });
                }
                if !delta.is_empty() {
                    let state = &self.tool_calls[&index];
                    events.push(StreamEvent::FunctionCallArgumentsDelta {
                        sequence_number: self.next_seq(),
                        item_id: state.item_id.clone(),
                        output_index: state.output_index,
                        delta,
                    });
                }
                events
            }
            ProviderEvent::ToolCallDone { index, item } => {
                let Some(state) = self.tool_calls.get(&index).cloned() else {
                    return Vec::new();
                };
                let arguments = match &item.kind {
                    ItemKind::FunctionCall { arguments, .. } => arguments.clone(),
                    _ => String::new(),
                };
                let mut completed = item;
                completed.id = state.item_id.clone();
                completed.status = ItemStatus::Completed;
                self.completed_tool_calls.push(completed.clone());
                vec![
                    StreamEvent::FunctionCallArgumentsDone {
                        sequence_number: self.next_seq(),
                        item_id: state.item_id.clone(),
                        output_index: state.output_index,
                        delta: arguments,
                    },
                    StreamEvent::OutputItemDone {
                        sequence_number: self.next_seq(),
                        output_index: state.output_index,
                        item: completed,
                    },
                ]
            }
            ProviderEvent::ReasoningDelta { delta } if !delta.is_empty() => {
                let mut events = Vec::new();
                if !self.reasoning_started {
                    self.reasoning_started = true;
                    self.reasoning_item_id = Some(ids::generate_item_id());
                    self.reasoning_output_index = Some(self.alloc_output_index());
                    events.push(StreamEvent::OutputItemAdded {
                        sequence_number: self.next_seq(),
                        output_index: self.reasoning_output_index.unwrap_or(0),
                        item: Item::new(
                            self.reasoning_item_id.clone().unwrap_or_default(),
                            ItemStatus::InProgress,
                            ItemKind::Reasoning { content: String::new() },
                        ),
                    });
                }
                self.reasoning_accum.push_str(&delta);
                events.push(StreamEvent::ReasoningDelta {
                    sequence_number: self.next_seq(),
                    item_id: self.reasoning_item_id.clone().unwrap_or_default(),
                    output_index: self.reasoning_output_index.unwrap_or(0),
                    content_index: 0,
                    delta,
                });
                events
            }
            ProviderEvent::ReasoningDelta { .. } => Vec::new(),
            ProviderEvent::ReasoningDone => self.reasoning_done_sequence(),
            ProviderEvent::Done { .. } | ProviderEvent::Error { .. } => Vec::new(),
        }
    }

    /// The output part accumulated for the in-progress text message, for the
    /// orchestrator to embed in its own `content_part`/`output_item` events
    /// (spec §4.4: "content-part lifecycle for text ... is emitted by the
    /// orchestrator, not the mapper").
    pub fn text_part(&self, accumulated: &str) -> OutputContentPart {
        OutputContentPart::OutputText {
            text: accumulated.to_string(),
        }
    }
}
