//! Loop detection for the agentic loop (spec §4.6, SPEC_FULL ambient
//! addition): detect repetitive tool-calling patterns that indicate the
//! model is stuck.
//!
//! Carried near-verbatim from the teacher's `llm/loop_detector.rs`,
//! generalized from the teacher's own `ToolCall{id,name,arguments}` to this
//! crate's `model::ToolCall` (`item_id, call_id, name, arguments`) — loop
//! equality still compares only `name` and `arguments`.

use std::collections::VecDeque;

use serde_json::Value;

use crate::model::ToolCall;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Warn,
    Terminate,
}

#[derive(Debug, Clone)]
pub struct LoopDetectorConfig {
    pub max_exact_duplicates: usize,
    pub exact_window_size: usize,
    pub enable_pattern_detection: bool,
    pub min_pattern_length: usize,
    pub max_pattern_length: usize,
    pub pattern_window_size: usize,
    pub first_detection_action: LoopAction,
    pub second_detection_action: LoopAction,
    pub third_detection_action: LoopAction,
}

impl Default for LoopDetectorConfig {
    fn default() -> Self {
        Self {
            max_exact_duplicates: 3,
            exact_window_size: 10,
            enable_pattern_detection: true,
            min_pattern_length: 2,
            max_pattern_length: 3,
            pattern_window_size: 20,
            first_detection_action: LoopAction::Warn,
            second_detection_action: LoopAction::Warn,
            third_detection_action: LoopAction::Terminate,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopType {
    ExactDuplicate { call: ToolCall, count: usize },
    Pattern { pattern: Vec<ToolCall>, repetitions: usize },
}

#[derive(Debug, Clone)]
pub struct LoopDetection {
    pub detected: bool,
    pub loop_type: LoopType,
    pub confidence: f64,
    pub suggestion: String,
    pub action: LoopAction,
    pub detection_count: usize,
    pub warning_message: Option<String>,
}

#[derive(Debug, Clone)]
struct CallRecord {
    call: ToolCall,
}

pub struct LoopDetector {
    config: LoopDetectorConfig,
    recent_calls: VecDeque<CallRecord>,
    detection_count: usize,
}

impl LoopDetector {
    pub fn new() -> Self {
        Self::with_config(LoopDetectorConfig::default())
    }

    pub fn with_config(config: LoopDetectorConfig) -> Self {
        let capacity = config.exact_window_size.max(config.pattern_window_size);
        Self {
            config,
            recent_calls: VecDeque::with_capacity(capacity),
            detection_count: 0,
        }
    }

    /// Check for loops before executing a tool call.
    pub fn check(&mut self, call: &ToolCall) -> Option<LoopDetection> {
        if let Some(mut detection) = self.check_exact_duplicate(call) {
            self.detection_count += 1;
            self.apply_action_policy(&mut detection);
            self.record_call(call);
            return Some(detection);
        }

        if self.config.enable_pattern_detection {
            if let Some(mut detection) = self.check_pattern(call) {
                self.detection_count += 1;
                self.apply_action_policy(&mut detection);
                self.record_call(call);
                return Some(detection);
            }
        }

        self.record_call(call);
        None
    }

    fn apply_action_policy(&self, detection: &mut LoopDetection) {
        detection.detection_count = self.detection_count;
        let action = match self.detection_count {
            1 => self.config.first_detection_action,
            2 => self.config.second_detection_action,
            _ => self.config.third_detection_action,
        };
        detection.action = action;
        if action == LoopAction::Warn {
            detection.warning_message = Some(self.generate_warning_message(detection));
        }
    }

    fn generate_warning_message(&self, detection: &LoopDetection) -> String {
        let ordinal = match self.detection_count {
            1 => "first",
            2 => "second",
            3 => "third",
            n => return format!("Loop detected {n} times"),
        };

        let loop_description = match &detection.loop_type {
            LoopType::ExactDuplicate { call, count } => format!(
                "You have called the tool '{}' with identical arguments {} times in a row",
                call.name, count
            ),
            LoopType::Pattern { pattern, repetitions } => {
                let tool_names: Vec<_> = pattern.iter().map(|c| c.name.as_str()).collect();
                format!(
                    "You are repeating a pattern of {} tool calls: [{}] (repeated {} times)",
                    pattern.len(),
                    tool_names.join(" → "),
                    repetitions
                )
            }
        };

        format!(
            "LOOP DETECTION WARNING ({ordinal}): {loop_description}\n\n\
             This appears to be unproductive behavior. Please consider:\n\
             1. Trying a completely different approach\n\
             2. Asking the user for more information or clarification\n\
             3. Acknowledging the limitation and explaining what you've tried\n\
             4. Using a different tool or strategy\n\n\
             If you continue with the same pattern, the system may terminate the conversation."
        )
    }

    fn check_exact_duplicate(&self, call: &ToolCall) -> Option<LoopDetection> {
        let count = self
            .recent_calls
            .iter()
            .rev()
            .take(self.config.exact_window_size)
            .filter(|r| Self::calls_equal(&r.call, call))
            .count();

        if count >= self.config.max_exact_duplicates {
            Some(LoopDetection {
                detected: true,
                loop_type: LoopType::ExactDuplicate {
                    call: call.clone(),
                    count: count + 1,
                },
                confidence: 1.0,
                suggestion: format!(
                    "The tool '{}' has been called {} times with identical arguments. \
                     This appears to be an infinite loop.",
                    call.name,
                    count + 1
                ),
                action: LoopAction::Warn,
                detection_count: 0,
                warning_message: None,
            })
        } else {
            None
        }
    }

    fn check_pattern(&self, call: &ToolCall) -> Option<LoopDetection> {
        let min_required = self.config.min_pattern_length * 2;
        if self.recent_calls.len() < min_required {
            return None;
        }

        for pattern_len in self.config.min_pattern_length..=self.config.max_pattern_length {
            if let Some(detection) = self.check_pattern_of_length(call, pattern_len) {
                return Some(detection);
            }
        }

        None
    }

    fn check_pattern_of_length(&self, call: &ToolCall, pattern_len: usize) -> Option<LoopDetection> {
        if self.recent_calls.len() < pattern_len * 2 {
            return None;
        }

        let recent: Vec<_> = self.recent_calls.iter().rev().take(pattern_len).collect();
        let prev_pattern: Vec<_> = self
            .recent_calls
            .iter()
            .rev()
            .skip(pattern_len)
            .take(pattern_len)
            .collect();

        let matches = recent
            .iter()
            .zip(prev_pattern.iter())
            .all(|(a, b)| Self::calls_equal(&a.call, &b.call));

        if !matches {
            return None;
        }

        if !Self::calls_equal(call, &recent[recent.len() - 1].call) {
            return None;
        }

        let pattern: Vec<ToolCall> = recent.iter().rev().map(|r| r.call.clone()).collect();

        Some(LoopDetection {
            detected: true,
            loop_type: LoopType::Pattern {
                pattern: pattern.clone(),
                repetitions: 2,
            },
            confidence: 1.0,
            suggestion: format!(
                "Detected a repeating pattern of {pattern_len} tool calls. \
                 The pattern has repeated at least 2 times."
            ),
            action: LoopAction::Warn,
            detection_count: 0,
            warning_message: None,
        })
    }

    fn record_call(&mut self, call: &ToolCall) {
        let max_size = self.config.exact_window_size.max(self.config.pattern_window_size);
        if self.recent_calls.len() >= max_size {
            self.recent_calls.pop_front();
        }
        self.recent_calls.push_back(CallRecord { call: call.clone() });
    }

    fn calls_equal(a: &ToolCall, b: &ToolCall) -> bool {
        a.name == b.name && Self::arguments_equal(&a.arguments, &b.arguments)
    }

    fn arguments_equal(a: &Value, b: &Value) -> bool {
        a == b
    }

    pub fn tracked_count(&self) -> usize {
        self.recent_calls.len()
    }

    pub fn clear(&mut self) {
        self.recent_calls.clear();
        self.detection_count = 0;
    }

    pub fn detection_count(&self) -> usize {
        self.detection_count
    }
}

impl Default for LoopDetector {
    fn default() -> Self {
        Self::new()
    }
}
