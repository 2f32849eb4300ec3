//! Conversation history reconstruction from `previous_response_id` (spec
//! §4.7).
//!
//! No direct teacher counterpart — the teacher tracks history as an
//! in-memory `Vec<Message>` on the provider itself (`llm/openai.rs`'s
//! `history: Arc<RwLock<Vec<Message>>>`); this generalizes that to a
//! store-backed chain walk, reusing the item projection from
//! `translate::request`.

use std::collections::HashSet;

use crate::error::ApiError;
use crate::model::ProviderMessage;
use crate::store::ResponseStore;
use crate::translate::request::translate_item;

/// Walk the `previous_response_id` chain back to its root, then replay every
/// item (input then output, per response, oldest response first) through the
/// same item-to-message projection request translation uses.
pub async fn reconstruct_history(
    store: &dyn ResponseStore,
    previous_response_id: &str,
) -> Result<Vec<ProviderMessage>, ApiError> {
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    let mut current = previous_response_id.to_string();

    loop {
        if !visited.insert(current.clone()) {
            return Err(ApiError::invalid_request(
                "previous_response_id",
                format!("cycle detected while reconstructing history at {current}"),
            ));
        }

        let response = store
            .get_response(&current)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("no response found for id {current}")))?;

        let next = response.previous_response_id.clone();
        chain.push(response);

        match next {
            Some(id) => current = id,
            None => break,
        }
    }

    // Chain was collected newest-first; replay oldest-first.
    chain.reverse();

    let mut messages = Vec::new();
    for response in &chain {
        for item in response.input.iter().chain(response.output.iter()) {
            if let Some(message) = translate_item(item) {
                messages.push(message);
            }
        }
    }

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::model::{Item, Response, ResponseStatus, Usage};

    #[derive(Default)]
    struct InMemoryStore(Mutex<HashMap<String, Response>>);

    #[async_trait]
    impl ResponseStore for InMemoryStore {
        async fn get_response(&self, id: &str) -> Result<Option<Response>, ApiError> {
            Ok(self.0.lock().unwrap().get(id).cloned())
        }

        async fn save_response(&self, response: &Response) -> Result<(), ApiError> {
            self.0
                .lock()
                .unwrap()
                .insert(response.id.clone(), response.clone());
            Ok(())
        }
    }

    fn bare_response(id: &str, previous: Option<&str>, input: Vec<Item>, output: Vec<Item>) -> Response {
        Response {
            id: id.to_string(),
            object: "response".into(),
            status: ResponseStatus::Completed,
            output,
            input,
            model: "m".into(),
            usage: Usage::default(),
            error: None,
            previous_response_id: previous.map(str::to_string),
            created_at: 0,
            tools: vec![],
            tool_choice: crate::model::ToolChoice::default_auto(),
            truncation: crate::model::Truncation::default(),
            store: true,
            text: crate::model::TextOptions::default(),
            service_tier: "default".into(),
            metadata: Default::default(),
            temperature: None,
            top_p: None,
            max_output_tokens: None,
            incomplete_details: None,
        }
    }

    #[tokio::test]
    async fn walks_chain_in_chronological_order() {
        let store = InMemoryStore::default();
        store
            .save_response(&bare_response(
                "resp_1",
                None,
                vec![Item::user_text("item_1", "first question")],
                vec![Item::assistant_text("item_2", "first answer")],
            ))
            .await
            .unwrap();
        store
            .save_response(&bare_response(
                "resp_2",
                Some("resp_1"),
                vec![Item::user_text("item_3", "second question")],
                vec![Item::assistant_text("item_4", "second answer")],
            ))
            .await
            .unwrap();

        let messages = reconstruct_history(&store, "resp_2").await.unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[2].role, "user");
        assert_eq!(messages[3].role, "assistant");
    }

    #[tokio::test]
    async fn missing_response_is_not_found() {
        let store = InMemoryStore::default();
        let err = reconstruct_history(&store, "resp_missing").await.unwrap_err();
        assert_eq!(err.kind, crate::error::ApiErrorKind::NotFound);
    }

    #[tokio::test]
    async fn self_referencing_chain_is_a_cycle_error() {
        let store = InMemoryStore::default();
        store
            .save_response(&bare_response("resp_1", Some("resp_1"), vec![], vec![]))
            .await
            .unwrap();

        let err = reconstruct_history(&store, "resp_1").await.unwrap_err();
        assert_eq!(err.kind, crate::error::ApiErrorKind::InvalidRequest);
        assert_eq!(err.param.as_deref(), Some("previous_response_id"));
    }
}
