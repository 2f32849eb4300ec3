//! ID generation for Items and Responses.
//!
//! Both id families are opaque unique tokens namespaced with a fixed prefix
//! (spec §3, §6). Grounded on the `generate_item_id(prefix)` helper in the
//! reference responses-API streaming buffer, which mints ids as
//! `format!("{}_{}", prefix, Uuid::new_v4().simple())`.

use uuid::Uuid;

const ITEM_PREFIX: &str = "item";
const RESPONSE_PREFIX: &str = "resp";

fn generate(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

/// Generate a new `item_<opaque>` id.
pub fn generate_item_id() -> String {
    generate(ITEM_PREFIX)
}

/// Generate a new `resp_<opaque>` id.
pub fn generate_response_id() -> String {
    generate(RESPONSE_PREFIX)
}

/// Whether `id` looks like a validly-prefixed token for `prefix`.
pub fn has_prefix(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|rest| !rest.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn item_ids_are_prefixed_and_unique() {
        let mut seen = HashSet::new();
        for _ in 0..100 {
            let id = generate_item_id();
            assert!(has_prefix(&id, "item"));
            assert!(seen.insert(id));
        }
    }

    #[test]
    fn response_ids_are_prefixed_and_unique() {
        let mut seen = HashSet::new();
        for _ in 0..100 {
            let id = generate_response_id();
            assert!(has_prefix(&id, "resp"));
            assert!(seen.insert(id));
        }
    }

    #[test]
    fn item_and_response_prefixes_are_distinct() {
        let item = generate_item_id();
        let resp = generate_response_id();
        assert!(!has_prefix(&item, "resp"));
        assert!(!has_prefix(&resp, "item"));
    }
}
