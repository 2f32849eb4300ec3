//! `ResponseStore` — the persistent-store seam (spec §1, §6).
//!
//! Out of scope as an implementation: the core only depends on this trait.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::model::Response;

#[async_trait]
pub trait ResponseStore: Send + Sync {
    async fn get_response(&self, id: &str) -> Result<Option<Response>, ApiError>;
    async fn save_response(&self, response: &Response) -> Result<(), ApiError>;
}
