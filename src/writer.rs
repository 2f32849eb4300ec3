//! `ResponseWriter` — the transport seam (spec §1, §6).
//!
//! The transport/HTTP+SSE layer is an explicit external collaborator; the
//! core only writes through this trait.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::model::{Response, StreamEvent};

#[async_trait]
pub trait ResponseWriter: Send + Sync {
    /// Called exactly once for a non-streaming request.
    async fn write_response(&self, response: Response) -> Result<(), ApiError>;

    /// Called N times for a streaming request, never mixed with
    /// `write_response` on the same request.
    async fn write_event(&self, event: StreamEvent) -> Result<(), ApiError>;

    /// Optional: flush buffered bytes to the wire. Default no-op.
    async fn flush(&self) -> Result<(), ApiError> {
        Ok(())
    }
}
