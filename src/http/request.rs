//! Request identity.
//!
//! # Responsibilities
//! - Assign a UUID v4 request id to requests arriving without one
//! - Name the header the rest of the stack propagates
//!
//! # Design Decisions
//! - Ids set before the trace layer so every log line carries one
//! - Client-supplied ids are kept, not overwritten

use axum::http::{HeaderName, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}
