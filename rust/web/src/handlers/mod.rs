pub mod draft;
pub mod health;
pub mod session;
pub mod socket;
pub mod sse;

use crate::errors::IntoErrorResponse;
use crate::session::{SessionError, SessionManager};
use serde::Serialize;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

pub use draft::{
    update_cards, update_drafted, update_hero, UpdateCardsRequest, UpdateDraftedRequest,
    UpdateHeroRequest, UpdateResponse,
};
pub use health::health;
pub use session::{create_session, session_json, viewer};
pub use socket::{handle_socket, ClientMessage};
pub use sse::stream_events;

fn success_response<T>(status: StatusCode, body: T) -> Response
where
    T: Serialize,
{
    reply::with_status(reply::json(&body), status).into_response()
}

fn session_error(err: SessionError) -> Response {
    err.into_http_response()
}

/// Runs `work` on the blocking pool. Store backends may hold a lock across
/// disk I/O, which must stay off the async workers.
async fn run_blocking<T, F>(sessions: Arc<SessionManager>, work: F) -> Result<T, SessionError>
where
    F: FnOnce(&SessionManager) -> Result<T, SessionError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || work(&sessions)).await?
}
