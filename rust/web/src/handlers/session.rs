use super::{run_blocking, session_error, success_response};
use crate::session::SessionManager;
use crate::store::SessionId;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;

/// Creates a draft and returns `{ "session_id", "auth_token" }`.
///
/// # HTTP Method and Path
/// - **Method**: GET or POST
/// - **Path**: `/session/new`
///
/// # Error Cases
/// - `session_id_exhausted` (500): every generated id collided with an
///   existing session
pub async fn create_session(sessions: Arc<SessionManager>) -> Response {
    match run_blocking(sessions, |sessions| sessions.create_session()).await {
        Ok(credentials) => success_response(StatusCode::OK, credentials),
        Err(err) => session_error(err),
    }
}

/// `GET /json/{session_id}`: stored state without the auth token.
pub async fn session_json(sessions: Arc<SessionManager>, session_id: SessionId) -> Response {
    match run_blocking(sessions, move |sessions| sessions.snapshot(&session_id)).await {
        Ok(snapshot) => success_response(StatusCode::OK, snapshot),
        Err(err) => session_error(err),
    }
}

/// `GET /viewer/{session_id}`: asset URLs ready for rendering.
pub async fn viewer(sessions: Arc<SessionManager>, session_id: SessionId) -> Response {
    match run_blocking(sessions, move |sessions| sessions.viewer_state(&session_id)).await {
        Ok(state) => success_response(StatusCode::OK, state),
        Err(err) => session_error(err),
    }
}
