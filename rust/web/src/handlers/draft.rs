use super::{run_blocking, session_error, success_response};
use crate::session::SessionManager;
use crate::store::{SessionId, UpdateOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;

#[derive(Debug, Deserialize)]
pub struct UpdateCardsRequest {
    #[serde(default)]
    pub auth_token: String,
    /// Exactly three slots; `null` or `""` leaves a slot empty
    pub cards: Vec<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateHeroRequest {
    #[serde(default)]
    pub auth_token: String,
    pub hero: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDraftedRequest {
    #[serde(default)]
    pub auth_token: String,
    pub drafted: Vec<String>,
}

/// Body of every accepted update.
///
/// A rejected token and a finished session both produce this same body, so
/// a caller cannot tell whether its write landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub error: bool,
}

impl From<UpdateOutcome> for UpdateResponse {
    fn from(_: UpdateOutcome) -> Self {
        Self {
            success: true,
            error: false,
        }
    }
}

/// Replaces the three offered cards.
///
/// # HTTP Method and Path
/// - **Method**: POST
/// - **Path**: `/session/update/cards/{session_id}`
///
/// # Request Format
/// ```json
/// { "auth_token": "…", "cards": ["CS2_029", null, "ex1_277"] }
/// ```
///
/// # Error Cases
/// - `validation_error` (400): the array does not hold exactly three entries
/// - `session_not_found` (404)
pub async fn update_cards(
    sessions: Arc<SessionManager>,
    session_id: SessionId,
    request: UpdateCardsRequest,
) -> Response {
    let result = run_blocking(sessions, move |sessions| {
        sessions.update_current_cards(&session_id, &request.auth_token, &request.cards)
    })
    .await;
    match result {
        Ok(outcome) => success_response(StatusCode::OK, UpdateResponse::from(outcome)),
        Err(err) => session_error(err),
    }
}

/// `POST /session/update/hero/{session_id}`. Unknown hero names are a 400.
pub async fn update_hero(
    sessions: Arc<SessionManager>,
    session_id: SessionId,
    request: UpdateHeroRequest,
) -> Response {
    let result = run_blocking(sessions, move |sessions| {
        sessions.update_hero(&session_id, &request.auth_token, &request.hero)
    })
    .await;
    match result {
        Ok(outcome) => success_response(StatusCode::OK, UpdateResponse::from(outcome)),
        Err(err) => session_error(err),
    }
}

/// Replaces the full pick list.
///
/// # HTTP Method and Path
/// - **Method**: POST
/// - **Path**: `/session/update/drafted/{session_id}`
///
/// # Error Cases
/// - `validation_error` (400): more than 30 picks
/// - `unknown_card` (400): a pick is missing from the card catalog
/// - `session_not_found` (404)
///
/// The thirtieth pick finishes the draft; viewers then receive
/// `drafted_updated` followed by `draft_finished`.
pub async fn update_drafted(
    sessions: Arc<SessionManager>,
    session_id: SessionId,
    request: UpdateDraftedRequest,
) -> Response {
    let result = run_blocking(sessions, move |sessions| {
        sessions.update_drafted(&session_id, &request.auth_token, &request.drafted)
    })
    .await;
    match result {
        Ok(outcome) => success_response(StatusCode::OK, UpdateResponse::from(outcome)),
        Err(err) => session_error(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_deserializes_as_empty() {
        let request: UpdateHeroRequest =
            serde_json::from_str(r#"{"hero": "mage"}"#).expect("parse");
        assert!(request.auth_token.is_empty());
    }

    #[test]
    fn null_card_slots_are_accepted() {
        let request: UpdateCardsRequest =
            serde_json::from_str(r#"{"auth_token": "t", "cards": ["CS2_029", null, ""]}"#)
                .expect("parse");
        assert_eq!(
            request.cards,
            vec![Some("CS2_029".to_string()), None, Some(String::new())]
        );
    }

    #[test]
    fn ignored_updates_look_like_applied_ones() {
        assert_eq!(
            UpdateResponse::from(UpdateOutcome::Ignored),
            UpdateResponse::from(UpdateOutcome::Applied)
        );
    }
}
