use crate::assets::{AssetUrls, DraftedDisplay};
use crate::events::{DraftEvent, MessageBus};
use crate::store::{
    CurrentCards, SessionCredentials, SessionId, SessionSnapshot, SessionStore, StoreError,
    UpdateOutcome,
};
use draftwatch_core::aggregate::{aggregate, mana_curve};
use draftwatch_core::auth;
use draftwatch_core::cards::{normalize_slot, CardCatalog, CardId};
use draftwatch_core::errors::{CatalogError, ParseHeroError};
use draftwatch_core::hero::Hero;
use draftwatch_core::{DRAFT_SIZE, OFFERED_SLOTS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_MAX_ID_ATTEMPTS: usize = 10;

const FINISHED_MESSAGE: &str = "Draft has finished. Have a nice day!";

pub type IdGenerator = Arc<dyn Fn() -> SessionId + Send + Sync>;

/// Display form of a session for viewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerState {
    pub session_id: SessionId,
    pub hero: String,
    pub cards: Vec<String>,
    pub drafted: Vec<DraftedDisplay>,
    pub manas: Vec<u8>,
    pub finished: bool,
    pub message: String,
}

/// Session lifecycle: creation, guarded mutation, and fan-out to viewers.
///
/// The store's guarded update is the only synchronization point. Events are
/// published after the store has committed and only when the guard matched;
/// a failed publish is logged and never undoes the write.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    catalog: Arc<CardCatalog>,
    bus: Arc<dyn MessageBus>,
    assets: AssetUrls,
    max_id_attempts: usize,
    id_generator: IdGenerator,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("store", &self.store)
            .field("catalog_cards", &self.catalog.len())
            .field("bus", &self.bus)
            .field("assets", &self.assets)
            .field("max_id_attempts", &self.max_id_attempts)
            .finish()
    }
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        catalog: Arc<CardCatalog>,
        bus: Arc<dyn MessageBus>,
        assets: AssetUrls,
    ) -> Self {
        Self {
            store,
            catalog,
            bus,
            assets,
            max_id_attempts: DEFAULT_MAX_ID_ATTEMPTS,
            id_generator: Arc::new(auth::generate_session_id),
        }
    }

    pub fn with_max_id_attempts(mut self, attempts: usize) -> Self {
        self.max_id_attempts = attempts;
        self
    }

    pub fn with_id_generator(
        mut self,
        generator: impl Fn() -> SessionId + Send + Sync + 'static,
    ) -> Self {
        self.id_generator = Arc::new(generator);
        self
    }

    pub fn bus(&self) -> Arc<dyn MessageBus> {
        Arc::clone(&self.bus)
    }

    /// Draws random identifiers until one is unused, giving up after the
    /// configured number of attempts.
    pub fn generate_unique_session_id(&self) -> Result<SessionId, SessionError> {
        self.claim_fresh_id(|candidate| Ok(Some(candidate.clone())))
    }

    /// Allocates an id and inserts the session under it. Losing a race to
    /// another creator counts as a collision and costs one attempt.
    pub fn create_session(&self) -> Result<SessionCredentials, SessionError> {
        let credentials = self.claim_fresh_id(|candidate| match self.store.create(candidate) {
            Ok(credentials) => Ok(Some(credentials)),
            Err(StoreError::Conflict(_)) => Ok(None),
            Err(err) => Err(err.into()),
        })?;

        tracing::info!(session_id = %credentials.session_id, "created draft session");

        Ok(credentials)
    }

    // `claim` returns `None` when the candidate was taken after the
    // existence check.
    fn claim_fresh_id<T>(
        &self,
        mut claim: impl FnMut(&SessionId) -> Result<Option<T>, SessionError>,
    ) -> Result<T, SessionError> {
        for attempt in 1..=self.max_id_attempts {
            let candidate = (self.id_generator)();
            if !self.store.exists(&candidate)? {
                if let Some(claimed) = claim(&candidate)? {
                    return Ok(claimed);
                }
            }
            tracing::warn!(attempt, "generated session id already in use");
        }
        Err(SessionError::Exhausted {
            attempts: self.max_id_attempts,
        })
    }

    pub fn exists(&self, session_id: &str) -> Result<bool, SessionError> {
        Ok(self.store.exists(session_id)?)
    }

    /// Stored state without the secret.
    pub fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot, SessionError> {
        Ok(self.store.get(session_id)?.snapshot())
    }

    pub fn viewer_state(&self, session_id: &str) -> Result<ViewerState, SessionError> {
        let record = self.store.get(session_id)?;
        let sorted = aggregate(&self.catalog, &record.drafted)?;
        let manas = mana_curve(&self.catalog, &record.drafted)?;
        let finished = record.is_finished();

        Ok(ViewerState {
            session_id: record.session_id,
            hero: self.assets.hero(record.hero),
            cards: self.assets.current_cards(&record.current_cards),
            drafted: self.assets.drafted_list(&sorted),
            manas,
            finished,
            message: if finished {
                FINISHED_MESSAGE.to_string()
            } else {
                String::new()
            },
        })
    }

    pub fn update_current_cards(
        &self,
        session_id: &str,
        auth_token: &str,
        cards: &[Option<String>],
    ) -> Result<UpdateOutcome, SessionError> {
        if cards.len() != OFFERED_SLOTS {
            return Err(SessionError::validation(
                "cards",
                format!(
                    "expected exactly {} cards, got {}",
                    OFFERED_SLOTS,
                    cards.len()
                ),
            ));
        }

        let mut normalized: CurrentCards = Default::default();
        for (slot, raw) in normalized.iter_mut().zip(cards) {
            *slot = normalize_slot(raw.as_deref());
        }
        let event = DraftEvent::CardsUpdated {
            cards: self.assets.current_cards(&normalized),
        };

        let token = auth::sanitize_token(auth_token);
        let outcome = self
            .store
            .update_current_cards(session_id, &token, normalized)?;
        self.log_outcome(session_id, "cards", outcome);

        if outcome.is_applied() {
            self.publish(session_id, event);
        }
        Ok(outcome)
    }

    pub fn update_hero(
        &self,
        session_id: &str,
        auth_token: &str,
        hero: &str,
    ) -> Result<UpdateOutcome, SessionError> {
        let hero: Hero = hero
            .parse()
            .map_err(|err: ParseHeroError| SessionError::validation("hero", err.to_string()))?;

        let token = auth::sanitize_token(auth_token);
        let outcome = self.store.update_hero(session_id, &token, hero)?;
        self.log_outcome(session_id, "hero", outcome);

        if outcome.is_applied() {
            self.publish(
                session_id,
                DraftEvent::HeroUpdated {
                    hero: self.assets.hero(hero),
                },
            );
        }
        Ok(outcome)
    }

    /// Replaces the pick list. Reaching the full draft size emits
    /// `draft_finished` right after `drafted_updated`.
    pub fn update_drafted(
        &self,
        session_id: &str,
        auth_token: &str,
        drafted: &[String],
    ) -> Result<UpdateOutcome, SessionError> {
        if drafted.len() > DRAFT_SIZE {
            return Err(SessionError::validation(
                "drafted",
                format!(
                    "at most {} drafted cards allowed, got {}",
                    DRAFT_SIZE,
                    drafted.len()
                ),
            ));
        }
        if !self.store.exists(session_id)? {
            return Err(SessionError::NotFound(session_id.to_string()));
        }

        let drafted: Vec<CardId> = drafted.iter().map(CardId::new).collect();
        let sorted = aggregate(&self.catalog, &drafted)?;
        let manas = mana_curve(&self.catalog, &drafted)?;
        let finishes = drafted.len() == DRAFT_SIZE;

        let token = auth::sanitize_token(auth_token);
        let outcome = self.store.update_drafted(session_id, &token, drafted)?;
        self.log_outcome(session_id, "drafted", outcome);

        if outcome.is_applied() {
            self.publish(
                session_id,
                DraftEvent::DraftedUpdated {
                    drafted: self.assets.drafted_list(&sorted),
                    manas,
                },
            );
            if finishes {
                tracing::info!(session_id = %session_id, "draft finished");
                self.publish(session_id, DraftEvent::DraftFinished);
            }
        }
        Ok(outcome)
    }

    fn publish(&self, session_id: &str, event: DraftEvent) {
        let name = event.name();
        let session_id = session_id.to_string();
        match self.bus.publish(&session_id, event) {
            Ok(delivered) => tracing::trace!(
                session_id = %session_id,
                event = name,
                delivered,
                "event published"
            ),
            Err(err) => tracing::warn!(
                session_id = %session_id,
                event = name,
                error = %err,
                "failed to publish event; stored state is unaffected"
            ),
        }
    }

    fn log_outcome(&self, session_id: &str, field: &'static str, outcome: UpdateOutcome) {
        tracing::debug!(
            session_id = %session_id,
            field,
            outcome = outcome.as_str(),
            "guarded update"
        );
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("Session not found: {0}")]
    NotFound(SessionId),
    #[error("Unknown card: {0}")]
    MissingCard(CardId),
    #[error("Could not allocate a unique session id after {attempts} attempts")]
    Exhausted { attempts: usize },
    #[error("Catalog error: {0}")]
    Catalog(String),
    #[error("Session store error: {0}")]
    Store(StoreError),
    #[error("Session worker failed: {0}")]
    Worker(String),
}

impl SessionError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        SessionError::Validation {
            field,
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => SessionError::NotFound(id),
            StoreError::TooManyDrafted(n) => SessionError::validation(
                "drafted",
                format!("at most {} drafted cards allowed, got {}", DRAFT_SIZE, n),
            ),
            other => SessionError::Store(other),
        }
    }
}

impl From<tokio::task::JoinError> for SessionError {
    fn from(err: tokio::task::JoinError) -> Self {
        SessionError::Worker(err.to_string())
    }
}

impl From<CatalogError> for SessionError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::MissingCard(card) => SessionError::MissingCard(card),
            other => SessionError::Catalog(other.to_string()),
        }
    }
}

impl crate::errors::IntoErrorResponse for SessionError {
    fn status_code(&self) -> warp::http::StatusCode {
        use warp::http::StatusCode;
        match self {
            SessionError::Validation { .. } => StatusCode::BAD_REQUEST,
            SessionError::MissingCard(_) => StatusCode::BAD_REQUEST,
            SessionError::NotFound(_) => StatusCode::NOT_FOUND,
            SessionError::Exhausted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            SessionError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SessionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SessionError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SessionError::Validation { .. } => "validation_error",
            SessionError::MissingCard(_) => "unknown_card",
            SessionError::NotFound(_) => "session_not_found",
            SessionError::Exhausted { .. } => "session_id_exhausted",
            SessionError::Catalog(_) => "catalog_error",
            SessionError::Store(StoreError::Poisoned) => "session_storage_error",
            SessionError::Store(_) => "session_store_error",
            SessionError::Worker(_) => "session_worker_failed",
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            SessionError::Validation { field, .. } => Some(serde_json::json!({
                "field": field
            })),
            SessionError::NotFound(id) => Some(serde_json::json!({
                "session_id": id
            })),
            SessionError::MissingCard(card) => Some(serde_json::json!({
                "card": card
            })),
            _ => None,
        }
    }

    fn severity(&self) -> crate::errors::ErrorSeverity {
        use crate::errors::ErrorSeverity;
        match self {
            SessionError::Store(StoreError::Poisoned) => ErrorSeverity::Critical,
            SessionError::Store(_)
            | SessionError::Catalog(_)
            | SessionError::Exhausted { .. }
            | SessionError::Worker(_) => ErrorSeverity::Server,
            _ => ErrorSeverity::Client,
        }
    }
}
