//! Session persistence.
//!
//! Every mutation is a guarded update: the guard (token match, and for
//! card/pick updates "not yet finished") and the write happen as one atomic
//! step inside the backend. Callers never read-then-write.

mod memory;
mod sqlite;

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

use draftwatch_core::cards::CardId;
use draftwatch_core::hero::Hero;
use draftwatch_core::{auth, DRAFT_SIZE, OFFERED_SLOTS};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type SessionId = String;

pub type CurrentCards = [Option<CardId>; OFFERED_SLOTS];

/// The persisted document for one draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub auth_token: String,
    pub current_cards: CurrentCards,
    pub drafted: Vec<CardId>,
    pub num_drafted: usize,
    pub hero: Hero,
}

impl SessionRecord {
    pub fn new(session_id: SessionId, auth_token: String) -> Self {
        Self {
            session_id,
            auth_token,
            current_cards: Default::default(),
            drafted: Vec::new(),
            num_drafted: 0,
            hero: Hero::NoHero,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.num_drafted >= DRAFT_SIZE
    }

    /// View safe to hand to unauthenticated readers.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            current_cards: self.current_cards.clone(),
            drafted: self.drafted.clone(),
            num_drafted: self.num_drafted,
            hero: self.hero,
        }
    }
}

/// Session state without the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub current_cards: CurrentCards,
    pub drafted: Vec<CardId>,
    pub num_drafted: usize,
    pub hero: Hero,
}

/// Credentials returned to the drafting client on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
    pub session_id: SessionId,
    pub auth_token: String,
}

/// Whether a guarded update changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// Token mismatch or finished session. Deliberately not split further.
    Ignored,
}

impl UpdateOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, UpdateOutcome::Applied)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UpdateOutcome::Applied => "applied",
            UpdateOutcome::Ignored => "ignored",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),
    #[error("Session already exists: {0}")]
    Conflict(SessionId),
    #[error("Drafted list has {0} cards, more than the draft allows")]
    TooManyDrafted(usize),
    #[error("Session storage backend error: {0}")]
    Backend(String),
    #[error("Session storage poisoned")]
    Poisoned,
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// A document store with single-record atomic guarded updates.
pub trait SessionStore: Send + Sync + fmt::Debug {
    /// Inserts an empty session with a fresh secret.
    fn create(&self, session_id: &str) -> Result<SessionCredentials, StoreError>;

    fn exists(&self, session_id: &str) -> Result<bool, StoreError>;

    fn get(&self, session_id: &str) -> Result<SessionRecord, StoreError>;

    /// Applies only when the token matches and the draft is not finished.
    fn update_current_cards(
        &self,
        session_id: &str,
        auth_token: &str,
        cards: CurrentCards,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Applies only when the token matches and the draft is not finished;
    /// sets `num_drafted` to the new length in the same step.
    fn update_drafted(
        &self,
        session_id: &str,
        auth_token: &str,
        drafted: Vec<CardId>,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Applies whenever the token matches, finished or not.
    fn update_hero(
        &self,
        session_id: &str,
        auth_token: &str,
        hero: Hero,
    ) -> Result<UpdateOutcome, StoreError>;
}

pub(crate) fn new_record(session_id: &str) -> SessionRecord {
    SessionRecord::new(session_id.to_string(), auth::generate_token())
}

pub(crate) fn check_drafted_len(drafted: &[CardId]) -> Result<(), StoreError> {
    if drafted.len() > DRAFT_SIZE {
        return Err(StoreError::TooManyDrafted(drafted.len()));
    }
    Ok(())
}
