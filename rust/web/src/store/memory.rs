use super::{
    check_drafted_len, new_record, CurrentCards, SessionCredentials, SessionId, SessionRecord,
    SessionStore, StoreError, UpdateOutcome,
};
use draftwatch_core::auth;
use draftwatch_core::cards::CardId;
use draftwatch_core::hero::Hero;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-process store. Guards and writes run under a single write lock.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guarded_update<F>(
        &self,
        session_id: &str,
        auth_token: &str,
        allow_finished: bool,
        apply: F,
    ) -> Result<UpdateOutcome, StoreError>
    where
        F: FnOnce(&mut SessionRecord),
    {
        let mut guard = self.sessions.write().map_err(|_| StoreError::Poisoned)?;
        let record = guard
            .get_mut(session_id)
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))?;

        if !auth::token_matches(&record.auth_token, auth_token) {
            return Ok(UpdateOutcome::Ignored);
        }
        if !allow_finished && record.is_finished() {
            return Ok(UpdateOutcome::Ignored);
        }

        apply(record);
        Ok(UpdateOutcome::Applied)
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self, session_id: &str) -> Result<SessionCredentials, StoreError> {
        let mut guard = self.sessions.write().map_err(|_| StoreError::Poisoned)?;
        if guard.contains_key(session_id) {
            return Err(StoreError::Conflict(session_id.to_string()));
        }

        let record = new_record(session_id);
        let credentials = SessionCredentials {
            session_id: record.session_id.clone(),
            auth_token: record.auth_token.clone(),
        };
        guard.insert(record.session_id.clone(), record);
        Ok(credentials)
    }

    fn exists(&self, session_id: &str) -> Result<bool, StoreError> {
        let guard = self.sessions.read().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.contains_key(session_id))
    }

    fn get(&self, session_id: &str) -> Result<SessionRecord, StoreError> {
        let guard = self.sessions.read().map_err(|_| StoreError::Poisoned)?;
        guard
            .get(session_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))
    }

    fn update_current_cards(
        &self,
        session_id: &str,
        auth_token: &str,
        cards: CurrentCards,
    ) -> Result<UpdateOutcome, StoreError> {
        self.guarded_update(session_id, auth_token, false, |record| {
            record.current_cards = cards;
        })
    }

    fn update_drafted(
        &self,
        session_id: &str,
        auth_token: &str,
        drafted: Vec<CardId>,
    ) -> Result<UpdateOutcome, StoreError> {
        check_drafted_len(&drafted)?;
        self.guarded_update(session_id, auth_token, false, |record| {
            record.num_drafted = drafted.len();
            record.drafted = drafted;
        })
    }

    fn update_hero(
        &self,
        session_id: &str,
        auth_token: &str,
        hero: Hero,
    ) -> Result<UpdateOutcome, StoreError> {
        self.guarded_update(session_id, auth_token, true, |record| {
            record.hero = hero;
        })
    }
}
