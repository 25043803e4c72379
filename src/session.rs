//! Per-user ephemeral conversation state.

use crate::ledger::Summary;
use crate::model::DraftTransaction;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The transport-level user identity (a Telegram chat id).
pub(crate) type UserId = i64;

/// A staged archive request: the target partition plus a snapshot of its
/// summary taken when the request was made.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ArchiveRequest {
    pub target: String,
    pub summary: Summary,
}

/// One user's in-flight conversation state: at most one pending draft and at
/// most one pending archive request. Never persisted.
#[derive(Debug, Default)]
pub(crate) struct Session {
    draft: Option<DraftTransaction>,
    archive: Option<ArchiveRequest>,
}

impl Session {
    pub fn draft(&self) -> Option<&DraftTransaction> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut DraftTransaction> {
        self.draft.as_mut()
    }

    /// Stages a new draft, replacing any previous one.
    pub fn set_draft(&mut self, draft: DraftTransaction) {
        self.draft = Some(draft);
    }

    pub fn clear_draft(&mut self) -> Option<DraftTransaction> {
        self.draft.take()
    }

    pub fn set_archive_request(&mut self, request: ArchiveRequest) {
        self.archive = Some(request);
    }

    pub fn clear_archive_request(&mut self) -> Option<ArchiveRequest> {
        self.archive.take()
    }
}

/// Holds every user's session, created lazily on first access.
///
/// Each session sits behind its own async mutex. The controller holds the
/// lock for the whole of a state transition, so a second event from the same
/// user queues behind the first instead of racing it; events from different
/// users proceed independently.
#[derive(Default)]
pub(crate) struct SessionStore {
    sessions: std::sync::Mutex<HashMap<UserId, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session for `user`, created empty on first access.
    pub fn get(&self, user: UserId) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.entry(user).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CategoryRegistry;

    #[tokio::test]
    async fn test_sessions_are_created_lazily_and_are_per_user() {
        let registry = CategoryRegistry::standard();
        let store = SessionStore::new();

        let a = store.get(1);
        a.lock().await.set_draft(DraftTransaction::sample(&registry));

        // Same user sees the same session; another user gets a fresh one.
        assert!(store.get(1).lock().await.draft().is_some());
        assert!(store.get(2).lock().await.draft().is_none());
    }

    #[tokio::test]
    async fn test_fields_clear_individually() {
        let registry = CategoryRegistry::standard();
        let store = SessionStore::new();
        let session = store.get(7);
        let mut session = session.lock().await;

        session.set_draft(DraftTransaction::sample(&registry));
        session.set_archive_request(ArchiveRequest {
            target: "2025-01 January".to_string(),
            summary: Summary::default(),
        });

        assert!(session.clear_draft().is_some());
        assert!(session.draft().is_none());

        // The archive request is untouched by the draft being cleared.
        assert!(session.clear_archive_request().is_some());
        assert!(session.clear_archive_request().is_none());
    }
}
