//! SessionStore - owns every conversation transcript in the process.

use super::state::{Transcript, Turn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One session's transcript plus the gate that serializes its turns.
#[derive(Debug, Default)]
pub struct SessionEntry {
    transcript: Mutex<Transcript>,
    /// Held for a whole submit so two turns on the same session never interleave.
    turn_gate: tokio::sync::Mutex<()>,
}

impl SessionEntry {
    fn transcript(&self) -> MutexGuard<'_, Transcript> {
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait until no other turn is running on this session.
    pub async fn lock_turn(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.turn_gate.lock().await
    }

    /// Append `turn` and return the resulting history with the current epoch.
    pub fn push_and_snapshot(&self, turn: Turn) -> (Vec<Turn>, u64) {
        let mut transcript = self.transcript();
        transcript.push(turn);
        (transcript.turns().to_vec(), transcript.epoch())
    }

    /// Append `turn` only if no reset happened since `epoch`.
    ///
    /// Returns false when the turn was dropped.
    pub fn push_if_current(&self, epoch: u64, turn: Turn) -> bool {
        let mut transcript = self.transcript();
        if transcript.epoch() != epoch {
            return false;
        }
        transcript.push(turn);
        true
    }

    /// Drop a trailing user turn appended during `epoch`.
    pub fn discard_user_turn(&self, epoch: u64) -> bool {
        self.transcript().pop_user(epoch).is_some()
    }

    pub fn snapshot(&self) -> Vec<Turn> {
        self.transcript().turns().to_vec()
    }

    fn push(&self, turn: Turn) {
        self.transcript().push(turn);
    }

    fn clear(&self) {
        self.transcript().clear();
    }
}

/// Process-wide map from session id to transcript.
///
/// Sessions are created lazily on first use and live until the store is shut
/// down. The map lock is only held to look up or insert an entry, so work on
/// one session never blocks another.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<SessionEntry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Arc<SessionEntry>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the entry for `id`, creating an empty one if absent.
    pub fn entry(&self, id: &str) -> Arc<SessionEntry> {
        let mut sessions = self.sessions();
        if let Some(entry) = sessions.get(id) {
            return Arc::clone(entry);
        }
        let entry = Arc::new(SessionEntry::default());
        sessions.insert(id.to_string(), Arc::clone(&entry));
        entry
    }

    fn existing(&self, id: &str) -> Option<Arc<SessionEntry>> {
        self.sessions().get(id).cloned()
    }

    /// Return the transcript for `id`, creating an empty session if needed.
    pub fn get_or_create(&self, id: &str) -> Vec<Turn> {
        self.entry(id).snapshot()
    }

    /// Append a turn to the session, creating it first if absent.
    pub fn append(&self, id: &str, turn: Turn) {
        self.entry(id).push(turn);
    }

    /// Clear a session's transcript. Unknown ids are left absent.
    pub fn reset(&self, id: &str) {
        match self.existing(id) {
            Some(entry) => {
                entry.clear();
                log::info!("Reset conversation for session {}", id);
            }
            None => log::debug!("Reset requested for unknown session {}", id),
        }
    }

    /// Read a transcript without creating the session.
    pub fn transcript(&self, id: &str) -> Option<Vec<Turn>> {
        self.existing(id).map(|entry| entry.snapshot())
    }

    /// Number of known sessions.
    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }

    /// Drop all sessions. Called once when the server stops.
    pub fn shutdown(&self) {
        let mut sessions = self.sessions();
        log::info!("Discarding {} conversation session(s)", sessions.len());
        sessions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::state::Role;

    mod session_store {
        use super::*;

        #[test]
        fn new_store_is_empty() {
            let store = SessionStore::new();
            assert!(store.is_empty());
            assert_eq!(store.len(), 0);
        }

        #[test]
        fn get_or_create_creates_empty_session() {
            let store = SessionStore::new();

            assert!(store.get_or_create("s1").is_empty());
            assert_eq!(store.len(), 1);
            assert_eq!(store.transcript("s1"), Some(vec![]));
        }

        #[test]
        fn get_or_create_returns_existing_history() {
            let store = SessionStore::new();
            store.append("s1", Turn::user("hello"));

            let turns = store.get_or_create("s1");
            assert_eq!(turns, vec![Turn::user("hello")]);
            assert_eq!(store.len(), 1);
        }

        #[test]
        fn append_creates_missing_session() {
            let store = SessionStore::new();
            store.append("fresh", Turn::user("hi"));

            assert_eq!(store.transcript("fresh"), Some(vec![Turn::user("hi")]));
        }

        #[test]
        fn append_preserves_order() {
            let store = SessionStore::new();
            store.append("s1", Turn::user("q1"));
            store.append("s1", Turn::assistant("a1"));
            store.append("s1", Turn::user("q2"));

            let roles: Vec<Role> = store
                .transcript("s1")
                .unwrap()
                .iter()
                .map(|t| t.role)
                .collect();
            assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        }

        #[test]
        fn reset_clears_existing_session() {
            let store = SessionStore::new();
            store.append("s1", Turn::user("q"));
            store.append("s1", Turn::assistant("a"));

            store.reset("s1");

            assert_eq!(store.transcript("s1"), Some(vec![]));
            assert_eq!(store.len(), 1);
        }

        #[test]
        fn reset_unknown_session_is_noop() {
            let store = SessionStore::new();
            store.reset("ghost");

            assert!(store.transcript("ghost").is_none());
            assert!(store.is_empty());
        }

        #[test]
        fn sessions_are_independent() {
            let store = SessionStore::new();
            store.append("a", Turn::user("for a"));
            store.append("b", Turn::user("for b"));
            store.append("b", Turn::assistant("reply b"));

            store.reset("b");

            assert_eq!(store.transcript("a"), Some(vec![Turn::user("for a")]));
            assert_eq!(store.transcript("b"), Some(vec![]));
        }

        #[test]
        fn transcript_does_not_create_session() {
            let store = SessionStore::new();
            assert!(store.transcript("nope").is_none());
            assert!(store.is_empty());
        }

        #[test]
        fn shutdown_drops_all_sessions() {
            let store = SessionStore::new();
            store.append("a", Turn::user("x"));
            store.append("b", Turn::user("y"));

            store.shutdown();

            assert!(store.is_empty());
        }
    }

    mod session_entry {
        use super::*;

        #[test]
        fn push_and_snapshot_includes_new_turn() {
            let entry = SessionEntry::default();
            let (turns, epoch) = entry.push_and_snapshot(Turn::user("hi"));

            assert_eq!(turns, vec![Turn::user("hi")]);
            assert_eq!(epoch, 0);
        }

        #[test]
        fn push_if_current_rejects_after_reset() {
            let entry = SessionEntry::default();
            let (_, epoch) = entry.push_and_snapshot(Turn::user("hi"));
            entry.clear();

            assert!(!entry.push_if_current(epoch, Turn::assistant("late")));
            assert!(entry.snapshot().is_empty());
        }

        #[test]
        fn push_if_current_accepts_same_epoch() {
            let entry = SessionEntry::default();
            let (_, epoch) = entry.push_and_snapshot(Turn::user("hi"));

            assert!(entry.push_if_current(epoch, Turn::assistant("hello")));
            assert_eq!(entry.snapshot().len(), 2);
        }

        #[test]
        fn discard_user_turn_rolls_back() {
            let entry = SessionEntry::default();
            let (_, epoch) = entry.push_and_snapshot(Turn::user("orphan"));

            assert!(entry.discard_user_turn(epoch));
            assert!(entry.snapshot().is_empty());
        }

        #[tokio::test]
        async fn lock_turn_serializes_holders() {
            let entry = Arc::new(SessionEntry::default());
            let guard = entry.lock_turn().await;

            let waiter = {
                let entry = Arc::clone(&entry);
                tokio::spawn(async move {
                    let _guard = entry.lock_turn().await;
                })
            };

            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            assert!(!waiter.is_finished());

            drop(guard);
            waiter.await.unwrap();
        }
    }
}
