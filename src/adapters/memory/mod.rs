//! In-process session store.

use std::collections::HashMap;
use std::sync::Mutex;

use super::StorageError;
use crate::domain::AdaptiveSession;
use crate::ports::SessionStore;

/// [`SessionStore`] backed by a mutex-guarded map.
///
/// Each call holds the lock for its whole read-modify-write.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, AdaptiveSession>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    type Error = StorageError;

    fn insert(&self, session: AdaptiveSession) -> Result<(), Self::Error> {
        let mut sessions = self.sessions.lock().map_err(|_| StorageError::LockPoisoned)?;
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<AdaptiveSession>, Self::Error> {
        let sessions = self.sessions.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(sessions.get(id).cloned())
    }

    fn update<R, F>(&self, id: &str, f: F) -> Result<Option<R>, Self::Error>
    where
        F: FnOnce(&mut AdaptiveSession) -> R,
    {
        let mut sessions = self.sessions.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(sessions.get_mut(id).map(f))
    }

    fn remove(&self, id: &str) -> Result<Option<AdaptiveSession>, Self::Error> {
        let mut sessions = self.sessions.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(sessions.remove(id))
    }

    fn count(&self) -> Result<usize, Self::Error> {
        let sessions = self.sessions.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Answer, AnswerKind};
    use std::sync::Arc;

    #[test]
    fn test_insert_update_remove() {
        let store = InMemorySessionStore::new();
        let session = AdaptiveSession::new(0.8, 10);
        let id = session.id.clone();
        store.insert(session).expect("Should insert");
        assert_eq!(store.count().expect("Should count"), 1);

        let asked = store
            .update(&id, |s| {
                s.record(3, Answer::new(AnswerKind::Yes, Some(6.0)));
                s.questions_asked
            })
            .expect("Should update");
        assert_eq!(asked, Some(1));

        let fetched = store.get(&id).expect("Should get").expect("Should exist");
        assert!(fetched.features().is_present(3));

        assert!(store.remove(&id).expect("Should remove").is_some());
        assert!(store.get(&id).expect("Should get").is_none());
        assert!(store.update(&id, |_| ()).expect("Should not fail").is_none());
    }

    #[test]
    fn test_poisoned_lock_is_error() {
        let store = Arc::new(InMemorySessionStore::new());
        let session = AdaptiveSession::new(0.8, 10);
        let id = session.id.clone();
        store.insert(session).expect("Should insert");

        let clone = Arc::clone(&store);
        let id_clone = id.clone();
        let _ = std::thread::spawn(move || {
            let _ = clone.update(&id_clone, |s| {
                if s.questions_asked == 0 {
                    panic!("boom");
                }
                s.questions_asked
            });
        })
        .join();

        assert!(matches!(store.get(&id), Err(StorageError::LockPoisoned)));
    }
}
