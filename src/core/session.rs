/// Session Registry
///
/// Process-local mapping from session id to session metadata. Allocated by
/// `initialize`, consulted by `tools/call` in strict mode, evicted by
/// `shutdown`. Guarded by a `Mutex` since the mapping is mutated on every
/// lifecycle call but each operation is short.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub created_at: u64,
}

pub struct SessionRegistry {
    require_session: bool,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new(require_session: bool) -> Self {
        Self {
            require_session,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn create(&self) -> Session {
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let session = Session {
            id: id.clone(),
            created_at,
        };
        self.sessions.lock().unwrap().insert(id, session.clone());
        session
    }

    /// Validates a `tools/call` session id. In strict mode, an absent or
    /// unknown id is rejected. In lenient mode, an absent id is accepted
    /// and an unknown one is auto-created on first use.
    pub fn validate(&self, session_id: Option<&str>) -> Result<(), ()> {
        match session_id {
            Some(id) => {
                let mut sessions = self.sessions.lock().unwrap();
                if sessions.contains_key(id) {
                    Ok(())
                } else if self.require_session {
                    Err(())
                } else {
                    sessions.insert(
                        id.to_string(),
                        Session {
                            id: id.to_string(),
                            created_at: SystemTime::now()
                                .duration_since(UNIX_EPOCH)
                                .map(|d| d.as_secs())
                                .unwrap_or(0),
                        },
                    );
                    Ok(())
                }
            }
            None => {
                if self.require_session {
                    Err(())
                } else {
                    Ok(())
                }
            }
        }
    }

    pub fn evict(&self, session_id: &str) {
        self.sessions.lock().unwrap().remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_mode_rejects_unknown_session() {
        let registry = SessionRegistry::new(true);
        assert!(registry.validate(Some("nope")).is_err());
        assert!(registry.validate(None).is_err());
    }

    #[test]
    fn strict_mode_accepts_known_session() {
        let registry = SessionRegistry::new(true);
        let session = registry.create();
        assert!(registry.validate(Some(&session.id)).is_ok());
    }

    #[test]
    fn lenient_mode_auto_creates() {
        let registry = SessionRegistry::new(false);
        assert!(registry.validate(Some("fresh")).is_ok());
        assert!(registry.validate(None).is_ok());
    }

    #[test]
    fn shutdown_evicts_session() {
        let registry = SessionRegistry::new(true);
        let session = registry.create();
        registry.evict(&session.id);
        assert!(registry.validate(Some(&session.id)).is_err());
    }
}
