use crate::launch::domain::action_launcher::ProcessHandle;

/// The one session that exists, opened for exactly one recognized user.
///
/// Invariant: while this exists, exactly one action process handle is
/// live and it was started with `url`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveSession {
    pub user_name: String,
    pub url: String,
    pub handle: ProcessHandle,
}

/// Lifecycle of the privileged external action. Process-wide there is
/// exactly one instance, owned by the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open(ActiveSession),
}

impl SessionState {
    pub fn is_open(&self) -> bool {
        matches!(self, SessionState::Open(_))
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        match self {
            SessionState::Open(active) => Some(active),
            SessionState::Closed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_has_no_active_session() {
        assert!(!SessionState::Closed.is_open());
        assert!(SessionState::Closed.active().is_none());
    }

    #[test]
    fn test_open_exposes_active_session() {
        let state = SessionState::Open(ActiveSession {
            user_name: "alice".into(),
            url: "alice.example".into(),
            handle: ProcessHandle(7),
        });
        assert!(state.is_open());
        assert_eq!(state.active().unwrap().handle, ProcessHandle(7));
    }
}
