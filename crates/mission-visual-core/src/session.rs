//! Authentication seam.
//!
//! Credential checks live outside the core; the manager only asks whether a
//! user is signed in and who it is.

pub trait Authenticator: Send {
    fn current_user_id(&self) -> Option<String>;

    fn is_authenticated(&self) -> bool {
        self.current_user_id().is_some()
    }
}

/// Session whose user is fixed by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticSession {
    user_id: Option<String>,
}

impl StaticSession {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn signed_out() -> Self {
        Self { user_id: None }
    }
}

impl Authenticator for StaticSession {
    fn current_user_id(&self) -> Option<String> {
        self.user_id.clone()
    }
}
