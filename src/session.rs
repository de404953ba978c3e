//! The signed-in identity every core operation runs as.

use crate::remote::UserScope;
use crate::sync::SyncError;

/// Account identity handed out by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    identity: Option<Identity>,
}

impl Session {
    pub fn signed_in(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    pub fn signed_out() -> Self {
        Self { identity: None }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    /// The current identity, or `NotAuthenticated`.
    pub fn require(&self) -> Result<&Identity, SyncError> {
        self.identity.as_ref().ok_or(SyncError::NotAuthenticated)
    }

    /// Remote namespace of the current identity.
    pub fn scope(&self) -> Result<UserScope, SyncError> {
        Ok(UserScope::new(&self.require()?.user_id))
    }
}
