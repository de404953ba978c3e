//! Sync-aware profile repository.
//!
//! Writes go to the remote profile document first and are then mirrored
//! into the local `users` table.

use std::sync::Arc;

use tracing::{debug, info};

use super::reader::parse_profile;
use super::writer::profile_fields;
use super::SyncError;
use crate::db::{Cache, LiveQuery};
use crate::models::User;
use crate::remote::DocumentStore;
use crate::session::Session;

#[derive(Clone)]
pub struct SyncProfileRepository {
    store: Arc<dyn DocumentStore>,
    cache: Cache,
    session: Session,
}

impl SyncProfileRepository {
    pub fn new(store: Arc<dyn DocumentStore>, cache: Cache, session: Session) -> Self {
        Self {
            store,
            cache,
            session,
        }
    }

    /// Makes sure the signed-in user has a local row, materializing it from
    /// the remote profile when missing. A no-op once the row exists.
    pub async fn ensure_user_local(&self) -> Result<(), SyncError> {
        let identity = self.session.require()?;
        let users = self.cache.users();
        if users.get_by_id(&identity.user_id).await?.is_some() {
            return Ok(());
        }

        let scope = self.session.scope()?;
        let remote = self.store.get(&scope.profile()).await?;
        let fallback_name = identity.display_name.clone().unwrap_or_default();
        let user = match remote {
            Some(doc) => parse_profile(&identity.user_id, &doc.fields, &fallback_name),
            None => {
                debug!(user_id = %identity.user_id, "No remote profile, using defaults");
                User::new(&identity.user_id, fallback_name)
            }
        };

        users.upsert(&user).await?;
        info!(user_id = %user.id, "Materialized local user");
        Ok(())
    }

    /// Submits or edits the profile: remote first, then local.
    ///
    /// The id of `profile` is ignored; the profile always belongs to the
    /// signed-in identity.
    pub async fn save_profile(&self, profile: &User) -> Result<User, SyncError> {
        let identity = self.session.require()?;
        let user = User {
            id: identity.user_id.clone(),
            ..profile.clone()
        };

        let scope = self.session.scope()?;
        self.store.set(&scope.profile(), profile_fields(&user)).await?;
        self.cache.users().upsert(&user).await?;

        info!(user_id = %user.id, "Saved profile");
        Ok(user)
    }

    pub async fn get_profile(&self) -> Result<Option<User>, SyncError> {
        let identity = self.session.require()?;
        Ok(self.cache.users().get_by_id(&identity.user_id).await?)
    }

    pub fn observe_profile(&self) -> Result<LiveQuery<User>, SyncError> {
        let identity = self.session.require()?;
        Ok(self.cache.users().observe(&identity.user_id))
    }
}
