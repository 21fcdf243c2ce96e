/// Profile retrieval and administrative role management

use std::sync::Arc;

use crate::auth::Identity;
use crate::domain::{Role, UserProfile};
use crate::error::AppError;
use crate::store::{AdminFunctions, ProfileProvider};

#[derive(Clone)]
pub struct ProfileService {
    profiles: Arc<dyn ProfileProvider>,
    admin: Arc<dyn AdminFunctions>,
}

impl ProfileService {
    pub fn new(profiles: Arc<dyn ProfileProvider>, admin: Arc<dyn AdminFunctions>) -> Self {
        Self { profiles, admin }
    }

    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ProfileProvider + AdminFunctions + 'static,
    {
        Self {
            profiles: store.clone(),
            admin: store,
        }
    }

    /// Fetch a profile. Callers may read their own; admins may read any.
    #[tracing::instrument(name = "profile.get", skip(self))]
    pub async fn get_profile(
        &self,
        caller: &Identity,
        user_id: i64,
    ) -> Result<UserProfile, AppError> {
        caller.ensure_self_or_admin(user_id)?;

        self.profiles
            .profile(user_id)
            .await
            .map_err(|e| AppError::storage("profile.get", e))
    }

    /// Every profile, ordered by user id
    #[tracing::instrument(name = "profile.list", skip(self))]
    pub async fn list_profiles(&self) -> Result<Vec<UserProfile>, AppError> {
        self.admin
            .list_profiles()
            .await
            .map_err(|e| AppError::storage("profile.list", e))
    }

    /// Replace a user's role. The change reaches access tokens minted after
    /// this call; tokens already issued keep the old role until they expire.
    #[tracing::instrument(name = "profile.change_role", skip(self))]
    pub async fn change_role(&self, user_id: i64, role: Role) -> Result<(), AppError> {
        self.admin
            .change_role(user_id, role)
            .await
            .map_err(|e| AppError::storage("profile.change_role", e))?;

        tracing::info!(user_id = user_id, role = %role, "Role changed");
        Ok(())
    }
}
