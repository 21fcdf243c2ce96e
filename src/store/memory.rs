/// Process-local store implementing every capability.
///
/// Backs the integration tests and local runs without PostgreSQL. All state
/// sits behind one mutex, so each call is atomic with respect to the others;
/// in particular only one of several concurrent deletes of a refresh token
/// reports that it removed the row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{
    AdminFunctions, Entity, ProfileProvider, RoleProvider, RoleSetter, StoreError, TokenRepo,
    UserProvider, UserSaver,
};
use crate::domain::{NewUser, RefreshTokenRecord, Role, UserProfile, UserRecord};

#[derive(Default)]
struct State {
    next_id: i64,
    users: BTreeMap<i64, UserRecord>,
    usernames: HashMap<String, i64>,
    roles: HashMap<i64, Role>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
}

impl State {
    fn profile(&self, user_id: i64) -> Option<UserProfile> {
        let user = self.users.get(&user_id)?;
        let role = *self.roles.get(&user_id)?;
        Some(UserProfile {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            phone_number: user.phone_number.clone(),
            role,
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live refresh tokens held for a user
    pub fn refresh_token_count(&self, user_id: i64) -> usize {
        self.state()
            .refresh_tokens
            .values()
            .filter(|record| record.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl UserSaver for MemoryStore {
    async fn save_user(&self, user: &NewUser) -> Result<i64, StoreError> {
        let mut state = self.state();
        if state.usernames.contains_key(&user.username) {
            return Err(StoreError::Duplicate);
        }

        state.next_id += 1;
        let id = state.next_id;
        state.usernames.insert(user.username.clone(), id);
        state.users.insert(
            id,
            UserRecord {
                id,
                username: user.username.clone(),
                email: user.email.clone(),
                display_name: user.display_name.clone(),
                phone_number: user.phone_number.clone(),
                password_hash: user.password_hash.clone(),
            },
        );
        Ok(id)
    }
}

#[async_trait]
impl UserProvider for MemoryStore {
    async fn user_by_username(&self, username: &str) -> Result<UserRecord, StoreError> {
        let state = self.state();
        state
            .usernames
            .get(username)
            .and_then(|id| state.users.get(id))
            .cloned()
            .ok_or(StoreError::NotFound(Entity::User))
    }
}

#[async_trait]
impl RoleSetter for MemoryStore {
    async fn set_role(&self, user_id: i64, role: Role) -> Result<(), StoreError> {
        let mut state = self.state();
        if !state.users.contains_key(&user_id) {
            return Err(StoreError::NotFound(Entity::User));
        }
        state.roles.insert(user_id, role);
        Ok(())
    }
}

#[async_trait]
impl RoleProvider for MemoryStore {
    async fn role(&self, user_id: i64) -> Result<Role, StoreError> {
        self.state()
            .roles
            .get(&user_id)
            .copied()
            .ok_or(StoreError::NotFound(Entity::Role))
    }
}

#[async_trait]
impl TokenRepo for MemoryStore {
    async fn save_refresh_token(
        &self,
        token: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        if !state.users.contains_key(&user_id) {
            return Err(StoreError::NotFound(Entity::User));
        }
        if state.refresh_tokens.contains_key(token) {
            return Err(StoreError::Duplicate);
        }
        state.refresh_tokens.insert(
            token.to_string(),
            RefreshTokenRecord {
                user_id,
                issued_at: Utc::now(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn find_refresh_token(&self, token: &str) -> Result<RefreshTokenRecord, StoreError> {
        self.state()
            .refresh_tokens
            .get(token)
            .cloned()
            .ok_or(StoreError::NotFound(Entity::RefreshToken))
    }

    async fn delete_refresh_token(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.state().refresh_tokens.remove(token).is_some())
    }
}

#[async_trait]
impl ProfileProvider for MemoryStore {
    async fn profile(&self, user_id: i64) -> Result<UserProfile, StoreError> {
        self.state()
            .profile(user_id)
            .ok_or(StoreError::NotFound(Entity::User))
    }
}

#[async_trait]
impl AdminFunctions for MemoryStore {
    async fn list_profiles(&self) -> Result<Vec<UserProfile>, StoreError> {
        let state = self.state();
        // BTreeMap iteration is ordered by id; one role per user
        Ok(state
            .users
            .keys()
            .filter_map(|id| state.profile(*id))
            .collect())
    }

    async fn change_role(&self, user_id: i64, role: Role) -> Result<(), StoreError> {
        let mut state = self.state();
        match state.roles.get_mut(&user_id) {
            Some(current) => {
                *current = role;
                Ok(())
            }
            None => Err(StoreError::NotFound(Entity::User)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            display_name: "Test User".to_string(),
            phone_number: "+1234567".to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = MemoryStore::new();
        store.save_user(&new_user("alice123")).await.unwrap();

        let result = store.save_user(&new_user("alice123")).await;
        assert!(matches!(result, Err(StoreError::Duplicate)));
    }

    #[tokio::test]
    async fn ids_are_assigned_in_order() {
        let store = MemoryStore::new();
        let first = store.save_user(&new_user("alice123")).await.unwrap();
        let second = store.save_user(&new_user("bobby456")).await.unwrap();

        assert!(second > first);
    }

    #[tokio::test]
    async fn set_role_replaces_existing_role() {
        let store = MemoryStore::new();
        let id = store.save_user(&new_user("alice123")).await.unwrap();

        store.set_role(id, Role::Buyer).await.unwrap();
        store.set_role(id, Role::Admin).await.unwrap();

        assert_eq!(store.role(id).await.unwrap(), Role::Admin);
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_was_removed() {
        let store = MemoryStore::new();
        let id = store.save_user(&new_user("alice123")).await.unwrap();
        store
            .save_refresh_token("token-1", id, Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        assert!(store.delete_refresh_token("token-1").await.unwrap());
        assert!(!store.delete_refresh_token("token-1").await.unwrap());
        assert!(matches!(
            store.find_refresh_token("token-1").await,
            Err(StoreError::NotFound(Entity::RefreshToken))
        ));
    }

    #[tokio::test]
    async fn change_role_for_unknown_user_fails() {
        let store = MemoryStore::new();

        let result = store.change_role(99, Role::Admin).await;
        assert!(matches!(result, Err(StoreError::NotFound(Entity::User))));
    }

    #[tokio::test]
    async fn profiles_are_listed_by_id() {
        let store = MemoryStore::new();
        for name in ["carol789", "alice123", "bobby456"] {
            let id = store.save_user(&new_user(name)).await.unwrap();
            store.set_role(id, Role::Buyer).await.unwrap();
        }

        let ids: Vec<i64> = store
            .list_profiles()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
