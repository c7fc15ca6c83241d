//! User profile domain logic.
//!
//! ## Username rules
//!
//! - Input is lower-cased and all whitespace is removed
//! - The result must be at least 4 characters of `[a-z0-9_]`
//! - Usernames are unique across all profiles

use anyhow::{anyhow, Result};
use log::{debug, info};
use shared::{UpdateProfileRequest, UserProfile};
use std::sync::Arc;

use super::commands::users::SearchFriendsQuery;
use super::error::DomainError;
use super::session::Session;
use crate::storage::{Connection, UserStorage};

pub const MIN_USERNAME_LENGTH: usize = 4;
pub const FRIEND_SEARCH_LIMIT: usize = 10;

/// Lower-case, strip whitespace and check the allowed alphabet
pub fn normalize_username(raw: &str) -> Result<String, DomainError> {
    let username: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    if username.chars().count() < MIN_USERNAME_LENGTH {
        return Err(DomainError::InvalidUsername(format!(
            "'{}' must be longer than {} characters",
            username,
            MIN_USERNAME_LENGTH - 1
        )));
    }
    if let Some(bad) = username
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_'))
    {
        return Err(DomainError::InvalidUsername(format!(
            "'{}' contains '{}'; only letters, digits and _ are allowed",
            username, bad
        )));
    }
    Ok(username)
}

/// Blank strings clear an optional payment field
fn optional_field(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Clone)]
pub struct UserService<C: Connection> {
    user_repository: C::UserRepository,
}

impl<C: Connection> UserService<C> {
    pub fn new(connection: Arc<C>) -> Self {
        let user_repository = connection.create_user_repository();
        Self { user_repository }
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.user_repository.get_user(user_id).await
    }

    /// Apply username and payment detail changes to the caller's own profile
    pub async fn update_profile(&self, session: &Session, request: UpdateProfileRequest) -> Result<UserProfile> {
        info!("Updating profile for {}", session.user_id());

        let mut profile = self
            .user_repository
            .get_user(session.user_id())
            .await?
            .ok_or_else(|| anyhow!("Profile not found for {}", session.user_id()))?;

        if let Some(raw) = request.username {
            let username = normalize_username(&raw)?;
            if username != profile.username {
                if let Some(owner) = self.user_repository.find_user_by_username(&username).await? {
                    if owner.id != profile.id {
                        return Err(DomainError::UsernameTaken(username).into());
                    }
                }
                profile.username = username;
            }
        }
        if let Some(bank_account) = request.bank_account {
            profile.bank_account = optional_field(bank_account);
        }
        if let Some(e_wallet) = request.e_wallet {
            profile.e_wallet = optional_field(e_wallet);
        }

        self.user_repository.store_user(&profile).await?;
        Ok(profile)
    }

    /// Prefix search on username, excluding the caller and anyone already selected
    pub async fn search_friends(&self, session: &Session, query: &SearchFriendsQuery) -> Result<Vec<UserProfile>> {
        let prefix: String = query
            .query
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        if prefix.is_empty() {
            return Ok(Vec::new());
        }

        let found = self.user_repository.search_by_username_prefix(&prefix).await?;
        let results: Vec<UserProfile> = found
            .into_iter()
            .filter(|profile| profile.id != session.user_id())
            .filter(|profile| !query.selected_ids.contains(&profile.id))
            .take(FRIEND_SEARCH_LIMIT)
            .collect();

        debug!("Friend search '{}' returned {} profiles", prefix, results.len());
        Ok(results)
    }
}
