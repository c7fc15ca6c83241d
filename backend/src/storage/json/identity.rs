//! # Local Identity Provider
//!
//! Email/password and federated sign-in backed by the JSON store. Passwords
//! are kept as `hex(sha256(salt ":" password))` with a per-account random
//! salt in the `credentials` collection, keyed by lower-cased email. The
//! signed-in user is remembered in the `sessions` collection so separate
//! invocations of the binary see the same session.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use shared::UserProfile;
use uuid::Uuid;

use super::connection::JsonConnection;
use super::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::domain::session::{
    CurrentUser, FederatedIdentity, IdentityProvider, RegisterRequest, Session, SessionEvent,
};
use crate::domain::user_service::normalize_username;
use crate::storage::traits::UserStorage;

const CREDENTIALS: &str = "credentials";
const SESSIONS: &str = "sessions";
const CURRENT_SESSION: &str = "current";
const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Credential {
    user_id: String,
    email: String,
    salt: String,
    password_hash: String,
}

fn password_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn session_for(profile: &UserProfile) -> Session {
    Session::new(CurrentUser {
        id: profile.id.clone(),
        display_name: profile.display_name.clone(),
        photo_ref: profile.photo_ref.clone(),
    })
}

/// Username candidate for a first-time federated sign-in
fn username_seed(identity: &FederatedIdentity) -> String {
    let source = identity
        .email
        .as_deref()
        .and_then(|email| email.split('@').next())
        .unwrap_or(&identity.display_name);
    let mut seed: String = source
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();
    if seed.len() < 4 {
        seed.push_str("user");
    }
    seed
}

#[derive(Clone)]
pub struct LocalIdentityProvider {
    connection: JsonConnection,
    users: UserRepository,
}

impl LocalIdentityProvider {
    pub fn new(connection: JsonConnection) -> Self {
        let users = UserRepository::new(connection.clone());
        Self { connection, users }
    }

    fn start_session(&self, profile: &UserProfile) -> Result<Session> {
        self.connection
            .set(SESSIONS, CURRENT_SESSION, json!({ "userId": profile.id }))?;
        info!("Session started for {} ({})", profile.display_name, profile.id);
        Ok(session_for(profile))
    }

    async fn available_username(&self, seed: &str) -> Result<String> {
        let mut candidate = seed.to_string();
        let mut suffix = 2;
        while self.users.find_user_by_username(&candidate).await?.is_some() {
            candidate = format!("{}_{}", seed, suffix);
            suffix += 1;
        }
        Ok(candidate)
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn session_event(&self) -> Result<SessionEvent> {
        let user_id = self
            .connection
            .get(SESSIONS, CURRENT_SESSION)?
            .and_then(|document| document.get("userId").and_then(Value::as_str).map(str::to_string));

        let Some(user_id) = user_id else {
            return Ok(SessionEvent::SignedOut);
        };

        match self.users.get_user(&user_id).await? {
            Some(profile) => Ok(SessionEvent::Started(session_for(&profile))),
            None => {
                warn!("Session refers to missing profile {}", user_id);
                Ok(SessionEvent::SignedOut)
            }
        }
    }

    async fn register(&self, request: RegisterRequest) -> Result<Session> {
        let email = request.email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(DomainError::InvalidRegistration(format!("'{}' is not an email address", email)).into());
        }
        if request.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(DomainError::InvalidRegistration(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            ))
            .into());
        }
        if self.connection.get(CREDENTIALS, &email)?.is_some() {
            return Err(DomainError::InvalidRegistration(format!("{} is already registered", email)).into());
        }

        let username = normalize_username(&request.username)?;
        if self.users.find_user_by_username(&username).await?.is_some() {
            return Err(DomainError::UsernameTaken(username).into());
        }

        let display_name = match request.display_name.trim() {
            "" => username.clone(),
            name => name.to_string(),
        };
        let profile = UserProfile {
            id: Uuid::new_v4().to_string(),
            username,
            display_name,
            email: Some(email.clone()),
            photo_ref: None,
            bank_account: None,
            e_wallet: None,
            created_at: Utc::now(),
        };
        self.users.store_user(&profile).await?;

        let salt = Uuid::new_v4().simple().to_string();
        let credential = Credential {
            user_id: profile.id.clone(),
            email: email.clone(),
            password_hash: password_digest(&salt, &request.password),
            salt,
        };
        self.connection
            .set(CREDENTIALS, &email, serde_json::to_value(&credential)?)?;

        info!("Registered @{} with {}", profile.username, email);
        self.start_session(&profile)
    }

    async fn sign_in_with_credentials(&self, email: &str, password: &str) -> Result<Session> {
        let email = email.trim().to_lowercase();
        let credential: Credential = match self.connection.get(CREDENTIALS, &email)? {
            Some(document) => serde_json::from_value(document)?,
            None => return Err(DomainError::InvalidCredentials.into()),
        };

        if password_digest(&credential.salt, password) != credential.password_hash {
            warn!("Rejected sign-in for {}", email);
            return Err(DomainError::InvalidCredentials.into());
        }

        let profile = self
            .users
            .get_user(&credential.user_id)
            .await?
            .ok_or_else(|| anyhow!("Profile {} for {} is missing", credential.user_id, email))?;
        self.start_session(&profile)
    }

    async fn sign_in_with_federated_provider(&self, identity: FederatedIdentity) -> Result<Session> {
        let user_id = format!("{}:{}", identity.provider, identity.subject);

        let profile = match self.users.get_user(&user_id).await? {
            Some(mut profile) => {
                // Keep the provider's latest name and photo
                profile.display_name = identity.display_name.clone();
                if identity.photo_ref.is_some() {
                    profile.photo_ref = identity.photo_ref.clone();
                }
                profile
            }
            None => {
                let username = self.available_username(&username_seed(&identity)).await?;
                info!("First {} sign-in, created @{}", identity.provider, username);
                UserProfile {
                    id: user_id,
                    username,
                    display_name: identity.display_name.clone(),
                    email: identity.email.clone(),
                    photo_ref: identity.photo_ref.clone(),
                    bank_account: None,
                    e_wallet: None,
                    created_at: Utc::now(),
                }
            }
        };

        self.users.store_user(&profile).await?;
        self.start_session(&profile)
    }

    async fn sign_out(&self) -> Result<()> {
        self.connection
            .set(SESSIONS, CURRENT_SESSION, json!({ "userId": Value::Null }))?;
        info!("Signed out");
        Ok(())
    }
}
