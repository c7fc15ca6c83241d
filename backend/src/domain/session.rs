//! Explicit session context.
//!
//! Every service operation that acts on behalf of a user takes a [`Session`]
//! instead of looking up a global "current user". Screens obtain one by
//! consuming a [`SessionEvent`] from the identity provider when they load.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::Member;

use super::error::DomainError;

/// The signed-in user as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub display_name: String,
    pub photo_ref: Option<String>,
}

/// Context passed into every user-scoped operation
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    user: CurrentUser,
}

impl Session {
    pub fn new(user: CurrentUser) -> Self {
        Self { user }
    }

    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// Synthesize the member entry for the signed-in user.
    ///
    /// Falls back to "You" when the provider has no display name.
    pub fn self_member(&self) -> Member {
        let display_name = if self.user.display_name.trim().is_empty() {
            "You".to_string()
        } else {
            self.user.display_name.clone()
        };
        Member {
            id: self.user.id.clone(),
            display_name,
            avatar_ref: self.user.photo_ref.clone(),
        }
    }
}

/// Result of asking the provider who is signed in
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started(Session),
    SignedOut,
}

impl SessionEvent {
    /// The started session, or [`DomainError::NotSignedIn`]
    pub fn into_session(self) -> Result<Session> {
        match self {
            SessionEvent::Started(session) => Ok(session),
            SessionEvent::SignedOut => Err(DomainError::NotSignedIn.into()),
        }
    }
}

/// Assertion from an external sign-in provider (e.g. Google)
#[derive(Debug, Clone, PartialEq)]
pub struct FederatedIdentity {
    pub provider: String,
    pub subject: String,
    pub display_name: String,
    pub email: Option<String>,
    pub photo_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: String,
    pub display_name: String,
}

/// The identity collaborator
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Report the current session once; consumed per screen load
    async fn session_event(&self) -> Result<SessionEvent>;

    async fn register(&self, request: RegisterRequest) -> Result<Session>;

    async fn sign_in_with_credentials(&self, email: &str, password: &str) -> Result<Session>;

    async fn sign_in_with_federated_provider(&self, identity: FederatedIdentity) -> Result<Session>;

    async fn sign_out(&self) -> Result<()>;
}
