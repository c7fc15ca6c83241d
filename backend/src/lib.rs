//! # Split Bill Backend
//!
//! Splits itemized group bills into per-member shares, records who has paid,
//! and keeps members informed through notifications.
//!
//! ## Layers
//!
//! - `domain`: calculation, validation and the services built on them
//! - `storage`: async repository traits and the JSON document store
//! - `config`: application settings
//!
//! [`Backend`] wires every service to a single storage connection.

use anyhow::Result;
use log::info;
use std::sync::Arc;

pub mod config;
pub mod domain;
pub mod storage;

pub use config::AppConfig;
pub use storage::JsonConnection;

use domain::{
    BillService, DebtService, GroupService, IdentityProvider, NotificationService, Session,
    UserService,
};
use storage::Connection;

/// Main backend struct that holds all services
#[derive(Clone)]
pub struct Backend<C: Connection> {
    pub identity: C::IdentityProvider,
    pub user_service: UserService<C>,
    pub group_service: GroupService<C>,
    pub bill_service: BillService<C>,
    pub debt_service: DebtService<C>,
    pub notification_service: NotificationService<C>,
}

impl<C: Connection> Backend<C> {
    pub fn new(connection: Arc<C>) -> Self {
        let notification_service = NotificationService::new(connection.clone());
        Self {
            identity: connection.create_identity_provider(),
            user_service: UserService::new(connection.clone()),
            group_service: GroupService::new(connection.clone()),
            bill_service: BillService::new(connection.clone(), notification_service.clone()),
            debt_service: DebtService::new(connection),
            notification_service,
        }
    }

    /// Consume the current session event; errors when nobody is signed in
    pub async fn current_session(&self) -> Result<Session> {
        self.identity.session_event().await?.into_session()
    }
}

/// Open the JSON store named by `config` and build every service on it
pub fn initialize_backend(config: &AppConfig) -> Result<Backend<JsonConnection>> {
    info!(
        "Initializing backend with data directory {}",
        config.data_directory.display()
    );
    let connection = Arc::new(JsonConnection::new(&config.data_directory)?);
    Ok(Backend::new(connection))
}
