//! # manage
//!
//! Blocking REST client for a server management API.
//!
//! This crate provides the HTTP side of deployment:
//! - [`ManageClient`] implements [`orchestration::ManagementApi`], handing out
//!   one [`HttpResourceManager`] per resource kind
//! - [`AdminClient`] implements [`orchestration::RestartProbe`] using the
//!   admin API's startup timestamp
//!
//! ## Example
//!
//! ```no_run
//! use manage::{ClientConfig, ManageClient};
//! use orchestration::{ManagementApi, ResourceKind};
//!
//! let config = ClientConfig {
//!     password: "admin".into(),
//!     ..Default::default()
//! };
//! let client = ManageClient::new(&config).expect("invalid configuration");
//!
//! let users = client.resource_manager(&ResourceKind::User).unwrap();
//! let receipt = users.save(r#"{"user-name":"alice","password":"x"}"#).unwrap();
//! println!("{} created: {}", receipt.resource_id, receipt.is_created());
//! ```

#![warn(clippy::all)]

pub mod admin;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod payload;
pub mod resource;
pub mod transport;

pub use admin::AdminClient;
pub use config::ClientConfig;
pub use error::{Error, ErrorCategory, Result};
pub use resource::HttpResourceManager;
pub use transport::http::HttpTransport;
pub use transport::{MockTransport, Transport};

use orchestration::{ManagementApi, ResourceKind, ResourceManager};
use std::sync::Arc;

/// High-level client for the management API.
///
/// Cheap to share across threads; every manager it hands out uses the same
/// connection pool.
pub struct ManageClient {
    transport: Arc<dyn Transport>,
}

impl ManageClient {
    /// Create a client for the management port described by `config`.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport: Arc::new(HttpTransport::manage(config)),
        })
    }

    /// Create a client with a custom transport (useful for testing).
    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Restart probe for the admin port described by `config`.
    pub fn admin(config: &ClientConfig) -> Result<AdminClient> {
        config.validate()?;
        Ok(AdminClient::new(Arc::new(HttpTransport::admin(config))))
    }
}

impl ManagementApi for ManageClient {
    fn resource_manager(&self, kind: &ResourceKind) -> orchestration::Result<Arc<dyn ResourceManager>> {
        Ok(Arc::new(HttpResourceManager::new(
            Arc::clone(&self.transport),
            kind.clone(),
        )))
    }
}

impl std::fmt::Debug for ManageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManageClient").finish_non_exhaustive()
    }
}
