//! Pluggable user-account directory for Chopin.
//!
//! [`UserService`] is the single entry point: bind one [`UserBackend`] at
//! startup, then look up and save accounts and drive the two single-use
//! token lifecycles (account activation and password reset).
//!
//! ```rust,no_run
//! use chopin_accounts::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AccountError> {
//!     let service = UserService::with_backend(InMemoryUserBackend::new());
//!
//!     let alice = Account::userpass("alice", "alice@example.com", "argon2-hash");
//!     service.save(&alice).await?;
//!     let token = service.create_activation(&alice).await?;
//!
//!     assert!(service.activate(&token).await?);
//!     assert!(!service.activate(&token).await?);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod database;
pub mod db;
pub mod email;
pub mod entities;
pub mod error;
pub mod logging;
pub mod mailer;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod prelude;
pub mod service;
pub mod sweeper;
pub mod token;
pub mod workflow;

pub use backend::UserBackend;
pub use config::AccountsConfig;
pub use database::SeaOrmUserBackend;
pub use error::AccountError;
pub use memory::InMemoryUserBackend;
pub use models::{Account, AuthMethod, UserId};
pub use service::UserService;
