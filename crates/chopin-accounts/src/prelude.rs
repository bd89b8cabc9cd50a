//! Import the common types with one line.
//!
//! ```rust,ignore
//! use chopin_accounts::prelude::*;
//! ```

pub use crate::backend::UserBackend;
pub use crate::config::AccountsConfig;
pub use crate::database::SeaOrmUserBackend;
pub use crate::error::AccountError;
pub use crate::mailer::{Mailer, TracingMailer};
pub use crate::memory::InMemoryUserBackend;
pub use crate::models::{Account, AuthMethod, UserId};
pub use crate::service::UserService;
pub use crate::sweeper::PendingActivationSweeper;
