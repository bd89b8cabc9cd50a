pub mod account;
pub mod token_state;
pub mod user_id;

pub use account::{Account, AuthMethod};
pub use token_state::{ActivationState, ResetState};
pub use user_id::UserId;
