pub mod account;
pub mod activation_token;
pub mod password_reset_token;
