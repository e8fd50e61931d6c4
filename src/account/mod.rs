pub mod handlers;
pub mod models;
pub mod service;

pub use handlers::{create_account, get_account, list_accounts};
