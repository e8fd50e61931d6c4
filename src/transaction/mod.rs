pub mod handlers;
pub mod models;
pub mod service;

pub use handlers::{create_transaction, list_transactions};
