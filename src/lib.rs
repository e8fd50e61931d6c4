pub mod account;
pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod extractors;
pub mod models;
pub mod openapi;
pub mod routes;
pub mod store;
pub mod transaction;
