pub mod error;
pub mod history;
pub mod log;
pub mod models;
pub mod recipes;
pub mod resolver;
pub mod settings;
pub mod store;
