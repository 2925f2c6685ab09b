pub mod activity;
pub mod app;
pub mod auth;
pub mod billing;
pub mod campaigns;
pub mod clients;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod reports;
pub mod state;
pub mod storage;
pub mod tasks;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::{load_data, persist_data};
