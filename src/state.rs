use crate::config::Config;
use crate::models::Database;
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub company_name: String,
    pub data: Arc<Mutex<Database>>,
    /// Session token to user id. Kept in memory only.
    pub sessions: Arc<Mutex<HashMap<String, u64>>>,
}

impl AppState {
    pub fn new(config: &Config, data: Database) -> Self {
        Self {
            data_path: config.data_path.clone(),
            company_name: config.company_name.clone(),
            data: Arc::new(Mutex::new(data)),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}
