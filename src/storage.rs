use crate::errors::AppError;
use crate::models::Database;
use std::{env, path::Path, path::PathBuf};
use tokio::fs;
use tracing::{error, info};

pub fn resolve_data_path() -> Result<PathBuf, std::io::Error> {
    if let Ok(path) = env::var("APP_DATA_PATH") {
        return Ok(PathBuf::from(path));
    }

    Ok(PathBuf::from("data/state.json"))
}

pub async fn load_data(path: &Path) -> Database {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice::<Database>(&bytes) {
            Ok(data) => {
                info!(
                    clients = data.clients.len(),
                    billing = data.billing.len(),
                    tasks = data.tasks.len(),
                    "loaded data file {}",
                    path.display()
                );
                data
            }
            Err(err) => {
                error!("failed to parse data file: {err}");
                Database::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Database::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            Database::default()
        }
    }
}

/// Writes a sibling temp file, then renames it over `path`.
pub async fn persist_data(path: &Path, data: &Database) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(data).map_err(AppError::internal)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, payload).await.map_err(AppError::internal)?;
    fs::rename(&tmp, path).await.map_err(AppError::internal)?;
    Ok(())
}
