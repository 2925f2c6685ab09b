use crate::storage::resolve_data_path;
use std::{env, path::PathBuf, str::FromStr};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub admin_username: String,
    pub admin_password: String,
    pub company_name: String,
    pub invoice_on_start: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            data_path: PathBuf::from("data/state.json"),
            admin_username: "admin".to_string(),
            admin_password: "changeme".to_string(),
            company_name: "Client Desk".to_string(),
            invoice_on_start: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, std::io::Error> {
        let defaults = Self::default();
        Ok(Self {
            port: parsed_var("PORT", defaults.port),
            data_path: resolve_data_path()?,
            admin_username: string_var("APP_ADMIN_USER", defaults.admin_username),
            admin_password: string_var("APP_ADMIN_PASSWORD", defaults.admin_password),
            company_name: string_var("APP_COMPANY_NAME", defaults.company_name),
            invoice_on_start: parsed_var("APP_INVOICE_ON_START", defaults.invoice_on_start),
        })
    }
}

fn string_var(name: &str, default: String) -> String {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default,
    }
}

fn parsed_var<T: FromStr + std::fmt::Debug>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("ignoring invalid {name}={raw:?}, using {default:?}");
                default
            }
        },
        Err(_) => default,
    }
}
