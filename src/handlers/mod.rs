pub mod activity;
pub mod auth;
pub mod billing;
pub mod campaigns;
pub mod clients;
pub mod notes;
pub mod pages;
pub mod tasks;

use crate::errors::AppError;
use crate::models::{Client, Database};
use chrono::{Local, NaiveDate};

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) fn require_client(data: &Database, client_id: u64) -> Result<&Client, AppError> {
    data.clients
        .get(&client_id)
        .ok_or_else(|| AppError::not_found(format!("client {client_id} not found")))
}
