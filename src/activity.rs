use crate::models::{Activity, ActivityKind, ActivityQuery, Database};
use chrono::Utc;

pub const HISTORY_LIMIT: usize = 5000;
pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 500;

pub fn record(
    db: &mut Database,
    actor: Option<&str>,
    kind: ActivityKind,
    action: &str,
    client_id: Option<u64>,
    summary: impl Into<String>,
) {
    let id = db.next_activity_id();
    db.activity.push(Activity {
        id,
        at: Utc::now(),
        client_id,
        kind,
        action: action.to_string(),
        summary: summary.into(),
        actor: actor.map(str::to_string),
    });
    if db.activity.len() > HISTORY_LIMIT {
        let excess = db.activity.len() - HISTORY_LIMIT;
        db.activity.drain(..excess);
    }
}

/// Newest first.
pub fn history<'a>(db: &'a Database, query: &ActivityQuery) -> Vec<&'a Activity> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    db.activity
        .iter()
        .rev()
        .filter(|entry| query.client_id.is_none_or(|id| entry.client_id == Some(id)))
        .filter(|entry| query.kind.is_none_or(|kind| entry.kind == kind))
        .take(limit)
        .collect()
}
