use crate::auth::require_session;
use crate::handlers::{activity, auth, billing, campaigns, clients, notes, pages, tasks};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/invoices/:id", get(billing::invoice_page))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/password", post(auth::change_password))
        .route("/api/dashboard", get(pages::dashboard))
        .route("/api/clients", get(clients::list).post(clients::create))
        .route(
            "/api/clients/:id",
            get(clients::get_one).patch(clients::update).delete(clients::delete),
        )
        .route("/api/clients/:id/balance", get(clients::balance))
        .route(
            "/api/clients/:id/payments",
            get(billing::client_payments).post(billing::record_payment),
        )
        .route(
            "/api/clients/:id/notes",
            get(notes::list_for_client).post(notes::create),
        )
        .route("/api/clients/:id/tasks", get(tasks::list_for_client))
        .route("/api/clients/:id/activity", get(activity::list_for_client))
        .route(
            "/api/clients/:id/campaigns/summary",
            get(campaigns::client_summary),
        )
        .route("/api/billing", get(billing::list))
        .route("/api/billing/generate", post(billing::generate))
        .route("/api/billing/bulk-pay", post(billing::bulk_pay))
        .route("/api/billing/aging", get(billing::aging))
        .route("/api/billing/summary", get(billing::summary))
        .route(
            "/api/billing/:id",
            get(billing::get_one).patch(billing::update).delete(billing::delete),
        )
        .route("/api/billing/:id/pay", post(billing::pay))
        .route("/api/billing/:id/invoice", get(billing::invoice))
        .route("/api/payments", get(billing::list_payments))
        .route("/api/payments/:id", axum::routing::delete(billing::reverse_payment))
        .route("/api/campaigns", get(campaigns::list).post(campaigns::create))
        .route(
            "/api/campaigns/:id",
            get(campaigns::get_one)
                .patch(campaigns::update)
                .delete(campaigns::delete),
        )
        .route("/api/notes/:id", patch(notes::update).delete(notes::delete))
        .route("/api/tasks", get(tasks::list).post(tasks::create))
        .route("/api/tasks/kanban", get(tasks::kanban))
        .route("/api/tasks/calendar", get(tasks::calendar))
        .route("/api/tasks/reports", get(tasks::reports))
        .route(
            "/api/tasks/:id",
            get(tasks::get_one).patch(tasks::update).delete(tasks::delete),
        )
        .route("/api/tasks/:id/move", patch(tasks::move_task))
        .route("/api/activity", get(activity::list))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/", get(pages::index))
        .route("/api/health", get(pages::health))
        .route("/api/auth/login", post(auth::login))
        .merge(protected)
        .with_state(state)
}
