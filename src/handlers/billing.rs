use super::{require_client, today};
use crate::activity;
use crate::auth::CurrentUser;
use crate::billing::{
    self, aging_report_at, build_invoice, month_key, normalize_month, AgingReport,
    InvoiceDocument, MonthlySummary, PaymentInput,
};
use crate::errors::{AppError, BillingError};
use crate::models::{
    ActivityKind, BillingPatch, BillingQuery, BillingRecord, BulkPayRequest, Database,
    GenerateRequest, MonthQuery, PayRecordRequest, Payment, PaymentQuery, PaymentRequest,
};
use crate::state::AppState;
use crate::storage::persist_data;
use crate::ui::render_invoice;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    Extension, Json,
};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub month: String,
    pub created: Vec<BillingRecord>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<BillingQuery>,
) -> Result<Json<Vec<BillingRecord>>, AppError> {
    let month = query.month.as_deref().map(normalize_month).transpose()?;
    let data = state.data.lock().await;
    let mut records: Vec<BillingRecord> = data
        .billing
        .values()
        .filter(|record| query.client_id.is_none_or(|id| record.client_id == id))
        .filter(|record| month.as_ref().is_none_or(|month| &record.month == month))
        .filter(|record| query.status.is_none_or(|status| record.status == status))
        .cloned()
        .collect();
    records.sort_by(|a, b| b.month.cmp(&a.month).then(a.client_id.cmp(&b.client_id)));
    Ok(Json(records))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<BillingRecord>, AppError> {
    let data = state.data.lock().await;
    data.billing
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| BillingError::RecordNotFound(id).into())
}

pub async fn generate(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    payload: Option<Json<GenerateRequest>>,
) -> Result<Json<GenerateResponse>, AppError> {
    let today = today();
    let month = match payload.and_then(|Json(request)| request.month) {
        Some(month) => normalize_month(&month)?,
        None => month_key(today),
    };

    let mut data = state.data.lock().await;
    let ids = billing::generate_invoices(&mut data, &month, today)?;
    let created: Vec<BillingRecord> = ids
        .iter()
        .filter_map(|id| data.billing.get(id).cloned())
        .collect();

    if !created.is_empty() {
        for record in &created {
            activity::record(
                &mut data,
                Some(&user.username),
                ActivityKind::Billing,
                "generated",
                Some(record.client_id),
                format!("Generated invoice {} for {}", record.invoice_number, record.amount_due),
            );
        }
        persist_data(&state.data_path, &data).await?;
    }
    info!(month = %month, created = created.len(), "generated monthly invoices");
    Ok(Json(GenerateResponse { month, created }))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<u64>,
    Json(patch): Json<BillingPatch>,
) -> Result<Json<BillingRecord>, AppError> {
    let mut data = state.data.lock().await;
    let record = billing::update_record(&mut data, id, patch, today())?;
    activity::record(
        &mut data,
        Some(&user.username),
        ActivityKind::Billing,
        "updated",
        Some(record.client_id),
        format!("Updated invoice {}", record.invoice_number),
    );
    persist_data(&state.data_path, &data).await?;
    info!(billing_id = id, "billing record updated");
    Ok(Json(record))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<u64>,
) -> Result<StatusCode, AppError> {
    let mut data = state.data.lock().await;
    let record = billing::delete_record(&mut data, id)?;
    activity::record(
        &mut data,
        Some(&user.username),
        ActivityKind::Billing,
        "deleted",
        Some(record.client_id),
        format!("Deleted invoice {}", record.invoice_number),
    );
    persist_data(&state.data_path, &data).await?;
    info!(billing_id = id, "billing record deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn record_payment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(client_id): Path<u64>,
    Json(request): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    let mut data = state.data.lock().await;
    let payment = billing::record_payment(
        &mut data,
        client_id,
        PaymentInput {
            amount: request.amount,
            paid_on: request.paid_on,
            method: request.method,
            reference: request.reference,
            billing_ids: request.billing_ids,
        },
        today(),
    )?;
    log_payment(&mut data, &user, &payment);
    persist_data(&state.data_path, &data).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn pay(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<u64>,
    payload: Option<Json<PayRecordRequest>>,
) -> Result<Json<Payment>, AppError> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let mut data = state.data.lock().await;
    let payment = billing::pay_record(
        &mut data,
        id,
        request.amount,
        request.paid_on,
        request.method,
        today(),
    )?;
    log_payment(&mut data, &user, &payment);
    persist_data(&state.data_path, &data).await?;
    Ok(Json(payment))
}

pub async fn bulk_pay(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<BulkPayRequest>,
) -> Result<Json<Vec<Payment>>, AppError> {
    if request.billing_ids.is_empty() {
        return Err(AppError::bad_request("billing_ids must not be empty"));
    }
    let mut data = state.data.lock().await;
    let payments = billing::bulk_pay(
        &mut data,
        &request.billing_ids,
        request.paid_on,
        request.method,
        today(),
    )?;
    for payment in &payments {
        log_payment(&mut data, &user, payment);
    }
    if !payments.is_empty() {
        persist_data(&state.data_path, &data).await?;
    }
    Ok(Json(payments))
}

pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentQuery>,
) -> Json<Vec<Payment>> {
    let data = state.data.lock().await;
    let mut payments: Vec<Payment> = data
        .payments
        .values()
        .filter(|payment| query.client_id.is_none_or(|id| payment.client_id == id))
        .cloned()
        .collect();
    payments.sort_by(|a, b| b.paid_on.cmp(&a.paid_on).then(b.id.cmp(&a.id)));
    Json(payments)
}

pub async fn client_payments(
    State(state): State<AppState>,
    Path(client_id): Path<u64>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let data = state.data.lock().await;
    require_client(&data, client_id)?;
    let mut payments: Vec<Payment> = data
        .payments
        .values()
        .filter(|payment| payment.client_id == client_id)
        .cloned()
        .collect();
    payments.sort_by(|a, b| b.paid_on.cmp(&a.paid_on).then(b.id.cmp(&a.id)));
    Ok(Json(payments))
}

pub async fn reverse_payment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<u64>,
) -> Result<Json<Payment>, AppError> {
    let mut data = state.data.lock().await;
    let payment = billing::reverse_payment(&mut data, id, today())?;
    activity::record(
        &mut data,
        Some(&user.username),
        ActivityKind::Payment,
        "reversed",
        Some(payment.client_id),
        format!("Reversed payment of {}", payment.amount),
    );
    persist_data(&state.data_path, &data).await?;
    info!(payment_id = id, client_id = payment.client_id, "payment reversed");
    Ok(Json(payment))
}

pub async fn aging(State(state): State<AppState>) -> Json<AgingReport> {
    let data = state.data.lock().await;
    Json(aging_report_at(&data, today()))
}

pub async fn summary(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<MonthlySummary>, AppError> {
    let month = query.month.unwrap_or_else(|| month_key(today()));
    let data = state.data.lock().await;
    Ok(Json(billing::monthly_summary(&data, &month)?))
}

pub async fn invoice(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<InvoiceDocument>, AppError> {
    let data = state.data.lock().await;
    Ok(Json(build_invoice(&data, id, &state.company_name)?))
}

pub async fn invoice_page(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Html<String>, AppError> {
    let data = state.data.lock().await;
    let document = build_invoice(&data, id, &state.company_name)?;
    Ok(Html(render_invoice(&document)))
}

fn log_payment(data: &mut Database, user: &CurrentUser, payment: &Payment) {
    let months: Vec<&str> = payment
        .allocations
        .iter()
        .map(|allocation| allocation.month.as_str())
        .collect();
    let summary = if months.is_empty() {
        format!("Payment of {} added to credit", payment.amount)
    } else {
        format!("Payment of {} applied to {}", payment.amount, months.join(", "))
    };
    activity::record(
        data,
        Some(&user.username),
        ActivityKind::Payment,
        "recorded",
        Some(payment.client_id),
        summary,
    );
    info!(
        payment_id = payment.id,
        client_id = payment.client_id,
        amount = %payment.amount,
        credited = %payment.credited,
        "payment recorded"
    );
}
