//! Monthly invoicing and payment reconciliation.
//!
//! Every client on a monthly retainer gets one [`BillingRecord`] per month.
//! Payments are spread over the client's outstanding months oldest first;
//! anything left over lands on the client's credit balance, which is drawn
//! down automatically when the next invoice is generated.

use crate::errors::{BillingError, ValidationError};
use crate::models::{
    Allocation, BillingPatch, BillingRecord, BillingStatus, ClientStatus, Database, Payment,
};
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

pub fn parse_month(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d")
        .map_err(|_| ValidationError::Month(value.to_string()))
}

/// Normalises a user supplied month to `YYYY-MM`.
pub fn normalize_month(value: &str) -> Result<String, ValidationError> {
    parse_month(value).map(month_key)
}

pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

pub fn invoice_number(month: &str, client_id: u64) -> String {
    format!("INV-{}-{:04}", month.replace('-', ""), client_id)
}

pub fn due_date_for(month_start: NaiveDate, billing_day: u8) -> NaiveDate {
    month_start
        .with_day(u32::from(billing_day.clamp(1, 28)))
        .unwrap_or(month_start)
}

/// Upper bound for any single money input.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a non-negative money input and enforces [`MAX_AMOUNT`].
pub fn money_input(field: &'static str, amount: Decimal) -> Result<Decimal, ValidationError> {
    if amount < Decimal::ZERO {
        return Err(ValidationError::Negative(field));
    }
    if amount > MAX_AMOUNT {
        return Err(ValidationError::TooLarge(field));
    }
    Ok(round_money(amount))
}

/// Saturating sum for report totals.
pub fn sum_money(amounts: impl IntoIterator<Item = Decimal>) -> Decimal {
    amounts.into_iter().fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Recomputes `status` and `paid_on` from the amounts.
pub fn refresh_status(record: &mut BillingRecord, on: NaiveDate) {
    record.status = if record.amount_paid >= record.amount_due {
        BillingStatus::Paid
    } else if record.amount_paid > Decimal::ZERO {
        BillingStatus::Partial
    } else {
        BillingStatus::Unpaid
    };

    if record.status == BillingStatus::Paid {
        record.paid_on.get_or_insert(on);
    } else {
        record.paid_on = None;
    }
}

/// Creates this month's invoice for every active client that does not have
/// one yet. Returns the ids of the created records.
pub fn generate_invoices(
    db: &mut Database,
    month: &str,
    today: NaiveDate,
) -> Result<Vec<u64>, ValidationError> {
    let month_start = parse_month(month)?;
    let month = month_key(month_start);

    let billed: HashSet<u64> = db
        .billing
        .values()
        .filter(|record| record.month == month)
        .map(|record| record.client_id)
        .collect();

    let due: Vec<u64> = db
        .clients
        .values()
        .filter(|client| {
            client.status == ClientStatus::Active
                && client.monthly_rate > Decimal::ZERO
                && client.billing_start.as_str() <= month.as_str()
                && !billed.contains(&client.id)
        })
        .map(|client| client.id)
        .collect();

    let mut created = Vec::with_capacity(due.len());
    for client_id in due {
        let id = db.next_billing_id();
        let Some(client) = db.clients.get_mut(&client_id) else {
            continue;
        };

        let amount_due = round_money(client.monthly_rate);
        let from_credit = client.credit_balance.min(amount_due).max(Decimal::ZERO);
        client.credit_balance -= from_credit;

        let mut record = BillingRecord {
            id,
            client_id,
            month: month.clone(),
            invoice_number: invoice_number(&month, client_id),
            amount_due,
            amount_paid: from_credit,
            status: BillingStatus::Unpaid,
            due_date: due_date_for(month_start, client.billing_day),
            paid_on: None,
            notes: None,
            created_at: Utc::now(),
        };
        refresh_status(&mut record, today);
        db.billing.insert(id, record);
        created.push(id);
    }

    Ok(created)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    pub allocations: Vec<Allocation>,
    pub remainder: Decimal,
}

/// Spreads `amount` over the records' outstanding balances, oldest month
/// first. Records with nothing outstanding are skipped.
pub fn allocate<'a>(
    records: impl IntoIterator<Item = &'a BillingRecord>,
    amount: Decimal,
) -> AllocationPlan {
    let mut ordered: Vec<&BillingRecord> = records
        .into_iter()
        .filter(|record| record.outstanding() > Decimal::ZERO)
        .collect();
    ordered.sort_by(|a, b| a.month.cmp(&b.month).then(a.id.cmp(&b.id)));

    let mut remaining = amount.max(Decimal::ZERO);
    let mut allocations = Vec::new();
    for record in ordered {
        if remaining <= Decimal::ZERO {
            break;
        }
        let applied = remaining.min(record.outstanding());
        remaining -= applied;
        allocations.push(Allocation {
            billing_id: record.id,
            month: record.month.clone(),
            amount: applied,
        });
    }

    AllocationPlan {
        allocations,
        remainder: remaining,
    }
}

#[derive(Debug, Clone, Default)]
pub struct PaymentInput {
    pub amount: Decimal,
    pub paid_on: Option<NaiveDate>,
    pub method: Option<String>,
    pub reference: Option<String>,
    /// Restricts allocation to these records.
    pub billing_ids: Option<Vec<u64>>,
}

pub fn record_payment(
    db: &mut Database,
    client_id: u64,
    input: PaymentInput,
    today: NaiveDate,
) -> Result<Payment, BillingError> {
    let amount = round_money(input.amount);
    if amount <= Decimal::ZERO {
        return Err(BillingError::NonPositiveAmount);
    }
    if amount > MAX_AMOUNT {
        return Err(BillingError::AmountTooLarge);
    }
    if !db.clients.contains_key(&client_id) {
        return Err(BillingError::ClientNotFound(client_id));
    }

    let restrict: Option<BTreeSet<u64>> = match &input.billing_ids {
        Some(ids) => {
            for id in ids {
                let record = db.billing.get(id).ok_or(BillingError::RecordNotFound(*id))?;
                if record.client_id != client_id {
                    return Err(BillingError::ForeignRecord {
                        record: *id,
                        client: client_id,
                    });
                }
            }
            Some(ids.iter().copied().collect())
        }
        None => None,
    };

    let plan = allocate(
        db.billing.values().filter(|record| {
            record.client_id == client_id
                && restrict.as_ref().is_none_or(|ids| ids.contains(&record.id))
        }),
        amount,
    );

    let paid_on = input.paid_on.unwrap_or(today);
    for allocation in &plan.allocations {
        if let Some(record) = db.billing.get_mut(&allocation.billing_id) {
            record.amount_paid = record.amount_paid.saturating_add(allocation.amount);
            refresh_status(record, paid_on);
        }
    }
    if let Some(client) = db.clients.get_mut(&client_id) {
        client.credit_balance = client.credit_balance.saturating_add(plan.remainder);
    }

    let id = db.next_payment_id();
    let payment = Payment {
        id,
        client_id,
        amount,
        paid_on,
        method: clean(input.method),
        reference: clean(input.reference),
        allocations: plan.allocations,
        credited: plan.remainder,
        created_at: Utc::now(),
    };
    db.payments.insert(id, payment.clone());
    Ok(payment)
}

/// Pays a single record. Without an amount the full outstanding is paid.
pub fn pay_record(
    db: &mut Database,
    billing_id: u64,
    amount: Option<Decimal>,
    paid_on: Option<NaiveDate>,
    method: Option<String>,
    today: NaiveDate,
) -> Result<Payment, BillingError> {
    let record = db
        .billing
        .get(&billing_id)
        .ok_or(BillingError::RecordNotFound(billing_id))?;
    let outstanding = record.outstanding();
    let client_id = record.client_id;

    let amount = match amount {
        Some(amount) => amount,
        None if outstanding > Decimal::ZERO => outstanding,
        None => return Err(BillingError::NothingOutstanding),
    };

    record_payment(
        db,
        client_id,
        PaymentInput {
            amount,
            paid_on,
            method,
            reference: None,
            billing_ids: Some(vec![billing_id]),
        },
        today,
    )
}

/// Settles every listed record in full, one payment per client. Fails
/// without side effects when any id is unknown.
pub fn bulk_pay(
    db: &mut Database,
    billing_ids: &[u64],
    paid_on: Option<NaiveDate>,
    method: Option<String>,
    today: NaiveDate,
) -> Result<Vec<Payment>, BillingError> {
    let mut by_client: BTreeMap<u64, (Vec<u64>, Decimal)> = BTreeMap::new();
    let unique: BTreeSet<u64> = billing_ids.iter().copied().collect();
    for id in unique {
        let record = db.billing.get(&id).ok_or(BillingError::RecordNotFound(id))?;
        let entry = by_client.entry(record.client_id).or_default();
        entry.0.push(id);
        entry.1 = entry.1.saturating_add(record.outstanding());
    }

    let mut payments = Vec::new();
    for (client_id, (ids, total)) in by_client {
        if total <= Decimal::ZERO {
            continue;
        }
        payments.push(record_payment(
            db,
            client_id,
            PaymentInput {
                amount: total,
                paid_on,
                method: method.clone(),
                reference: None,
                billing_ids: Some(ids),
            },
            today,
        )?);
    }
    Ok(payments)
}

/// Undoes a payment. Credit that has already been consumed by a later
/// invoice stays applied there.
pub fn reverse_payment(
    db: &mut Database,
    payment_id: u64,
    today: NaiveDate,
) -> Result<Payment, BillingError> {
    let payment = db
        .payments
        .remove(&payment_id)
        .ok_or(BillingError::PaymentNotFound(payment_id))?;

    for allocation in &payment.allocations {
        if let Some(record) = db.billing.get_mut(&allocation.billing_id) {
            record.amount_paid = (record.amount_paid - allocation.amount).max(Decimal::ZERO);
            refresh_status(record, today);
        }
    }
    if let Some(client) = db.clients.get_mut(&payment.client_id) {
        let clawback = payment.credited.min(client.credit_balance);
        client.credit_balance -= clawback;
    }
    Ok(payment)
}

pub fn update_record(
    db: &mut Database,
    billing_id: u64,
    patch: BillingPatch,
    today: NaiveDate,
) -> Result<BillingRecord, BillingError> {
    let record = db
        .billing
        .get_mut(&billing_id)
        .ok_or(BillingError::RecordNotFound(billing_id))?;

    if let Some(amount_due) = patch.amount_due {
        if amount_due > MAX_AMOUNT {
            return Err(BillingError::AmountTooLarge);
        }
        let amount_due = round_money(amount_due);
        if amount_due < record.amount_paid || amount_due < Decimal::ZERO {
            return Err(BillingError::BelowPaid(record.amount_paid.to_string()));
        }
        record.amount_due = amount_due;
    }
    if let Some(due_date) = patch.due_date {
        record.due_date = due_date;
    }
    if let Some(notes) = patch.notes {
        record.notes = clean(Some(notes));
    }
    refresh_status(record, today);
    Ok(record.clone())
}

pub fn delete_record(db: &mut Database, billing_id: u64) -> Result<BillingRecord, BillingError> {
    let record = db
        .billing
        .get(&billing_id)
        .ok_or(BillingError::RecordNotFound(billing_id))?;
    if record.amount_paid > Decimal::ZERO {
        return Err(BillingError::HasPayments(billing_id));
    }
    db.billing
        .remove(&billing_id)
        .ok_or(BillingError::RecordNotFound(billing_id))
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct AgingBuckets {
    pub current: Decimal,
    pub days_1_30: Decimal,
    pub days_31_60: Decimal,
    pub days_61_90: Decimal,
    pub days_over_90: Decimal,
}

impl AgingBuckets {
    pub fn add(&mut self, days_past_due: i64, amount: Decimal) {
        let slot = match days_past_due {
            i64::MIN..=0 => &mut self.current,
            1..=30 => &mut self.days_1_30,
            31..=60 => &mut self.days_31_60,
            61..=90 => &mut self.days_61_90,
            _ => &mut self.days_over_90,
        };
        *slot = slot.saturating_add(amount);
    }

    pub fn merge(&mut self, other: &AgingBuckets) {
        self.current = self.current.saturating_add(other.current);
        self.days_1_30 = self.days_1_30.saturating_add(other.days_1_30);
        self.days_31_60 = self.days_31_60.saturating_add(other.days_31_60);
        self.days_61_90 = self.days_61_90.saturating_add(other.days_61_90);
        self.days_over_90 = self.days_over_90.saturating_add(other.days_over_90);
    }

    pub fn total(&self) -> Decimal {
        sum_money([
            self.current,
            self.days_1_30,
            self.days_31_60,
            self.days_61_90,
            self.days_over_90,
        ])
    }

    pub fn past_due(&self) -> Decimal {
        self.total().saturating_sub(self.current)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientAging {
    pub client_id: u64,
    pub client_name: String,
    pub buckets: AgingBuckets,
    pub total: Decimal,
    pub oldest_due: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgingReport {
    pub as_of: NaiveDate,
    pub clients: Vec<ClientAging>,
    pub totals: AgingBuckets,
    pub total: Decimal,
}

pub fn aging_report_at(db: &Database, today: NaiveDate) -> AgingReport {
    let mut per_client: BTreeMap<u64, (AgingBuckets, Option<NaiveDate>)> = BTreeMap::new();
    for record in db.billing.values() {
        let outstanding = record.outstanding();
        if outstanding <= Decimal::ZERO {
            continue;
        }
        let days = (today - record.due_date).num_days();
        let entry = per_client.entry(record.client_id).or_default();
        entry.0.add(days, outstanding);
        entry.1 = Some(entry.1.map_or(record.due_date, |oldest| oldest.min(record.due_date)));
    }

    let mut totals = AgingBuckets::default();
    let mut clients: Vec<ClientAging> = per_client
        .into_iter()
        .map(|(client_id, (buckets, oldest_due))| {
            totals.merge(&buckets);
            ClientAging {
                client_id,
                client_name: db
                    .clients
                    .get(&client_id)
                    .map(|client| client.name.clone())
                    .unwrap_or_default(),
                total: buckets.total(),
                buckets,
                oldest_due,
            }
        })
        .collect();
    clients.sort_by(|a, b| b.total.cmp(&a.total).then(a.client_id.cmp(&b.client_id)));

    AgingReport {
        as_of: today,
        total: totals.total(),
        clients,
        totals,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientBalance {
    pub client_id: u64,
    pub billed: Decimal,
    pub paid: Decimal,
    pub outstanding: Decimal,
    pub credit: Decimal,
    pub unpaid_months: Vec<String>,
    pub overdue_months: Vec<String>,
}

pub fn client_balance_at(
    db: &Database,
    client_id: u64,
    today: NaiveDate,
) -> Result<ClientBalance, BillingError> {
    let client = db
        .clients
        .get(&client_id)
        .ok_or(BillingError::ClientNotFound(client_id))?;

    let mut records: Vec<&BillingRecord> = db
        .billing
        .values()
        .filter(|record| record.client_id == client_id)
        .collect();
    records.sort_by(|a, b| a.month.cmp(&b.month));

    let mut balance = ClientBalance {
        client_id,
        billed: Decimal::ZERO,
        paid: Decimal::ZERO,
        outstanding: Decimal::ZERO,
        credit: client.credit_balance,
        unpaid_months: Vec::new(),
        overdue_months: Vec::new(),
    };
    for record in records {
        balance.billed = balance.billed.saturating_add(record.amount_due);
        balance.paid = balance.paid.saturating_add(record.amount_paid);
        let outstanding = record.outstanding();
        if outstanding > Decimal::ZERO {
            balance.outstanding = balance.outstanding.saturating_add(outstanding);
            balance.unpaid_months.push(record.month.clone());
            if record.due_date < today {
                balance.overdue_months.push(record.month.clone());
            }
        }
    }
    Ok(balance)
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlySummary {
    pub month: String,
    pub invoices: usize,
    pub billed: Decimal,
    pub collected: Decimal,
    pub outstanding: Decimal,
    pub payments_received: Decimal,
    pub unpaid: usize,
    pub partial: usize,
    pub paid: usize,
}

pub fn monthly_summary(db: &Database, month: &str) -> Result<MonthlySummary, ValidationError> {
    let month = normalize_month(month)?;
    let mut summary = MonthlySummary {
        month: month.clone(),
        invoices: 0,
        billed: Decimal::ZERO,
        collected: Decimal::ZERO,
        outstanding: Decimal::ZERO,
        payments_received: Decimal::ZERO,
        unpaid: 0,
        partial: 0,
        paid: 0,
    };

    for record in db.billing.values().filter(|record| record.month == month) {
        summary.invoices += 1;
        summary.billed = summary.billed.saturating_add(record.amount_due);
        summary.collected = summary.collected.saturating_add(record.amount_paid);
        summary.outstanding = summary.outstanding.saturating_add(record.outstanding());
        match record.status {
            BillingStatus::Unpaid => summary.unpaid += 1,
            BillingStatus::Partial => summary.partial += 1,
            BillingStatus::Paid => summary.paid += 1,
        }
    }
    summary.payments_received = sum_money(
        db.payments
            .values()
            .filter(|payment| month_key(payment.paid_on) == month)
            .map(|payment| payment.amount),
    );

    Ok(summary)
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceParty {
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceLine {
    pub description: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppliedPayment {
    pub payment_id: u64,
    pub paid_on: NaiveDate,
    pub method: Option<String>,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDocument {
    pub billing_id: u64,
    pub invoice_number: String,
    pub company: String,
    pub issued_on: NaiveDate,
    pub due_date: NaiveDate,
    pub month: String,
    pub bill_to: InvoiceParty,
    pub lines: Vec<InvoiceLine>,
    pub amount_due: Decimal,
    pub amount_paid: Decimal,
    pub balance: Decimal,
    pub status: BillingStatus,
    pub payments: Vec<AppliedPayment>,
}

pub fn build_invoice(
    db: &Database,
    billing_id: u64,
    company: &str,
) -> Result<InvoiceDocument, BillingError> {
    let record = db
        .billing
        .get(&billing_id)
        .ok_or(BillingError::RecordNotFound(billing_id))?;
    let client = db
        .clients
        .get(&record.client_id)
        .ok_or(BillingError::ClientNotFound(record.client_id))?;

    let period = parse_month(&record.month)
        .map(|start| start.format("%B %Y").to_string())
        .unwrap_or_else(|_| record.month.clone());

    let payments = db
        .payments
        .values()
        .flat_map(|payment| {
            payment
                .allocations
                .iter()
                .filter(|allocation| allocation.billing_id == billing_id)
                .map(|allocation| AppliedPayment {
                    payment_id: payment.id,
                    paid_on: payment.paid_on,
                    method: payment.method.clone(),
                    amount: allocation.amount,
                })
        })
        .collect();

    Ok(InvoiceDocument {
        billing_id,
        invoice_number: record.invoice_number.clone(),
        company: company.to_string(),
        issued_on: record.created_at.date_naive(),
        due_date: record.due_date,
        month: record.month.clone(),
        bill_to: InvoiceParty {
            name: client.name.clone(),
            company: client.company.clone(),
            email: client.email.clone(),
            address: client.address.clone(),
        },
        lines: vec![InvoiceLine {
            description: format!("Monthly services for {period}"),
            amount: record.amount_due,
        }],
        amount_due: record.amount_due,
        amount_paid: record.amount_paid,
        balance: record.outstanding(),
        status: record.status,
        payments,
    })
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Client;

    fn d(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn add_client(db: &mut Database, name: &str, rate: &str, start: &str) -> u64 {
        let id = db.next_client_id();
        db.clients.insert(
            id,
            Client {
                id,
                name: name.to_string(),
                company: None,
                email: None,
                phone: None,
                address: None,
                status: ClientStatus::Active,
                monthly_rate: d(rate),
                billing_day: 5,
                billing_start: start.to_string(),
                credit_balance: Decimal::ZERO,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        );
        id
    }

    fn record_for<'a>(db: &'a Database, client_id: u64, month: &str) -> &'a BillingRecord {
        db.billing
            .values()
            .find(|record| record.client_id == client_id && record.month == month)
            .expect("missing record")
    }

    #[test]
    fn generation_is_idempotent_and_respects_start_and_status() {
        let mut db = Database::default();
        let today = date(2026, 3, 1);
        let acme = add_client(&mut db, "Acme", "500", "2026-01");
        let later = add_client(&mut db, "Later", "300", "2026-06");
        let lead = add_client(&mut db, "Lead", "200", "2026-01");
        db.clients.get_mut(&lead).unwrap().status = ClientStatus::Lead;

        let created = generate_invoices(&mut db, "2026-03", today).unwrap();
        assert_eq!(created.len(), 1);
        let record = record_for(&db, acme, "2026-03");
        assert_eq!(record.invoice_number, "INV-202603-0001");
        assert_eq!(record.due_date, date(2026, 3, 5));
        assert_eq!(record.status, BillingStatus::Unpaid);

        assert!(generate_invoices(&mut db, "2026-03", today).unwrap().is_empty());
        assert!(db.billing.values().all(|record| record.client_id != later));
    }

    #[test]
    fn generation_rejects_bad_months() {
        let mut db = Database::default();
        let err = generate_invoices(&mut db, "March", date(2026, 3, 1)).unwrap_err();
        assert_eq!(err, ValidationError::Month("March".to_string()));
    }

    #[test]
    fn allocation_fills_oldest_month_first() {
        let mut db = Database::default();
        let today = date(2026, 4, 1);
        let client = add_client(&mut db, "Acme", "100", "2026-01");
        for month in ["2026-03", "2026-01", "2026-02"] {
            generate_invoices(&mut db, month, today).unwrap();
        }

        let plan = allocate(db.billing.values(), d("250"));
        let months: Vec<&str> = plan.allocations.iter().map(|a| a.month.as_str()).collect();
        assert_eq!(months, vec!["2026-01", "2026-02", "2026-03"]);
        assert_eq!(plan.allocations[2].amount, d("50"));
        assert_eq!(plan.remainder, Decimal::ZERO);

        let payment = record_payment(
            &mut db,
            client,
            PaymentInput {
                amount: d("250"),
                ..PaymentInput::default()
            },
            today,
        )
        .unwrap();
        assert_eq!(payment.credited, Decimal::ZERO);
        assert_eq!(record_for(&db, client, "2026-01").status, BillingStatus::Paid);
        assert_eq!(record_for(&db, client, "2026-01").paid_on, Some(today));
        assert_eq!(record_for(&db, client, "2026-03").status, BillingStatus::Partial);
        assert_eq!(record_for(&db, client, "2026-03").outstanding(), d("50"));
    }

    #[test]
    fn overpayment_becomes_credit_and_is_used_by_next_invoice() {
        let mut db = Database::default();
        let today = date(2026, 2, 10);
        let client = add_client(&mut db, "Acme", "100", "2026-01");
        generate_invoices(&mut db, "2026-01", today).unwrap();

        let payment = record_payment(
            &mut db,
            client,
            PaymentInput {
                amount: d("130.004"),
                ..PaymentInput::default()
            },
            today,
        )
        .unwrap();
        assert_eq!(payment.amount, d("130.00"));
        assert_eq!(payment.credited, d("30"));
        assert_eq!(db.clients[&client].credit_balance, d("30"));

        generate_invoices(&mut db, "2026-02", today).unwrap();
        let feb = record_for(&db, client, "2026-02");
        assert_eq!(feb.amount_paid, d("30"));
        assert_eq!(feb.status, BillingStatus::Partial);
        assert_eq!(db.clients[&client].credit_balance, Decimal::ZERO);
    }

    #[test]
    fn restricted_payment_only_touches_selected_months() {
        let mut db = Database::default();
        let today = date(2026, 4, 1);
        let client = add_client(&mut db, "Acme", "100", "2026-01");
        for month in ["2026-01", "2026-02", "2026-03"] {
            generate_invoices(&mut db, month, today).unwrap();
        }
        let march = record_for(&db, client, "2026-03").id;

        record_payment(
            &mut db,
            client,
            PaymentInput {
                amount: d("100"),
                billing_ids: Some(vec![march]),
                ..PaymentInput::default()
            },
            today,
        )
        .unwrap();
        assert_eq!(record_for(&db, client, "2026-01").status, BillingStatus::Unpaid);
        assert_eq!(record_for(&db, client, "2026-03").status, BillingStatus::Paid);
    }

    #[test]
    fn payments_validate_amount_and_ownership() {
        let mut db = Database::default();
        let today = date(2026, 1, 20);
        let a = add_client(&mut db, "A", "100", "2026-01");
        let b = add_client(&mut db, "B", "100", "2026-01");
        generate_invoices(&mut db, "2026-01", today).unwrap();
        let b_record = record_for(&db, b, "2026-01").id;

        let zero = PaymentInput {
            amount: Decimal::ZERO,
            ..PaymentInput::default()
        };
        assert_eq!(
            record_payment(&mut db, a, zero, today).unwrap_err(),
            BillingError::NonPositiveAmount
        );

        let foreign = PaymentInput {
            amount: d("10"),
            billing_ids: Some(vec![b_record]),
            ..PaymentInput::default()
        };
        assert_eq!(
            record_payment(&mut db, a, foreign, today).unwrap_err(),
            BillingError::ForeignRecord {
                record: b_record,
                client: a
            }
        );
        assert!(db.payments.is_empty());
    }

    #[test]
    fn bulk_pay_settles_each_client_separately() {
        let mut db = Database::default();
        let today = date(2026, 2, 1);
        let a = add_client(&mut db, "A", "100", "2026-01");
        let b = add_client(&mut db, "B", "75.50", "2026-01");
        generate_invoices(&mut db, "2026-01", today).unwrap();
        let ids: Vec<u64> = db.billing.keys().copied().collect();

        let payments = bulk_pay(&mut db, &ids, None, Some("bank".into()), today).unwrap();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[1].amount, d("75.50"));
        assert!(db.billing.values().all(|r| r.status == BillingStatus::Paid));
        assert_eq!(record_for(&db, a, "2026-01").paid_on, Some(today));
        assert_eq!(record_for(&db, b, "2026-01").amount_paid, d("75.50"));

        // Already settled: nothing to do.
        assert!(bulk_pay(&mut db, &ids, None, None, today).unwrap().is_empty());
        assert_eq!(
            bulk_pay(&mut db, &[ids[0], 999], None, None, today).unwrap_err(),
            BillingError::RecordNotFound(999)
        );
    }

    #[test]
    fn pay_record_defaults_to_outstanding() {
        let mut db = Database::default();
        let today = date(2026, 1, 20);
        let client = add_client(&mut db, "A", "80", "2026-01");
        generate_invoices(&mut db, "2026-01", today).unwrap();
        let id = record_for(&db, client, "2026-01").id;

        pay_record(&mut db, id, Some(d("30")), None, None, today).unwrap();
        assert_eq!(db.billing[&id].status, BillingStatus::Partial);
        let payment = pay_record(&mut db, id, None, None, None, today).unwrap();
        assert_eq!(payment.amount, d("50"));
        assert_eq!(db.billing[&id].status, BillingStatus::Paid);
        assert_eq!(
            pay_record(&mut db, id, None, None, None, today).unwrap_err(),
            BillingError::NothingOutstanding
        );
    }

    #[test]
    fn reversal_restores_balances_and_credit() {
        let mut db = Database::default();
        let today = date(2026, 1, 20);
        let client = add_client(&mut db, "A", "100", "2026-01");
        generate_invoices(&mut db, "2026-01", today).unwrap();
        let payment = record_payment(
            &mut db,
            client,
            PaymentInput {
                amount: d("120"),
                ..PaymentInput::default()
            },
            today,
        )
        .unwrap();

        reverse_payment(&mut db, payment.id, today).unwrap();
        let record = record_for(&db, client, "2026-01");
        assert_eq!(record.amount_paid, Decimal::ZERO);
        assert_eq!(record.status, BillingStatus::Unpaid);
        assert_eq!(record.paid_on, None);
        assert_eq!(db.clients[&client].credit_balance, Decimal::ZERO);
        assert_eq!(
            reverse_payment(&mut db, payment.id, today).unwrap_err(),
            BillingError::PaymentNotFound(payment.id)
        );
    }

    #[test]
    fn records_with_payments_cannot_be_deleted_or_shrunk() {
        let mut db = Database::default();
        let today = date(2026, 1, 20);
        let client = add_client(&mut db, "A", "100", "2026-01");
        generate_invoices(&mut db, "2026-01", today).unwrap();
        let id = record_for(&db, client, "2026-01").id;
        pay_record(&mut db, id, Some(d("40")), None, None, today).unwrap();

        assert_eq!(delete_record(&mut db, id).unwrap_err(), BillingError::HasPayments(id));
        let patch = BillingPatch {
            amount_due: Some(d("30")),
            ..BillingPatch::default()
        };
        assert!(matches!(
            update_record(&mut db, id, patch, today),
            Err(BillingError::BelowPaid(_))
        ));
        let patch = BillingPatch {
            amount_due: Some(d("40")),
            ..BillingPatch::default()
        };
        let updated = update_record(&mut db, id, patch, today).unwrap();
        assert_eq!(updated.status, BillingStatus::Paid);
    }

    #[test]
    fn aging_buckets_by_days_past_due() {
        let mut db = Database::default();
        let client = add_client(&mut db, "Acme", "100", "2025-10");
        let other = add_client(&mut db, "Small", "10", "2026-01");
        let today = date(2026, 2, 10);
        for month in ["2025-10", "2025-11", "2025-12", "2026-01", "2026-02"] {
            generate_invoices(&mut db, month, today).unwrap();
        }

        // Due dates are the 5th: Feb 5 = 5 days, Jan 5 = 36, Dec 5 = 67,
        // Nov 5 = 97, Oct 5 = 128.
        let report = aging_report_at(&db, today);
        assert_eq!(report.clients.len(), 2);
        assert_eq!(report.clients[0].client_id, client);
        let buckets = &report.clients[0].buckets;
        assert_eq!(buckets.current, Decimal::ZERO);
        assert_eq!(buckets.days_1_30, d("100"));
        assert_eq!(buckets.days_31_60, d("100"));
        assert_eq!(buckets.days_61_90, d("100"));
        assert_eq!(buckets.days_over_90, d("200"));
        assert_eq!(report.clients[0].oldest_due, Some(date(2025, 10, 5)));
        assert_eq!(report.clients[1].client_id, other);
        assert_eq!(report.total, d("520"));
        assert_eq!(report.totals.past_due(), d("520"));

        let early = aging_report_at(&db, date(2026, 2, 5));
        assert_eq!(early.totals.current, d("110"));
    }

    #[test]
    fn client_balance_lists_unpaid_and_overdue_months() {
        let mut db = Database::default();
        let client = add_client(&mut db, "Acme", "100", "2026-01");
        let today = date(2026, 2, 3);
        generate_invoices(&mut db, "2026-01", today).unwrap();
        generate_invoices(&mut db, "2026-02", today).unwrap();
        record_payment(
            &mut db,
            client,
            PaymentInput {
                amount: d("60"),
                ..PaymentInput::default()
            },
            today,
        )
        .unwrap();

        let balance = client_balance_at(&db, client, today).unwrap();
        assert_eq!(balance.billed, d("200"));
        assert_eq!(balance.paid, d("60"));
        assert_eq!(balance.outstanding, d("140"));
        assert_eq!(balance.unpaid_months, vec!["2026-01", "2026-02"]);
        assert_eq!(balance.overdue_months, vec!["2026-01"]);
        assert!(client_balance_at(&db, 42, today).is_err());
    }

    #[test]
    fn monthly_summary_counts_statuses() {
        let mut db = Database::default();
        let today = date(2026, 1, 20);
        let a = add_client(&mut db, "A", "100", "2026-01");
        add_client(&mut db, "B", "50", "2026-01");
        generate_invoices(&mut db, "2026-01", today).unwrap();
        let a_record = record_for(&db, a, "2026-01").id;
        pay_record(&mut db, a_record, None, None, None, today).unwrap();

        let summary = monthly_summary(&db, "2026-01").unwrap();
        assert_eq!(summary.month, "2026-01");
        assert_eq!(summary.invoices, 2);
        assert_eq!(summary.billed, d("150"));
        assert_eq!(summary.collected, d("100"));
        assert_eq!(summary.outstanding, d("50"));
        assert_eq!(summary.payments_received, d("100"));
        assert_eq!((summary.unpaid, summary.partial, summary.paid), (1, 0, 1));
    }

    #[test]
    fn invoice_lists_applied_payments() {
        let mut db = Database::default();
        let today = date(2026, 3, 12);
        let client = add_client(&mut db, "Acme", "250", "2026-03");
        generate_invoices(&mut db, "2026-03", today).unwrap();
        let id = record_for(&db, client, "2026-03").id;
        pay_record(&mut db, id, Some(d("100")), None, Some("card".into()), today).unwrap();

        let invoice = build_invoice(&db, id, "Studio").unwrap();
        assert_eq!(invoice.company, "Studio");
        assert_eq!(invoice.lines[0].description, "Monthly services for March 2026");
        assert_eq!(invoice.balance, d("150"));
        assert_eq!(invoice.payments.len(), 1);
        assert_eq!(invoice.payments[0].method.as_deref(), Some("card"));
    }

    #[test]
    fn reversal_after_credit_was_spent_keeps_later_invoice() {
        let mut db = Database::default();
        let today = date(2026, 2, 10);
        let client = add_client(&mut db, "Acme", "100", "2026-01");
        generate_invoices(&mut db, "2026-01", today).unwrap();
        let payment = record_payment(
            &mut db,
            client,
            PaymentInput {
                amount: d("130"),
                ..PaymentInput::default()
            },
            today,
        )
        .unwrap();
        generate_invoices(&mut db, "2026-02", today).unwrap();
        assert_eq!(db.clients[&client].credit_balance, Decimal::ZERO);

        reverse_payment(&mut db, payment.id, today).unwrap();
        assert_eq!(db.clients[&client].credit_balance, Decimal::ZERO);
        assert_eq!(record_for(&db, client, "2026-01").amount_paid, Decimal::ZERO);
        let feb = record_for(&db, client, "2026-02");
        assert_eq!(feb.amount_paid, d("30"));
        assert_eq!(feb.status, BillingStatus::Partial);
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        assert_eq!(
            money_input("monthly_rate", MAX_AMOUNT + Decimal::ONE).unwrap_err(),
            ValidationError::TooLarge("monthly_rate")
        );
        assert_eq!(
            money_input("budget", d("-1")).unwrap_err(),
            ValidationError::Negative("budget")
        );
        assert_eq!(money_input("spend", d("10.005")).unwrap(), d("10.01"));

        let mut db = Database::default();
        let today = date(2026, 1, 20);
        let client = add_client(&mut db, "Acme", "100", "2026-01");
        generate_invoices(&mut db, "2026-01", today).unwrap();
        let id = record_for(&db, client, "2026-01").id;
        assert_eq!(
            pay_record(&mut db, id, Some(Decimal::MAX), None, None, today).unwrap_err(),
            BillingError::AmountTooLarge
        );
        let patch = BillingPatch {
            amount_due: Some(Decimal::MAX),
            ..BillingPatch::default()
        };
        assert_eq!(
            update_record(&mut db, id, patch, today).unwrap_err(),
            BillingError::AmountTooLarge
        );
    }

    #[test]
    fn totals_saturate_instead_of_overflowing() {
        let mut db = Database::default();
        let today = date(2026, 3, 20);
        let client = add_client(&mut db, "Huge", &Decimal::MAX.to_string(), "2026-01");
        generate_invoices(&mut db, "2026-01", today).unwrap();
        generate_invoices(&mut db, "2026-02", today).unwrap();

        let aging = aging_report_at(&db, today);
        assert_eq!(aging.total, Decimal::MAX);
        assert_eq!(aging.totals.past_due(), Decimal::MAX);

        let balance = client_balance_at(&db, client, today).unwrap();
        assert_eq!(balance.billed, Decimal::MAX);
        assert_eq!(balance.outstanding, Decimal::MAX);

        let dashboard = crate::reports::dashboard_at(&db, date(2026, 2, 20));
        assert_eq!(dashboard.billed_this_month, Decimal::MAX);
        assert_eq!(dashboard.outstanding, Decimal::MAX);
    }
}
