use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Everything the service persists. Each table is keyed by its id.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Database {
    pub users: BTreeMap<u64, User>,
    pub clients: BTreeMap<u64, Client>,
    pub billing: BTreeMap<u64, BillingRecord>,
    pub payments: BTreeMap<u64, Payment>,
    pub campaigns: BTreeMap<u64, Campaign>,
    pub notes: BTreeMap<u64, Note>,
    pub tasks: BTreeMap<u64, Task>,
    pub activity: Vec<Activity>,
    pub sequences: Sequences,
}

/// Last id handed out per table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Sequences {
    pub user: u64,
    pub client: u64,
    pub billing: u64,
    pub payment: u64,
    pub campaign: u64,
    pub note: u64,
    pub task: u64,
    pub activity: u64,
}

fn bump(slot: &mut u64) -> u64 {
    *slot = slot.saturating_add(1);
    *slot
}

impl Database {
    pub fn next_user_id(&mut self) -> u64 {
        bump(&mut self.sequences.user)
    }

    pub fn next_client_id(&mut self) -> u64 {
        bump(&mut self.sequences.client)
    }

    pub fn next_billing_id(&mut self) -> u64 {
        bump(&mut self.sequences.billing)
    }

    pub fn next_payment_id(&mut self) -> u64 {
        bump(&mut self.sequences.payment)
    }

    pub fn next_campaign_id(&mut self) -> u64 {
        bump(&mut self.sequences.campaign)
    }

    pub fn next_note_id(&mut self) -> u64 {
        bump(&mut self.sequences.note)
    }

    pub fn next_task_id(&mut self) -> u64 {
        bump(&mut self.sequences.task)
    }

    pub fn next_activity_id(&mut self) -> u64 {
        bump(&mut self.sequences.activity)
    }

    /// Removes a client and everything that hangs off it. Tasks survive,
    /// unlinked from the client.
    pub fn remove_client(&mut self, client_id: u64) -> Option<Client> {
        let client = self.clients.remove(&client_id)?;
        self.billing.retain(|_, record| record.client_id != client_id);
        self.payments.retain(|_, payment| payment.client_id != client_id);
        self.campaigns.retain(|_, campaign| campaign.client_id != client_id);
        self.notes.retain(|_, note| note.client_id != client_id);
        for task in self.tasks.values_mut() {
            if task.client_id == Some(client_id) {
                task.client_id = None;
            }
        }
        Some(client)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub display_name: String,
    /// PHC-formatted argon2 hash; carries its own salt and parameters.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: u64,
    pub username: String,
    pub display_name: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    #[default]
    Active,
    Inactive,
    Lead,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: u64,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: ClientStatus,
    pub monthly_rate: Decimal,
    pub billing_day: u8,
    /// First month (YYYY-MM) that gets an invoice.
    pub billing_start: String,
    pub credit_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
    Unpaid,
    Partial,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingRecord {
    pub id: u64,
    pub client_id: u64,
    pub month: String,
    pub invoice_number: String,
    pub amount_due: Decimal,
    pub amount_paid: Decimal,
    pub status: BillingStatus,
    pub due_date: NaiveDate,
    pub paid_on: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BillingRecord {
    pub fn outstanding(&self) -> Decimal {
        (self.amount_due - self.amount_paid).max(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Allocation {
    pub billing_id: u64,
    pub month: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: u64,
    pub client_id: u64,
    pub amount: Decimal,
    pub paid_on: NaiveDate,
    pub method: Option<String>,
    pub reference: Option<String>,
    pub allocations: Vec<Allocation>,
    /// Portion of the payment that went to the client's credit balance.
    pub credited: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Google,
    Facebook,
    Instagram,
    Linkedin,
    Tiktok,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Planned,
    Active,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: u64,
    pub client_id: u64,
    pub name: String,
    pub platform: Platform,
    pub status: CampaignStatus,
    pub budget: Decimal,
    pub spend: Decimal,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: u64,
    pub client_id: u64,
    pub body: String,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    /// Kanban column order.
    pub const WORKFLOW: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
    ];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub client_id: Option<u64>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_open(&self) -> bool {
        self.status != TaskStatus::Done
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_open() && self.due_date.is_some_and(|due| due < today)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Client,
    Billing,
    Payment,
    Campaign,
    Note,
    Task,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: u64,
    pub at: DateTime<Utc>,
    pub client_id: Option<u64>,
    pub kind: ActivityKind,
    pub action: String,
    pub summary: String,
    pub actor: Option<String>,
}

// Request payloads. The same shape serves create and partial update; create
// handlers enforce the required fields.

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ClientInput {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Option<ClientStatus>,
    pub monthly_rate: Option<Decimal>,
    pub billing_day: Option<u8>,
    pub billing_start: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ClientQuery {
    pub search: Option<String>,
    pub status: Option<ClientStatus>,
}

#[derive(Debug, Deserialize, Default)]
pub struct GenerateRequest {
    pub month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub paid_on: Option<NaiveDate>,
    pub method: Option<String>,
    pub reference: Option<String>,
    pub billing_ids: Option<Vec<u64>>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PayRecordRequest {
    pub amount: Option<Decimal>,
    pub paid_on: Option<NaiveDate>,
    pub method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkPayRequest {
    pub billing_ids: Vec<u64>,
    pub paid_on: Option<NaiveDate>,
    pub method: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct BillingPatch {
    pub amount_due: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct BillingQuery {
    pub client_id: Option<u64>,
    pub month: Option<String>,
    pub status: Option<BillingStatus>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PaymentQuery {
    pub client_id: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct MonthQuery {
    pub month: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CampaignInput {
    pub client_id: Option<u64>,
    pub name: Option<String>,
    pub platform: Option<Platform>,
    pub status: Option<CampaignStatus>,
    pub budget: Option<Decimal>,
    pub spend: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub impressions: Option<u64>,
    pub clicks: Option<u64>,
    pub conversions: Option<u64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CampaignQuery {
    pub client_id: Option<u64>,
    pub status: Option<CampaignStatus>,
}

#[derive(Debug, Deserialize, Default)]
pub struct NoteInput {
    pub body: Option<String>,
    pub pinned: Option<bool>,
}

/// Task fields for create and update. `client_id` and `due_date` tell an
/// absent key (`None`) apart from an explicit `null` (`Some(None)`), which
/// clears the field.
#[derive(Debug, Deserialize, Default)]
pub struct TaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub client_id: Option<Option<u64>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assignee: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<NaiveDate>>,
    pub position: Option<i64>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct MoveTaskRequest {
    pub status: TaskStatus,
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskSort {
    #[default]
    Due,
    Priority,
    Created,
    Title,
}

#[derive(Debug, Deserialize, Default)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub client_id: Option<u64>,
    pub assignee: Option<String>,
    pub search: Option<String>,
    pub due_before: Option<NaiveDate>,
    pub due_after: Option<NaiveDate>,
    pub overdue: Option<bool>,
    pub sort: Option<TaskSort>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ReportQuery {
    pub weeks: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ActivityQuery {
    pub client_id: Option<u64>,
    pub kind: Option<ActivityKind>,
    pub limit: Option<usize>,
}
