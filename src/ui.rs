use crate::billing::InvoiceDocument;
use crate::models::BillingStatus;

pub fn render_index(company_name: &str) -> String {
    fill(INDEX_HTML, &[("COMPANY", &escape(company_name))])
}

pub fn render_invoice(invoice: &InvoiceDocument) -> String {
    let mut bill_to = format!("<strong>{}</strong>", escape(&invoice.bill_to.name));
    for line in [
        &invoice.bill_to.company,
        &invoice.bill_to.address,
        &invoice.bill_to.email,
    ]
    .into_iter()
    .flatten()
    {
        bill_to.push_str(&format!("<br />{}", escape(line)));
    }

    let mut lines = String::new();
    for line in &invoice.lines {
        lines.push_str(&format!(
            "<tr><td>{}</td><td class=\"num\">{}</td></tr>",
            escape(&line.description),
            line.amount
        ));
    }

    let mut payments = String::new();
    for payment in &invoice.payments {
        payments.push_str(&format!(
            "<tr><td>Payment #{} on {}{}</td><td class=\"num\">-{}</td></tr>",
            payment.payment_id,
            payment.paid_on,
            payment
                .method
                .as_deref()
                .map(|method| format!(" ({})", escape(method)))
                .unwrap_or_default(),
            payment.amount
        ));
    }

    let status = match invoice.status {
        BillingStatus::Unpaid => "Unpaid",
        BillingStatus::Partial => "Partially paid",
        BillingStatus::Paid => "Paid",
    };

    fill(
        INVOICE_HTML,
        &[
            ("COMPANY", &escape(&invoice.company)),
            ("NUMBER", &escape(&invoice.invoice_number)),
            ("ISSUED", &invoice.issued_on.to_string()),
            ("DUE", &invoice.due_date.to_string()),
            ("STATUS", status),
            ("BILL_TO", &bill_to),
            ("LINES", &lines),
            ("PAYMENTS", &payments),
            ("AMOUNT_DUE", &invoice.amount_due.to_string()),
            ("AMOUNT_PAID", &invoice.amount_paid.to_string()),
            ("BALANCE", &invoice.balance.to_string()),
        ],
    )
}

/// Replaces `{{KEY}}` placeholders in one pass over the template, so
/// substituted values are never scanned for placeholders themselves.
/// Unknown keys are left as they are.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let value = after.find("}}").and_then(|end| {
            let key = &after[..end];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, end))
        });
        match value {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const INVOICE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <title>{{NUMBER}} | {{COMPANY}}</title>
  <style>
    body {
      margin: 0;
      padding: 48px 24px;
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      color: #2b2a28;
      background: #f8f3e6;
    }

    .sheet {
      width: min(760px, 100%);
      margin: 0 auto;
      background: white;
      border-radius: 18px;
      padding: 40px;
      box-shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    header {
      display: flex;
      justify-content: space-between;
      gap: 24px;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      margin: 0 0 6px;
    }

    .meta {
      text-align: right;
      color: #5f5c57;
    }

    .label {
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #8b857d;
    }

    table {
      width: 100%;
      border-collapse: collapse;
      margin-top: 28px;
    }

    td, th {
      padding: 10px 0;
      border-bottom: 1px solid rgba(47, 72, 88, 0.12);
      text-align: left;
    }

    .num {
      text-align: right;
    }

    .totals td {
      border: none;
      padding: 4px 0;
    }

    .balance td {
      font-weight: 600;
      font-size: 1.2rem;
      color: #ff6b4a;
    }

    @media print {
      body {
        background: white;
        padding: 0;
      }
      .sheet {
        box-shadow: none;
      }
    }
  </style>
</head>
<body>
  <main class="sheet">
    <header>
      <div>
        <h1>{{COMPANY}}</h1>
        <span class="label">Bill to</span>
        <p>{{BILL_TO}}</p>
      </div>
      <div class="meta">
        <h2>{{NUMBER}}</h2>
        <div>Issued {{ISSUED}}</div>
        <div>Due {{DUE}}</div>
        <div>{{STATUS}}</div>
      </div>
    </header>

    <table>
      <thead>
        <tr><th>Description</th><th class="num">Amount</th></tr>
      </thead>
      <tbody>
        {{LINES}}
        {{PAYMENTS}}
      </tbody>
    </table>

    <table class="totals">
      <tr><td>Amount due</td><td class="num">{{AMOUNT_DUE}}</td></tr>
      <tr><td>Paid</td><td class="num">{{AMOUNT_PAID}}</td></tr>
      <tr class="balance"><td>Balance</td><td class="num">{{BALANCE}}</td></tr>
    </table>
  </main>
</body>
</html>
"#;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{COMPANY}}</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #f8f3e6;
      --bg-2: #f5d3a7;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #ffe9d4 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(1100px, 100%);
      margin: 0 auto;
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 28px;
      animation: rise 600ms ease;
    }

    header {
      display: flex;
      flex-wrap: wrap;
      justify-content: space-between;
      align-items: center;
      gap: 16px;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      font-size: clamp(1.8rem, 4vw, 2.4rem);
      margin: 0;
    }

    h2 {
      margin: 0 0 12px;
      font-size: 1.3rem;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(170px, 1fr));
      gap: 16px;
    }

    .stat {
      background: white;
      border-radius: 18px;
      padding: 18px;
      border: 1px solid rgba(47, 72, 88, 0.08);
      display: grid;
      gap: 8px;
    }

    .stat .label {
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #8b857d;
    }

    .stat .value {
      font-size: 1.5rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    .stat .value.alert {
      color: var(--accent);
    }

    .tabs {
      display: flex;
      gap: 6px;
      padding: 6px;
      background: rgba(47, 72, 88, 0.08);
      border-radius: 999px;
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 10px 16px;
      font-size: 0.95rem;
      font-weight: 600;
      cursor: pointer;
      background: var(--accent-2);
      color: white;
      transition: transform 150ms ease;
    }

    button:active {
      transform: scale(0.98);
    }

    .tab {
      background: transparent;
      color: #6b645d;
    }

    .tab.active {
      background: white;
      color: var(--accent-2);
      box-shadow: 0 8px 16px rgba(47, 72, 88, 0.12);
    }

    .btn-pay {
      background: var(--accent);
      padding: 6px 12px;
      font-size: 0.85rem;
    }

    input, select {
      border: 1px solid rgba(47, 72, 88, 0.2);
      border-radius: 12px;
      padding: 10px 12px;
      font: inherit;
    }

    form.inline {
      display: flex;
      flex-wrap: wrap;
      gap: 10px;
      margin-bottom: 16px;
    }

    table {
      width: 100%;
      border-collapse: collapse;
      background: white;
      border-radius: 18px;
      overflow: hidden;
    }

    th, td {
      padding: 10px 12px;
      text-align: left;
      border-bottom: 1px solid rgba(47, 72, 88, 0.08);
    }

    th {
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.1em;
      color: #8b857d;
    }

    .kanban {
      display: grid;
      grid-template-columns: repeat(4, minmax(0, 1fr));
      gap: 14px;
    }

    .column {
      background: rgba(47, 72, 88, 0.06);
      border-radius: 18px;
      padding: 12px;
      min-height: 160px;
    }

    .card {
      background: white;
      border-radius: 12px;
      padding: 10px;
      margin-top: 8px;
      cursor: grab;
      border-left: 4px solid var(--accent-2);
    }

    .card.urgent, .card.high {
      border-left-color: var(--accent);
    }

    .calendar {
      display: grid;
      grid-template-columns: repeat(7, minmax(0, 1fr));
      gap: 6px;
      margin-top: 16px;
    }

    .day {
      background: white;
      border-radius: 10px;
      padding: 6px 8px;
      min-height: 72px;
      font-size: 0.85rem;
    }

    .day .num {
      color: #8b857d;
    }

    .day.today {
      outline: 2px solid var(--accent);
    }

    .detail {
      display: grid;
      gap: 16px;
      margin-top: 20px;
      padding: 20px;
      border-radius: 18px;
      background: rgba(47, 72, 88, 0.05);
    }

    .note {
      background: white;
      border-radius: 12px;
      padding: 10px 12px;
      margin-bottom: 8px;
    }

    .note.pinned {
      border-left: 4px solid var(--accent);
    }

    .muted {
      color: #8b857d;
      font-size: 0.85rem;
    }

    tr[data-client] {
      cursor: pointer;
    }

    .hidden {
      display: none;
    }

    .status {
      font-size: 0.95rem;
      color: #6b645d;
      min-height: 1.2em;
    }

    .status[data-type="error"] {
      color: #c63b2b;
    }

    .status[data-type="ok"] {
      color: #2d7a4b;
    }

    @keyframes rise {
      from {
        opacity: 0;
        transform: translateY(18px);
      }
      to {
        opacity: 1;
        transform: translateY(0);
      }
    }

    @media (max-width: 760px) {
      .app {
        padding: 24px 18px;
      }
      .kanban {
        grid-template-columns: 1fr;
      }
      .calendar {
        grid-template-columns: repeat(2, minmax(0, 1fr));
      }
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>{{COMPANY}}</h1>
      <div class="tabs hidden" id="nav" role="tablist">
        <button class="tab active" type="button" data-view="dashboard">Dashboard</button>
        <button class="tab" type="button" data-view="clients">Clients</button>
        <button class="tab" type="button" data-view="billing">Billing</button>
        <button class="tab" type="button" data-view="tasks">Tasks</button>
        <button class="tab" type="button" data-view="campaigns">Campaigns</button>
        <button class="tab" type="button" data-view="activity">Activity</button>
        <button class="tab" type="button" id="logout">Sign out</button>
      </div>
    </header>

    <section id="login-view">
      <form id="login-form" class="inline">
        <input name="username" placeholder="Username" autocomplete="username" required />
        <input name="password" type="password" placeholder="Password" autocomplete="current-password" required />
        <button type="submit">Sign in</button>
      </form>
    </section>

    <section id="dashboard-view" class="view hidden">
      <div class="panel" id="dashboard"></div>
    </section>

    <section id="clients-view" class="view hidden">
      <form id="client-form" class="inline">
        <input name="name" placeholder="Client name" required />
        <input name="company" placeholder="Company" />
        <input name="email" placeholder="Email" />
        <input name="monthly_rate" placeholder="Monthly rate" inputmode="decimal" />
        <button type="submit">Add client</button>
      </form>
      <form id="client-search" class="inline">
        <input name="search" placeholder="Search clients" />
        <select name="status">
          <option value="">Any status</option>
          <option value="active">Active</option>
          <option value="lead">Lead</option>
          <option value="inactive">Inactive</option>
        </select>
        <button type="submit">Search</button>
      </form>
      <table>
        <thead><tr><th>Name</th><th>Company</th><th>Status</th><th>Rate</th><th>Billing day</th><th>Credit</th></tr></thead>
        <tbody id="client-rows"></tbody>
      </table>
      <div class="detail hidden" id="client-detail">
        <header>
          <h2 id="detail-name"></h2>
          <button type="button" class="btn-pay" id="delete-client">Delete client</button>
        </header>
        <div class="panel" id="detail-balance"></div>
        <div class="panel" id="detail-campaigns"></div>
        <form id="payment-form" class="inline">
          <input name="amount" placeholder="Payment amount" inputmode="decimal" required />
          <input name="paid_on" type="date" />
          <input name="method" placeholder="Method" />
          <input name="reference" placeholder="Reference" />
          <button type="submit">Record payment</button>
        </form>
        <table>
          <thead><tr><th>Paid on</th><th>Amount</th><th>Applied to</th><th>Credited</th><th>Method</th><th></th></tr></thead>
          <tbody id="payment-rows"></tbody>
        </table>
        <h2>Notes</h2>
        <form id="note-form" class="inline">
          <input name="body" placeholder="Add a note" required />
          <label class="muted"><input type="checkbox" name="pinned" value="true" /> Pinned</label>
          <button type="submit">Save note</button>
        </form>
        <div id="notes"></div>
        <h2>History</h2>
        <table>
          <tbody id="client-history"></tbody>
        </table>
      </div>
    </section>

    <section id="billing-view" class="view hidden">
      <form id="generate-form" class="inline">
        <input name="month" placeholder="YYYY-MM" />
        <button type="submit">Generate invoices</button>
        <button type="button" id="bulk-pay">Mark selected paid</button>
      </form>
      <div class="panel" id="aging"></div>
      <table>
        <thead><tr><th></th><th>Invoice</th><th>Client</th><th>Month</th><th>Due</th><th>Paid</th><th>Status</th><th></th></tr></thead>
        <tbody id="billing-rows"></tbody>
      </table>
    </section>

    <section id="tasks-view" class="view hidden">
      <form id="task-form" class="inline">
        <input name="title" placeholder="New task" required />
        <select name="priority">
          <option value="low">Low</option>
          <option value="medium" selected>Medium</option>
          <option value="high">High</option>
          <option value="urgent">Urgent</option>
        </select>
        <input name="due_date" type="date" />
        <button type="submit">Add task</button>
      </form>
      <div class="kanban" id="kanban"></div>
      <div class="panel" id="task-report"></div>
      <h2>Task list</h2>
      <form id="task-filter" class="inline">
        <input name="search" placeholder="Search tasks" />
        <select name="status">
          <option value="">Any status</option>
          <option value="todo">To do</option>
          <option value="in_progress">In progress</option>
          <option value="review">Review</option>
          <option value="done">Done</option>
        </select>
        <select name="priority">
          <option value="">Any priority</option>
          <option value="low">Low</option>
          <option value="medium">Medium</option>
          <option value="high">High</option>
          <option value="urgent">Urgent</option>
        </select>
        <input name="assignee" placeholder="Assignee" />
        <select name="sort">
          <option value="due">By due date</option>
          <option value="priority">By priority</option>
          <option value="created">Newest first</option>
          <option value="title">By title</option>
        </select>
        <label class="muted"><input type="checkbox" name="overdue" value="true" /> Overdue only</label>
        <button type="submit">Filter</button>
      </form>
      <table>
        <thead><tr><th>Title</th><th>Client</th><th>Status</th><th>Priority</th><th>Assignee</th><th>Due</th></tr></thead>
        <tbody id="task-rows"></tbody>
      </table>
      <h2>Calendar</h2>
      <form id="calendar-form" class="inline">
        <input name="month" type="month" />
        <button type="submit">Show month</button>
      </form>
      <div class="muted" id="calendar-summary"></div>
      <div class="calendar" id="calendar"></div>
    </section>

    <section id="campaigns-view" class="view hidden">
      <form id="campaign-form" class="inline">
        <select name="client_id" id="campaign-client" required></select>
        <input name="name" placeholder="Campaign name" required />
        <select name="platform">
          <option value="google">Google</option>
          <option value="facebook">Facebook</option>
          <option value="instagram">Instagram</option>
          <option value="linkedin">LinkedIn</option>
          <option value="tiktok">TikTok</option>
          <option value="other">Other</option>
        </select>
        <select name="status">
          <option value="planned">Planned</option>
          <option value="active">Active</option>
          <option value="paused">Paused</option>
          <option value="completed">Completed</option>
        </select>
        <input name="budget" placeholder="Budget" inputmode="decimal" />
        <input name="spend" placeholder="Spend" inputmode="decimal" />
        <input name="impressions" placeholder="Impressions" inputmode="numeric" />
        <input name="clicks" placeholder="Clicks" inputmode="numeric" />
        <input name="conversions" placeholder="Conversions" inputmode="numeric" />
        <button type="submit">Add campaign</button>
      </form>
      <table>
        <thead><tr><th>Campaign</th><th>Client</th><th>Platform</th><th>Status</th><th>Budget</th><th>Spend</th><th>CTR</th><th>CPC</th><th>CPA</th><th>Budget used</th></tr></thead>
        <tbody id="campaign-rows"></tbody>
      </table>
    </section>

    <section id="activity-view" class="view hidden">
      <form id="activity-filter" class="inline">
        <select name="kind">
          <option value="">Everything</option>
          <option value="client">Clients</option>
          <option value="billing">Billing</option>
          <option value="payment">Payments</option>
          <option value="campaign">Campaigns</option>
          <option value="note">Notes</option>
          <option value="task">Tasks</option>
          <option value="user">Users</option>
        </select>
        <button type="submit">Filter</button>
      </form>
      <table>
        <thead><tr><th>When</th><th>Kind</th><th>What</th><th>By</th></tr></thead>
        <tbody id="activity-rows"></tbody>
      </table>
    </section>

    <div class="status" id="status"></div>
  </main>

  <script>
    const statusEl = document.getElementById('status');
    const nav = document.getElementById('nav');
    const views = Array.from(document.querySelectorAll('.view'));
    const tabs = Array.from(document.querySelectorAll('.tab[data-view]'));
    const clientNames = new Map();

    const setStatus = (message, type) => {
      statusEl.textContent = message;
      statusEl.dataset.type = type || '';
    };

    const esc = (value) => String(value ?? '').replace(/[&<>"']/g, (ch) => ({
      '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;'
    })[ch]);

    const api = async (path, options = {}) => {
      const res = await fetch(path, {
        credentials: 'same-origin',
        headers: { 'content-type': 'application/json' },
        ...options
      });
      if (res.status === 401) {
        showLogin();
        throw new Error('Please sign in');
      }
      if (!res.ok) {
        const msg = await res.text();
        throw new Error(msg || 'Request failed');
      }
      return res.status === 204 ? null : res.json();
    };

    const formJson = (form) => {
      const body = {};
      new FormData(form).forEach((value, key) => {
        if (value !== '') {
          body[key] = value;
        }
      });
      return body;
    };

    const query = (form) => {
      const params = new URLSearchParams(formJson(form)).toString();
      return params ? `?${params}` : '';
    };

    const numbers = (body, keys) => {
      keys.forEach((key) => {
        if (body[key] !== undefined) {
          body[key] = Number(body[key]);
        }
      });
      return body;
    };

    const pct = (value) => (value === null || value === undefined ? '-' : `${value}%`);
    const when = (value) => new Date(value).toLocaleString();
    const clientName = (id) => (id ? clientNames.get(id) || `#${id}` : '');

    const historyRows = (entries) => entries.map((entry) => `
      <tr>
        <td class="muted">${esc(when(entry.at))}</td>
        <td>${esc(entry.kind)}</td>
        <td>${esc(entry.summary)}</td>
        <td>${esc(entry.actor)}</td>
      </tr>`).join('');

    const stat = (label, value, alert) =>
      `<div class="stat"><span class="label">${esc(label)}</span><span class="value${alert ? ' alert' : ''}">${esc(value)}</span></div>`;

    const showLogin = () => {
      document.getElementById('login-view').classList.remove('hidden');
      nav.classList.add('hidden');
      views.forEach((view) => view.classList.add('hidden'));
    };

    const loadDashboard = async () => {
      const data = await api('/api/dashboard');
      document.getElementById('dashboard').innerHTML = [
        stat('Active clients', data.active_clients),
        stat('Leads', data.leads),
        stat('Outstanding', data.outstanding),
        stat('Overdue', data.overdue, Number(data.overdue) > 0),
        stat(`Billed ${data.month}`, data.billed_this_month),
        stat(`Collected ${data.month}`, data.collected_this_month),
        stat('Open tasks', data.open_tasks),
        stat('Overdue tasks', data.overdue_tasks, data.overdue_tasks > 0),
        stat('Active campaigns', data.active_campaigns)
      ].join('');
    };

    const loadClients = async (params = '') => {
      const clients = await api(`/api/clients${params}`);
      clients.forEach((client) => clientNames.set(client.id, client.name));
      document.getElementById('client-rows').innerHTML = clients.map((client) => `
        <tr data-client="${client.id}">
          <td>${esc(client.name)}</td>
          <td>${esc(client.company)}</td>
          <td>${esc(client.status)}</td>
          <td>${esc(client.monthly_rate)}</td>
          <td>${esc(client.billing_day)}</td>
          <td>${esc(client.credit_balance)}</td>
        </tr>`).join('');
    };

    const loadBilling = async () => {
      if (!clientNames.size) {
        await loadClients();
      }
      const [records, aging] = await Promise.all([api('/api/billing'), api('/api/billing/aging')]);
      const buckets = aging.totals;
      document.getElementById('aging').innerHTML = [
        stat('Current', buckets.current),
        stat('1-30 days', buckets.days_1_30),
        stat('31-60 days', buckets.days_31_60),
        stat('61-90 days', buckets.days_61_90),
        stat('90+ days', buckets.days_over_90, Number(buckets.days_over_90) > 0)
      ].join('');
      document.getElementById('billing-rows').innerHTML = records.map((record) => `
        <tr>
          <td>${record.status === 'paid' ? '' : `<input type="checkbox" class="bulk" value="${record.id}" />`}</td>
          <td><a href="/invoices/${record.id}" target="_blank">${esc(record.invoice_number)}</a></td>
          <td>${esc(clientNames.get(record.client_id) || record.client_id)}</td>
          <td>${esc(record.month)}</td>
          <td>${esc(record.amount_due)}</td>
          <td>${esc(record.amount_paid)}</td>
          <td>${esc(record.status)}</td>
          <td>${record.status === 'paid' ? '' : `<button class="btn-pay" data-pay="${record.id}">Pay</button>`}</td>
        </tr>`).join('');
    };

    const loadTasks = async () => {
      const [columns, report] = await Promise.all([api('/api/tasks/kanban'), api('/api/tasks/reports')]);
      document.getElementById('kanban').innerHTML = columns.map((column) => `
        <div class="column" data-status="${column.status}">
          <strong>${esc(column.status.replace('_', ' '))}</strong> (${column.count})
          ${column.tasks.map((task) => `
            <div class="card ${task.priority}" draggable="true" data-task="${task.id}">
              ${esc(task.title)}<br /><small>${esc(task.due_date || 'no due date')}</small>
            </div>`).join('')}
        </div>`).join('');
      const rate = report.completion.overall;
      document.getElementById('task-report').innerHTML = [
        stat('Open tasks', report.aging.open),
        stat('Overdue', report.aging.overdue, report.aging.overdue > 0),
        stat('Completion rate', `${rate.rate}%`),
        stat('On time', `${report.completion.on_time.rate}%`)
      ].join('');
    };

    let selectedClient = null;

    const loadClientDetail = async (id) => {
      selectedClient = id;
      const [client, payments, notes, history, campaigns] = await Promise.all([
        api(`/api/clients/${id}`),
        api(`/api/clients/${id}/payments`),
        api(`/api/clients/${id}/notes`),
        api(`/api/clients/${id}/activity`),
        api(`/api/clients/${id}/campaigns/summary`)
      ]);
      const balance = client.balance;
      document.getElementById('client-detail').classList.remove('hidden');
      document.getElementById('detail-name').textContent = client.company ? `${client.name} (${client.company})` : client.name;
      document.getElementById('detail-balance').innerHTML = [
        stat('Billed', balance.billed),
        stat('Paid', balance.paid),
        stat('Outstanding', balance.outstanding, Number(balance.outstanding) > 0),
        stat('Credit', balance.credit),
        stat('Unpaid months', balance.unpaid_months.join(', ') || 'none'),
        stat('Overdue months', balance.overdue_months.join(', ') || 'none', balance.overdue_months.length > 0)
      ].join('');
      document.getElementById('detail-campaigns').innerHTML = [
        stat('Campaigns', `${campaigns.active} active / ${campaigns.campaigns}`),
        stat('Ad spend', campaigns.spend),
        stat('CTR', pct(campaigns.metrics.ctr)),
        stat('Cost per conversion', campaigns.metrics.cpa ?? '-')
      ].join('');
      document.getElementById('payment-rows').innerHTML = payments.map((payment) => `
        <tr>
          <td>${esc(payment.paid_on)}</td>
          <td>${esc(payment.amount)}</td>
          <td>${esc(payment.allocations.map((a) => `${a.month}: ${a.amount}`).join(', '))}</td>
          <td>${esc(payment.credited)}</td>
          <td>${esc(payment.method)}</td>
          <td><button class="btn-pay" data-reverse="${payment.id}">Reverse</button></td>
        </tr>`).join('');
      document.getElementById('notes').innerHTML = notes.map((note) => `
        <div class="note${note.pinned ? ' pinned' : ''}">
          ${esc(note.body)}<br />
          <span class="muted">${esc(when(note.created_at))}</span>
          <button class="tab" data-pin="${note.id}" data-pinned="${note.pinned}">${note.pinned ? 'Unpin' : 'Pin'}</button>
          <button class="tab" data-note="${note.id}">Delete</button>
        </div>`).join('') || '<p class="muted">No notes yet.</p>';
      document.getElementById('client-history').innerHTML = historyRows(history);
    };

    const loadTaskList = async (params = '') => {
      if (!clientNames.size) {
        await loadClients();
      }
      const tasks = await api(`/api/tasks${params}`);
      document.getElementById('task-rows').innerHTML = tasks.map((task) => `
        <tr>
          <td>${esc(task.title)}</td>
          <td>${esc(clientName(task.client_id))}</td>
          <td>${esc(task.status.replace('_', ' '))}</td>
          <td>${esc(task.priority)}</td>
          <td>${esc(task.assignee)}</td>
          <td>${esc(task.due_date || '-')}</td>
        </tr>`).join('');
    };

    const loadCalendar = async (month = '') => {
      const data = await api(`/api/tasks/calendar${month ? `?month=${encodeURIComponent(month)}` : ''}`);
      const today = new Date().toISOString().slice(0, 10);
      const first = new Date(`${data.days[0].date}T00:00:00`);
      const lead = (first.getDay() + 6) % 7;
      const blanks = Array.from({ length: lead }, () => '<div></div>').join('');
      document.getElementById('calendar-summary').textContent =
        `${data.month}: ${data.overdue.length} overdue from earlier months, ${data.undated} without a due date`;
      document.getElementById('calendar').innerHTML = blanks + data.days.map((day) => `
        <div class="day${day.date === today ? ' today' : ''}">
          <span class="num">${Number(day.date.slice(8))}</span>
          ${day.tasks.map((task) => `<div class="card ${task.priority}">${esc(task.title)}</div>`).join('')}
        </div>`).join('');
    };

    const loadCampaigns = async () => {
      await loadClients();
      const campaigns = await api('/api/campaigns');
      document.getElementById('campaign-client').innerHTML = Array.from(clientNames.entries())
        .map(([id, name]) => `<option value="${id}">${esc(name)}</option>`)
        .join('');
      document.getElementById('campaign-rows').innerHTML = campaigns.map((campaign) => `
        <tr>
          <td>${esc(campaign.name)}</td>
          <td>${esc(clientName(campaign.client_id))}</td>
          <td>${esc(campaign.platform)}</td>
          <td>${esc(campaign.status)}</td>
          <td>${esc(campaign.budget)}</td>
          <td>${esc(campaign.spend)}</td>
          <td>${esc(pct(campaign.metrics.ctr))}</td>
          <td>${esc(campaign.metrics.cpc ?? '-')}</td>
          <td>${esc(campaign.metrics.cpa ?? '-')}</td>
          <td>${esc(pct(campaign.metrics.budget_used_pct))}</td>
        </tr>`).join('');
    };

    const loadActivity = async (params = '') => {
      const entries = await api(`/api/activity${params}`);
      document.getElementById('activity-rows').innerHTML = historyRows(entries);
    };

    const loaders = {
      dashboard: loadDashboard,
      clients: () => loadClients(),
      billing: loadBilling,
      tasks: () => Promise.all([loadTasks(), loadTaskList(), loadCalendar()]),
      campaigns: loadCampaigns,
      activity: () => loadActivity()
    };

    const showView = (name) => {
      tabs.forEach((tab) => tab.classList.toggle('active', tab.dataset.view === name));
      views.forEach((view) => view.classList.toggle('hidden', view.id !== `${name}-view`));
      loaders[name]().catch((err) => setStatus(err.message, 'error'));
    };

    const showApp = () => {
      document.getElementById('login-view').classList.add('hidden');
      nav.classList.remove('hidden');
      showView('dashboard');
    };

    tabs.forEach((tab) => tab.addEventListener('click', () => showView(tab.dataset.view)));

    document.getElementById('login-form').addEventListener('submit', (event) => {
      event.preventDefault();
      api('/api/auth/login', { method: 'POST', body: JSON.stringify(formJson(event.target)) })
        .then(() => {
          setStatus('', '');
          showApp();
        })
        .catch((err) => setStatus(err.message, 'error'));
    });

    document.getElementById('logout').addEventListener('click', () => {
      api('/api/auth/logout', { method: 'POST' }).then(showLogin).catch(showLogin);
    });

    document.getElementById('client-form').addEventListener('submit', (event) => {
      event.preventDefault();
      api('/api/clients', { method: 'POST', body: JSON.stringify(formJson(event.target)) })
        .then(() => {
          event.target.reset();
          setStatus('Client saved', 'ok');
          return loadClients();
        })
        .catch((err) => setStatus(err.message, 'error'));
    });

    document.getElementById('client-search').addEventListener('submit', (event) => {
      event.preventDefault();
      loadClients(query(event.target)).catch((err) => setStatus(err.message, 'error'));
    });

    document.getElementById('generate-form').addEventListener('submit', (event) => {
      event.preventDefault();
      api('/api/billing/generate', { method: 'POST', body: JSON.stringify(formJson(event.target)) })
        .then((result) => {
          setStatus(`Created ${result.created.length} invoices for ${result.month}`, 'ok');
          return loadBilling();
        })
        .catch((err) => setStatus(err.message, 'error'));
    });

    document.getElementById('bulk-pay').addEventListener('click', () => {
      const ids = Array.from(document.querySelectorAll('.bulk:checked')).map((box) => Number(box.value));
      if (!ids.length) {
        setStatus('Select at least one invoice', 'error');
        return;
      }
      api('/api/billing/bulk-pay', { method: 'POST', body: JSON.stringify({ billing_ids: ids }) })
        .then(() => {
          setStatus('Payments recorded', 'ok');
          return loadBilling();
        })
        .catch((err) => setStatus(err.message, 'error'));
    });

    document.getElementById('billing-rows').addEventListener('click', (event) => {
      const id = event.target.dataset.pay;
      if (!id) {
        return;
      }
      const amount = prompt('Amount (leave empty to pay in full)');
      if (amount === null) {
        return;
      }
      const body = amount.trim() ? { amount: amount.trim() } : {};
      api(`/api/billing/${id}/pay`, { method: 'POST', body: JSON.stringify(body) })
        .then(() => {
          setStatus('Payment recorded', 'ok');
          return loadBilling();
        })
        .catch((err) => setStatus(err.message, 'error'));
    });

    document.getElementById('task-form').addEventListener('submit', (event) => {
      event.preventDefault();
      api('/api/tasks', { method: 'POST', body: JSON.stringify(formJson(event.target)) })
        .then(() => {
          event.target.reset();
          return Promise.all([loadTasks(), loadTaskList(), loadCalendar()]);
        })
        .catch((err) => setStatus(err.message, 'error'));
    });

    const kanbanEl = document.getElementById('kanban');
    kanbanEl.addEventListener('dragstart', (event) => {
      event.dataTransfer.setData('text/plain', event.target.dataset.task);
    });
    kanbanEl.addEventListener('dragover', (event) => event.preventDefault());
    kanbanEl.addEventListener('drop', (event) => {
      event.preventDefault();
      const column = event.target.closest('.column');
      const id = event.dataTransfer.getData('text/plain');
      if (!column || !id) {
        return;
      }
      api(`/api/tasks/${id}/move`, { method: 'PATCH', body: JSON.stringify({ status: column.dataset.status }) })
        .then(loadTasks)
        .catch((err) => setStatus(err.message, 'error'));
    });

    const fail = (err) => setStatus(err.message, 'error');

    document.getElementById('client-rows').addEventListener('click', (event) => {
      const row = event.target.closest('tr[data-client]');
      if (row) {
        loadClientDetail(Number(row.dataset.client)).catch(fail);
      }
    });

    document.getElementById('delete-client').addEventListener('click', () => {
      if (!selectedClient || !confirm('Delete this client with its invoices, payments, campaigns and notes?')) {
        return;
      }
      api(`/api/clients/${selectedClient}`, { method: 'DELETE' })
        .then(() => {
          clientNames.delete(selectedClient);
          selectedClient = null;
          document.getElementById('client-detail').classList.add('hidden');
          setStatus('Client deleted', 'ok');
          return loadClients();
        })
        .catch(fail);
    });

    document.getElementById('payment-form').addEventListener('submit', (event) => {
      event.preventDefault();
      api(`/api/clients/${selectedClient}/payments`, { method: 'POST', body: JSON.stringify(formJson(event.target)) })
        .then((payment) => {
          event.target.reset();
          setStatus(`Payment recorded, ${payment.credited} credited`, 'ok');
          return loadClientDetail(selectedClient);
        })
        .catch(fail);
    });

    document.getElementById('payment-rows').addEventListener('click', (event) => {
      const id = event.target.dataset.reverse;
      if (!id || !confirm('Reverse this payment?')) {
        return;
      }
      api(`/api/payments/${id}`, { method: 'DELETE' })
        .then(() => {
          setStatus('Payment reversed', 'ok');
          return loadClientDetail(selectedClient);
        })
        .catch(fail);
    });

    document.getElementById('note-form').addEventListener('submit', (event) => {
      event.preventDefault();
      const body = formJson(event.target);
      body.pinned = body.pinned === 'true';
      api(`/api/clients/${selectedClient}/notes`, { method: 'POST', body: JSON.stringify(body) })
        .then(() => {
          event.target.reset();
          return loadClientDetail(selectedClient);
        })
        .catch(fail);
    });

    document.getElementById('notes').addEventListener('click', (event) => {
      const { note, pin, pinned } = event.target.dataset;
      let request = null;
      if (note) {
        request = api(`/api/notes/${note}`, { method: 'DELETE' });
      } else if (pin) {
        request = api(`/api/notes/${pin}`, { method: 'PATCH', body: JSON.stringify({ pinned: pinned !== 'true' }) });
      }
      if (request) {
        request.then(() => loadClientDetail(selectedClient)).catch(fail);
      }
    });

    document.getElementById('task-filter').addEventListener('submit', (event) => {
      event.preventDefault();
      loadTaskList(query(event.target)).catch(fail);
    });

    document.getElementById('calendar-form').addEventListener('submit', (event) => {
      event.preventDefault();
      loadCalendar(formJson(event.target).month || '').catch(fail);
    });

    document.getElementById('campaign-form').addEventListener('submit', (event) => {
      event.preventDefault();
      const body = numbers(formJson(event.target), ['client_id', 'impressions', 'clicks', 'conversions']);
      api('/api/campaigns', { method: 'POST', body: JSON.stringify(body) })
        .then(() => {
          event.target.reset();
          setStatus('Campaign saved', 'ok');
          return loadCampaigns();
        })
        .catch(fail);
    });

    document.getElementById('activity-filter').addEventListener('submit', (event) => {
      event.preventDefault();
      loadActivity(query(event.target)).catch(fail);
    });

    api('/api/auth/me').then(showApp).catch(showLogin);
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{InvoiceLine, InvoiceParty};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[test]
    fn invoice_page_escapes_client_text() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let invoice = InvoiceDocument {
            billing_id: 1,
            invoice_number: "INV-202603-0001".into(),
            company: "Client Desk".into(),
            issued_on: date,
            due_date: date,
            month: "2026-03".into(),
            bill_to: InvoiceParty {
                name: "<script>alert(1)</script>".into(),
                company: Some("Smith & Sons".into()),
                email: None,
                address: None,
            },
            lines: vec![InvoiceLine {
                description: "Monthly services for March 2026".into(),
                amount: Decimal::new(50000, 2),
            }],
            amount_due: Decimal::new(50000, 2),
            amount_paid: Decimal::ZERO,
            balance: Decimal::new(50000, 2),
            status: BillingStatus::Unpaid,
            payments: Vec::new(),
        };

        let html = render_invoice(&invoice);
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Smith &amp; Sons"));
        assert!(html.contains("INV-202603-0001"));
        assert!(html.contains("500.00"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn placeholders_inside_values_are_not_expanded() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let invoice = InvoiceDocument {
            billing_id: 1,
            invoice_number: "INV-202603-0001".into(),
            company: "Client Desk".into(),
            issued_on: date,
            due_date: date,
            month: "2026-03".into(),
            bill_to: InvoiceParty {
                name: "{{LINES}}".into(),
                company: Some("{{BALANCE}}".into()),
                email: None,
                address: None,
            },
            lines: vec![InvoiceLine {
                description: "Monthly services for March 2026".into(),
                amount: Decimal::new(12000, 2),
            }],
            amount_due: Decimal::new(12000, 2),
            amount_paid: Decimal::ZERO,
            balance: Decimal::new(12000, 2),
            status: BillingStatus::Unpaid,
            payments: Vec::new(),
        };

        let html = render_invoice(&invoice);
        assert!(html.contains("<strong>{{LINES}}</strong><br />{{BALANCE}}"));
        assert_eq!(html.matches("Monthly services for March 2026").count(), 1);
        assert_eq!(render_index("{{COMPANY}}").matches("{{COMPANY}}").count(), 2);
    }

    #[test]
    fn fill_leaves_unknown_and_unclosed_placeholders() {
        assert_eq!(fill("a {{X}} b {{Y}} c {{", &[("X", "1")]), "a 1 b {{Y}} c {{");
        assert_eq!(fill("{{X}}{{X}}", &[("X", "{{X}}")]), "{{X}}{{X}}");
    }
}
