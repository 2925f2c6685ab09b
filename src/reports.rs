use crate::billing::{aging_report_at, month_key, sum_money};
use crate::models::{CampaignStatus, ClientStatus, Database, Priority, Task, TaskStatus};
use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_WEEKS: usize = 8;
pub const MAX_WEEKS: usize = 52;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct TaskAging {
    pub days_0_7: usize,
    pub days_8_14: usize,
    pub days_15_30: usize,
    pub days_over_30: usize,
    pub open: usize,
    pub overdue: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyProductivity {
    pub week: String,
    pub start_date: String,
    pub end_date: String,
    pub created: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Rate {
    pub total: usize,
    pub done: usize,
    pub rate: f64,
}

impl Rate {
    fn from_counts(total: usize, done: usize) -> Self {
        let rate = if total == 0 {
            0.0
        } else {
            (done as f64 / total as f64 * 10_000.0).round() / 100.0
        };
        Self { total, done, rate }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionReport {
    pub overall: Rate,
    pub by_priority: BTreeMap<String, Rate>,
    pub by_assignee: BTreeMap<String, Rate>,
    /// Completed tasks with a due date that finished on or before it.
    pub on_time: Rate,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub as_of: String,
    pub aging: TaskAging,
    pub productivity: Vec<WeeklyProductivity>,
    pub completion: CompletionReport,
}

pub fn task_report_at(db: &Database, today: NaiveDate, weeks: usize) -> TaskReport {
    let tasks: Vec<&Task> = db.tasks.values().collect();
    TaskReport {
        as_of: today.to_string(),
        aging: task_aging(&tasks, today),
        productivity: productivity(&tasks, today, weeks.clamp(1, MAX_WEEKS)),
        completion: completion(&tasks),
    }
}

pub fn task_aging(tasks: &[&Task], today: NaiveDate) -> TaskAging {
    let mut aging = TaskAging::default();
    for task in tasks.iter().filter(|task| task.is_open()) {
        aging.open += 1;
        if task.is_overdue(today) {
            aging.overdue += 1;
        }
        let age = (today - task.created_at.date_naive()).num_days();
        match age {
            i64::MIN..=7 => aging.days_0_7 += 1,
            8..=14 => aging.days_8_14 += 1,
            15..=30 => aging.days_15_30 += 1,
            _ => aging.days_over_30 += 1,
        }
    }
    aging
}

pub fn productivity(tasks: &[&Task], today: NaiveDate, weeks: usize) -> Vec<WeeklyProductivity> {
    let current_week_start = week_start(today);
    let mut series = Vec::with_capacity(weeks);

    for offset in (0..weeks).rev() {
        let start = current_week_start - Duration::weeks(offset as i64);
        let end = start + Duration::days(6);
        let in_week = |date: NaiveDate| date >= start && date <= end;

        series.push(WeeklyProductivity {
            week: week_label(start),
            start_date: start.to_string(),
            end_date: end.to_string(),
            created: tasks
                .iter()
                .filter(|task| in_week(task.created_at.date_naive()))
                .count(),
            completed: tasks
                .iter()
                .filter_map(|task| task.completed_at)
                .filter(|at| in_week(at.date_naive()))
                .count(),
        });
    }
    series
}

fn is_done(task: &Task) -> bool {
    task.status == TaskStatus::Done
}

pub fn completion(tasks: &[&Task]) -> CompletionReport {
    let by_priority = Priority::ALL
        .iter()
        .map(|priority| {
            let group: Vec<&&Task> = tasks.iter().filter(|t| t.priority == *priority).collect();
            let finished = group.iter().filter(|t| is_done(t)).count();
            (priority_label(*priority).to_string(), Rate::from_counts(group.len(), finished))
        })
        .collect();

    let mut assignee_counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for task in tasks {
        let key = task.assignee.clone().unwrap_or_else(|| "unassigned".to_string());
        let entry = assignee_counts.entry(key).or_default();
        entry.0 += 1;
        if is_done(task) {
            entry.1 += 1;
        }
    }
    let by_assignee = assignee_counts
        .into_iter()
        .map(|(name, (total, finished))| (name, Rate::from_counts(total, finished)))
        .collect();

    let dated_done: Vec<&&Task> = tasks
        .iter()
        .filter(|task| is_done(task) && task.due_date.is_some())
        .collect();
    let on_time = dated_done
        .iter()
        .filter(|task| match (task.completed_at, task.due_date) {
            (Some(at), Some(due)) => at.date_naive() <= due,
            _ => false,
        })
        .count();

    CompletionReport {
        overall: Rate::from_counts(tasks.len(), tasks.iter().filter(|t| is_done(t)).count()),
        by_priority,
        by_assignee,
        on_time: Rate::from_counts(dated_done.len(), on_time),
    }
}

fn priority_label(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
        Priority::Urgent => "urgent",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub as_of: String,
    pub active_clients: usize,
    pub leads: usize,
    pub outstanding: Decimal,
    pub overdue: Decimal,
    pub month: String,
    pub billed_this_month: Decimal,
    pub collected_this_month: Decimal,
    pub open_tasks: usize,
    pub overdue_tasks: usize,
    pub active_campaigns: usize,
}

pub fn dashboard_at(db: &Database, today: NaiveDate) -> Dashboard {
    let aging = aging_report_at(db, today);
    let month = month_key(today);
    let billed_this_month = sum_money(
        db.billing
            .values()
            .filter(|record| record.month == month)
            .map(|record| record.amount_due),
    );
    let collected_this_month = sum_money(
        db.payments
            .values()
            .filter(|payment| month_key(payment.paid_on) == month)
            .map(|payment| payment.amount),
    );

    Dashboard {
        as_of: today.to_string(),
        active_clients: db
            .clients
            .values()
            .filter(|client| client.status == ClientStatus::Active)
            .count(),
        leads: db
            .clients
            .values()
            .filter(|client| client.status == ClientStatus::Lead)
            .count(),
        outstanding: aging.total,
        overdue: aging.totals.past_due(),
        month,
        billed_this_month,
        collected_this_month,
        open_tasks: db.tasks.values().filter(|task| task.is_open()).count(),
        overdue_tasks: db.tasks.values().filter(|task| task.is_overdue(today)).count(),
        active_campaigns: db
            .campaigns
            .values()
            .filter(|campaign| campaign.status == CampaignStatus::Active)
            .count(),
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskInput;
    use crate::tasks::{create_task, move_task};
    use chrono::{DateTime, TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(day: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&day.and_hms_opt(10, 0, 0).unwrap())
    }

    fn add(db: &mut Database, created: NaiveDate, priority: Priority, due: Option<NaiveDate>) -> u64 {
        create_task(
            db,
            TaskInput {
                title: Some("task".into()),
                priority: Some(priority),
                due_date: due.map(Some),
                ..TaskInput::default()
            },
            at(created),
        )
        .unwrap()
        .id
    }

    #[test]
    fn aging_buckets_open_tasks_by_age() {
        let mut db = Database::default();
        let today = date(2026, 1, 31);
        add(&mut db, date(2026, 1, 30), Priority::Low, None);
        add(&mut db, date(2026, 1, 20), Priority::Low, Some(date(2026, 1, 25)));
        add(&mut db, date(2026, 1, 10), Priority::Low, None);
        add(&mut db, date(2025, 12, 1), Priority::Low, None);
        let done = add(&mut db, date(2025, 11, 1), Priority::Low, None);
        move_task(&mut db, done, TaskStatus::Done, None, at(today)).unwrap();

        let tasks: Vec<&Task> = db.tasks.values().collect();
        let aging = task_aging(&tasks, today);
        assert_eq!(
            aging,
            TaskAging {
                days_0_7: 1,
                days_8_14: 1,
                days_15_30: 1,
                days_over_30: 1,
                open: 4,
                overdue: 1,
            }
        );
    }

    #[test]
    fn productivity_counts_per_iso_week() {
        let mut db = Database::default();
        // 2026-01-05 is a Monday.
        let today = date(2026, 1, 14);
        let first = add(&mut db, date(2026, 1, 5), Priority::Low, None);
        add(&mut db, date(2026, 1, 6), Priority::Low, None);
        add(&mut db, date(2026, 1, 13), Priority::Low, None);
        move_task(&mut db, first, TaskStatus::Done, None, at(date(2026, 1, 12))).unwrap();

        let report = task_report_at(&db, today, 3);
        assert_eq!(report.productivity.len(), 3);
        let labels: Vec<&str> = report.productivity.iter().map(|w| w.week.as_str()).collect();
        assert_eq!(labels, vec!["2026-W01", "2026-W02", "2026-W03"]);
        assert_eq!(report.productivity[1].created, 2);
        assert_eq!(report.productivity[1].completed, 0);
        assert_eq!(report.productivity[2].created, 1);
        assert_eq!(report.productivity[2].completed, 1);
        assert_eq!(report.productivity[2].start_date, "2026-01-12");

        assert_eq!(task_report_at(&db, today, 0).productivity.len(), 1);
        assert_eq!(task_report_at(&db, today, 500).productivity.len(), MAX_WEEKS);
    }

    #[test]
    fn completion_rates_by_group_and_on_time() {
        let mut db = Database::default();
        let due = date(2026, 2, 10);
        let early = add(&mut db, date(2026, 2, 1), Priority::High, Some(due));
        let late = add(&mut db, date(2026, 2, 1), Priority::High, Some(due));
        add(&mut db, date(2026, 2, 1), Priority::Low, None);
        add(&mut db, date(2026, 2, 1), Priority::Low, None);
        db.tasks.get_mut(&early).unwrap().assignee = Some("Kai".into());
        move_task(&mut db, early, TaskStatus::Done, None, at(date(2026, 2, 9))).unwrap();
        move_task(&mut db, late, TaskStatus::Done, None, at(date(2026, 2, 12))).unwrap();

        let tasks: Vec<&Task> = db.tasks.values().collect();
        let report = completion(&tasks);
        assert_eq!(report.overall, Rate { total: 4, done: 2, rate: 50.0 });
        assert_eq!(report.by_priority["high"].rate, 100.0);
        assert_eq!(report.by_priority["low"].rate, 0.0);
        assert_eq!(report.by_priority["urgent"], Rate { total: 0, done: 0, rate: 0.0 });
        assert_eq!(report.by_assignee["Kai"].done, 1);
        assert_eq!(report.by_assignee["unassigned"].total, 3);
        assert_eq!(report.on_time, Rate { total: 2, done: 1, rate: 50.0 });
    }

    #[test]
    fn completion_of_empty_board_is_zero() {
        let report = completion(&[]);
        assert_eq!(report.overall.rate, 0.0);
        assert!(report.by_assignee.is_empty());
    }
}
