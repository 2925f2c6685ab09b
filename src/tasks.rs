//! Task board: list filtering, kanban columns and the month calendar.

use crate::errors::ValidationError;
use crate::models::{Database, Priority, Task, TaskInput, TaskQuery, TaskSort, TaskStatus};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::cmp::{Ordering, Reverse};
use std::collections::BTreeMap;

pub fn create_task(
    db: &mut Database,
    input: TaskInput,
    now: DateTime<Utc>,
) -> Result<Task, ValidationError> {
    if input.title.is_none() {
        return Err(ValidationError::Empty("title"));
    }
    let mut task = Task {
        id: 0,
        title: String::new(),
        description: None,
        client_id: None,
        status: TaskStatus::Todo,
        priority: Priority::Medium,
        assignee: None,
        due_date: None,
        position: 0,
        created_at: now,
        updated_at: now,
        completed_at: None,
    };
    let explicit_position = input.position.is_some();
    apply_input(&mut task, input, now)?;
    if !explicit_position {
        task.position = next_position(db, task.status);
    }
    task.id = db.next_task_id();
    db.tasks.insert(task.id, task.clone());
    Ok(task)
}

pub fn apply_input(task: &mut Task, input: TaskInput, now: DateTime<Utc>) -> Result<(), ValidationError> {
    let mut next = task.clone();
    if let Some(title) = input.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::Empty("title"));
        }
        next.title = title.to_string();
    }
    if let Some(description) = input.description {
        next.description = optional(description);
    }
    if let Some(client_id) = input.client_id {
        next.client_id = client_id;
    }
    if let Some(priority) = input.priority {
        next.priority = priority;
    }
    if let Some(assignee) = input.assignee {
        next.assignee = optional(assignee);
    }
    if let Some(due_date) = input.due_date {
        next.due_date = due_date;
    }
    if let Some(position) = input.position {
        next.position = position;
    }
    if let Some(status) = input.status {
        set_status(&mut next, status, now);
    }
    next.updated_at = now;
    *task = next;
    Ok(())
}

/// Moves a card between kanban columns. Without a position the card goes
/// to the bottom of the target column.
pub fn move_task(
    db: &mut Database,
    task_id: u64,
    status: TaskStatus,
    position: Option<i64>,
    now: DateTime<Utc>,
) -> Option<Task> {
    let position = position.unwrap_or_else(|| next_position(db, status));
    let task = db.tasks.get_mut(&task_id)?;
    set_status(task, status, now);
    task.position = position;
    task.updated_at = now;
    Some(task.clone())
}

fn set_status(task: &mut Task, status: TaskStatus, now: DateTime<Utc>) {
    if status == TaskStatus::Done {
        if task.status != TaskStatus::Done || task.completed_at.is_none() {
            task.completed_at = Some(now);
        }
    } else {
        task.completed_at = None;
    }
    task.status = status;
}

fn next_position(db: &Database, status: TaskStatus) -> i64 {
    db.tasks
        .values()
        .filter(|task| task.status == status)
        .map(|task| task.position)
        .max()
        .map_or(0, |max| max + 1)
}

pub fn filter_tasks<'a>(db: &'a Database, query: &TaskQuery, today: NaiveDate) -> Vec<&'a Task> {
    let search = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let assignee = query.assignee.as_deref().map(str::trim).filter(|a| !a.is_empty());

    let mut tasks: Vec<&Task> = db
        .tasks
        .values()
        .filter(|task| query.status.is_none_or(|status| task.status == status))
        .filter(|task| query.priority.is_none_or(|priority| task.priority == priority))
        .filter(|task| query.client_id.is_none_or(|id| task.client_id == Some(id)))
        .filter(|task| {
            assignee.is_none_or(|name| {
                task.assignee
                    .as_deref()
                    .is_some_and(|assigned| assigned.eq_ignore_ascii_case(name))
            })
        })
        .filter(|task| {
            search.as_ref().is_none_or(|needle| {
                task.title.to_lowercase().contains(needle)
                    || task
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(needle))
            })
        })
        .filter(|task| {
            query
                .due_before
                .is_none_or(|before| task.due_date.is_some_and(|due| due <= before))
        })
        .filter(|task| {
            query
                .due_after
                .is_none_or(|after| task.due_date.is_some_and(|due| due >= after))
        })
        .filter(|task| query.overdue.is_none_or(|wanted| task.is_overdue(today) == wanted))
        .collect();

    sort_tasks(&mut tasks, query.sort.unwrap_or_default());
    tasks
}

pub fn sort_tasks(tasks: &mut [&Task], sort: TaskSort) {
    match sort {
        TaskSort::Due => tasks.sort_by(|a, b| {
            due_order(a.due_date, b.due_date)
                .then(b.priority.cmp(&a.priority))
                .then(a.id.cmp(&b.id))
        }),
        TaskSort::Priority => tasks.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(due_order(a.due_date, b.due_date))
                .then(a.id.cmp(&b.id))
        }),
        TaskSort::Created => tasks.sort_by_key(|task| (Reverse(task.created_at), Reverse(task.id))),
        TaskSort::Title => tasks.sort_by_key(|task| (task.title.to_lowercase(), task.id)),
    }
}

/// Dated tasks first, earliest due first.
fn due_order(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KanbanColumn {
    pub status: TaskStatus,
    pub count: usize,
    pub tasks: Vec<Task>,
}

/// One column per status in workflow order. `query.status` is ignored.
pub fn kanban(db: &Database, query: &TaskQuery, today: NaiveDate) -> Vec<KanbanColumn> {
    let unfiltered_status = TaskQuery {
        status: None,
        priority: query.priority,
        client_id: query.client_id,
        assignee: query.assignee.clone(),
        search: query.search.clone(),
        due_before: query.due_before,
        due_after: query.due_after,
        overdue: query.overdue,
        sort: None,
    };
    let mut by_status: BTreeMap<TaskStatus, Vec<&Task>> = BTreeMap::new();
    for task in filter_tasks(db, &unfiltered_status, today) {
        by_status.entry(task.status).or_default().push(task);
    }

    TaskStatus::WORKFLOW
        .iter()
        .map(|status| {
            let mut tasks = by_status.remove(status).unwrap_or_default();
            tasks.sort_by_key(|task| (task.position, task.id));
            KanbanColumn {
                status: *status,
                count: tasks.len(),
                tasks: tasks.into_iter().cloned().collect(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarMonth {
    pub month: String,
    pub days: Vec<CalendarDay>,
    /// Open tasks due before the first of the month.
    pub overdue: Vec<Task>,
    pub undated: usize,
}

pub fn calendar(db: &Database, month_start: NaiveDate) -> CalendarMonth {
    let mut by_day: BTreeMap<NaiveDate, Vec<&Task>> = BTreeMap::new();
    let mut overdue = Vec::new();
    let mut undated = 0;
    for task in db.tasks.values() {
        match task.due_date {
            Some(due) if due < month_start => {
                if task.is_open() {
                    overdue.push(task);
                }
            }
            Some(due) => by_day.entry(due).or_default().push(task),
            None => undated += 1,
        }
    }
    sort_tasks(&mut overdue, TaskSort::Due);

    let days = month_start
        .iter_days()
        .take_while(|day| day.month() == month_start.month())
        .map(|date| {
            let mut tasks = by_day.remove(&date).unwrap_or_default();
            sort_tasks(&mut tasks, TaskSort::Priority);
            CalendarDay {
                date,
                tasks: tasks.into_iter().cloned().collect(),
            }
        })
        .collect();

    CalendarMonth {
        month: crate::billing::month_key(month_start),
        days,
        overdue: overdue.into_iter().cloned().collect(),
        undated,
    }
}

fn optional(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
