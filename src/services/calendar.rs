//! iCalendar (RFC 5545) export of due tasks.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::ServiceError;
use crate::database::models::Task;
use crate::database::repository::tasks::{self, TaskFilter};
use crate::domain::{Actor, Permission};

const PRODID: &str = "-//TaskHub//Task Calendar//EN";
const MAX_LINE_OCTETS: usize = 75;

pub struct CalendarService {
    pool: PgPool,
}

impl CalendarService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Feed of every open task with a due date the caller can see.
    pub async fn feed(&self, actor: &Actor) -> Result<String, ServiceError> {
        let scope = actor.tenant_for(Permission::ViewTasks)?;
        let filter = TaskFilter {
            open_with_due_date: true,
            ..TaskFilter::default()
        };
        let tasks = tasks::list_scoped(&self.pool, &scope, &filter, None).await?;
        Ok(render_calendar(&tasks, Utc::now()))
    }
}

pub fn render_calendar(tasks: &[Task], now: DateTime<Utc>) -> String {
    let stamp = ical_timestamp(now);
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{}", PRODID),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
    ];

    for task in tasks {
        let Some(due_at) = task.due_at else { continue };
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{}@taskhub", task.id));
        lines.push(format!("DTSTAMP:{}", stamp));
        lines.push(format!("DTSTART:{}", ical_timestamp(due_at)));
        lines.push(format!("SUMMARY:{}", escape_text(&task.title)));
        if let Some(description) = &task.description {
            lines.push(format!("DESCRIPTION:{}", escape_text(description)));
        }
        lines.push(format!("PRIORITY:{}", task.priority.ical_priority()));
        lines.push(format!("CATEGORIES:{}", task.status.as_str()));
        lines.push(format!("LAST-MODIFIED:{}", ical_timestamp(task.updated_at)));
        lines.push("END:VEVENT".to_string());
    }
    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in lines {
        out.push_str(&fold_line(&line));
        out.push_str("\r\n");
    }
    out
}

fn ical_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

/// TEXT value escaping: backslash, semicolon, comma and newlines.
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\\n");
            }
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

/// Split a content line so no physical line exceeds 75 octets. Continuation
/// lines start with a single space, which counts toward their length. Never
/// splits inside a UTF-8 sequence.
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut used = 0;
    for c in line.chars() {
        let width = c.len_utf8();
        if used + width > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            used = 1;
        }
        out.push(c);
        used += width;
    }
    out
}
