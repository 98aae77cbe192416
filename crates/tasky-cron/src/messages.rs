//! Localized notification bodies (Telegram HTML).
//!
//! Task text is user input and is escaped; everything else is fixed markup.

use std::fmt::Write as _;

use chrono::NaiveDate;
use chrono_tz::Tz;
use tasky_core::settings::Locale;
use tasky_core::task::{Priority, Task};

/// Telegram's limit on a message body, in UTF-16 code units.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Room left for the task list after header, footer and the overflow line.
const LIST_BUDGET: usize = MAX_MESSAGE_CHARS - 256;

/// Longest task text shown before it is cut with an ellipsis.
const MAX_TASK_CHARS: usize = 300;

/// Priority marker shown before the task text.
fn priority_marker(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "🔴",
        Priority::Medium => "🟡",
        Priority::Low => "🔵",
        Priority::None => "",
    }
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_date(date: NaiveDate, locale: Locale) -> String {
    match locale {
        Locale::En => date.format("%Y-%m-%d").to_string(),
        Locale::Ru => date.format("%d.%m.%Y").to_string(),
    }
}

fn local_due_date(task: &Task, tz: Tz) -> Option<NaiveDate> {
    task.due_date.map(|due| due.with_timezone(&tz).date_naive())
}

/// `"{n}. {marker} {text}"`, without a double space when there is no marker.
fn item_line(index: usize, task: &Task) -> String {
    let marker = priority_marker(task.priority);
    let text = escape_html(&shorten(&task.text, MAX_TASK_CHARS));
    if marker.is_empty() {
        format!("{}. {text}", index + 1)
    } else {
        format!("{}. {marker} {text}", index + 1)
    }
}

fn shorten(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

/// Join `entries` with `sep` until the list budget runs out, then close with
/// a line counting the tasks left out.
fn join_bounded(entries: impl Iterator<Item = String>, total: usize, sep: &str, locale: Locale) -> String {
    let sep_len = sep.encode_utf16().count();
    let mut out = String::new();
    let mut used = 0;
    let mut shown = 0;
    for entry in entries {
        let cost = entry.encode_utf16().count() + if shown > 0 { sep_len } else { 0 };
        if used + cost > LIST_BUDGET {
            break;
        }
        if shown > 0 {
            out.push_str(sep);
        }
        out.push_str(&entry);
        used += cost;
        shown += 1;
    }
    if shown < total {
        let rest = total - shown;
        if shown > 0 {
            out.push_str(sep);
        }
        match locale {
            Locale::En => {
                let _ = write!(out, "… and {rest} more");
            }
            Locale::Ru => {
                let _ = write!(out, "… и ещё {rest}");
            }
        }
    }
    out
}

/// Russian plural form for "day" after a number.
fn ru_days(n: u32) -> &'static str {
    match (n % 10, n % 100) {
        (1, r) if r != 11 => "день",
        (2..=4, r) if !(12..=14).contains(&r) => "дня",
        _ => "дней",
    }
}

/// Tasks due today.
pub fn daily_summary(tasks: &[Task], locale: Locale) -> String {
    let lines = tasks.iter().enumerate().map(|(i, task)| item_line(i, task));
    let list = join_bounded(lines, tasks.len(), "\n", locale);
    match locale {
        Locale::En => format!("📋 <b>Tasks for today:</b>\n\n{list}\n\n<i>Total tasks: {}</i>", tasks.len()),
        Locale::Ru => format!("📋 <b>Задачи на сегодня:</b>\n\n{list}\n\n<i>Всего задач: {}</i>", tasks.len()),
    }
}

/// Tasks due `days_ahead` days from today.
pub fn reminder(days_ahead: u32, tasks: &[Task], locale: Locale, tz: Tz) -> String {
    let lines = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let mut line = item_line(i, task);
            if let Some(date) = local_due_date(task, tz) {
                let _ = write!(line, " ({})", format_date(date, locale));
            }
            line
        });
    let list = join_bounded(lines, tasks.len(), "\n", locale);

    match locale {
        Locale::En => {
            let when = if days_ahead == 1 {
                "tomorrow".to_string()
            } else {
                format!("in {days_ahead} days")
            };
            format!(
                "⏰ <b>Reminder: tasks due {when}</b>\n\n{list}\n\n<i>Total tasks: {}</i>",
                tasks.len()
            )
        }
        Locale::Ru => {
            let when = if days_ahead == 1 {
                "завтра".to_string()
            } else {
                format!("через {days_ahead} {}", ru_days(days_ahead))
            };
            format!(
                "⏰ <b>Напоминание: задачи {when}</b>\n\n{list}\n\n<i>Всего задач: {}</i>",
                tasks.len()
            )
        }
    }
}

/// Incomplete tasks due before `today` (the user's local date).
pub fn overdue(tasks: &[Task], today: NaiveDate, locale: Locale, tz: Tz) -> String {
    let entries = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let mut entry = item_line(i, task);
            if let Some(date) = local_due_date(task, tz) {
                let days = (today - date).num_days().max(0);
                let ago = match locale {
                    Locale::En if days == 1 => "1 day ago".to_string(),
                    Locale::En => format!("{days} days ago"),
                    Locale::Ru => format!("{days} дн. назад"),
                };
                let _ = write!(entry, "\n   📅 {} ({ago})", format_date(date, locale));
            }
            entry
        });
    let list = join_bounded(entries, tasks.len(), "\n\n", locale);

    match locale {
        Locale::En => format!("⚠️ <b>Overdue tasks:</b>\n\n{list}\n\n<i>Total overdue: {}</i>", tasks.len()),
        Locale::Ru => format!(
            "⚠️ <b>Просроченные задачи:</b>\n\n{list}\n\n<i>Всего просрочено: {}</i>",
            tasks.len()
        ),
    }
}
