//! Human-readable recurrence summaries.

use tasky_core::settings::Locale;
use tasky_core::task::{RecurrenceRule, RecurrenceType};

const EN_DAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const RU_DAYS: [&str; 7] = [
    "воскресенье",
    "понедельник",
    "вторник",
    "среда",
    "четверг",
    "пятница",
    "суббота",
];

/// Summarize `rule` for display, e.g. `"Every 2 weeks"` or `"Ежемесячно 15 числа"`.
#[must_use]
pub fn describe_rule(rule: &RecurrenceRule, locale: Locale) -> String {
    let mut text = match locale {
        Locale::En => describe_en(rule),
        Locale::Ru => describe_ru(rule),
    };
    if let Some(end) = rule.end_date {
        match locale {
            Locale::En => text.push_str(&format!(" until {}", end.format("%Y-%m-%d"))),
            Locale::Ru => text.push_str(&format!(" до {}", end.format("%d.%m.%Y"))),
        }
    }
    text
}

fn describe_en(rule: &RecurrenceRule) -> String {
    let n = rule.effective_interval();
    let every = |unit: &str, adverb: &str| {
        if n == 1 {
            adverb.to_string()
        } else {
            format!("Every {n} {unit}s")
        }
    };
    match rule.kind {
        RecurrenceType::Daily => every("day", "Daily"),
        RecurrenceType::Weekly => {
            let days = rule.sorted_weekdays();
            if days.is_empty() {
                every("week", "Weekly")
            } else {
                format!("Weekly: {}", day_names(&days, &EN_DAYS))
            }
        }
        RecurrenceType::Monthly => match rule.valid_day_of_month() {
            Some(day) => format!("Monthly on day {day}"),
            None => every("month", "Monthly"),
        },
        RecurrenceType::Yearly => every("year", "Yearly"),
    }
}

fn describe_ru(rule: &RecurrenceRule) -> String {
    let n = rule.effective_interval();
    // Forms for 1, 2-4 and 5+ ("день", "дня", "дней")
    let every = |forms: [&str; 3], adverb: &str| {
        if n == 1 {
            adverb.to_string()
        } else {
            let prefix = if ru_plural_index(n) == 0 { "Каждый" } else { "Каждые" };
            format!("{prefix} {n} {}", forms[ru_plural_index(n)])
        }
    };
    match rule.kind {
        RecurrenceType::Daily => every(["день", "дня", "дней"], "Ежедневно"),
        RecurrenceType::Weekly => {
            let days = rule.sorted_weekdays();
            if days.is_empty() {
                every(["неделю", "недели", "недель"], "Еженедельно")
            } else {
                format!("Еженедельно: {}", day_names(&days, &RU_DAYS))
            }
        }
        RecurrenceType::Monthly => match rule.valid_day_of_month() {
            Some(day) => format!("Ежемесячно {day} числа"),
            None => every(["месяц", "месяца", "месяцев"], "Ежемесячно"),
        },
        RecurrenceType::Yearly => every(["год", "года", "лет"], "Ежегодно"),
    }
}

fn ru_plural_index(n: u32) -> usize {
    let (last, last_two) = (n % 10, n % 100);
    if last == 1 && last_two != 11 {
        0
    } else if (2..=4).contains(&last) && !(12..=14).contains(&last_two) {
        1
    } else {
        2
    }
}

fn day_names(days: &[u8], names: &[&str; 7]) -> String {
    days.iter()
        .map(|d| names[usize::from(*d)])
        .collect::<Vec<_>>()
        .join(", ")
}
