use anyhow::{anyhow, Context, Result};
use chrono::{prelude::*, Duration, Months};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::capture::TaskInput;
use crate::model::{Category, NewTask, Priority};

/// Result of inline token parsing from the capture text.
#[derive(Debug, Default)]
struct InlineTokens {
    text_words: Vec<String>,
    priority: Option<Priority>,
    date: Option<NaiveDate>,
}

/// Turn capture input into a task ready for the store. Explicit fields win over inline
/// `p:` / `due:` tokens; the order is left at `0` for the caller to place.
pub fn prepare_new_task(input: &TaskInput, default_category: Category) -> Result<NewTask> {
    prepare_new_task_on(input, default_category, Local::now().date_naive())
}

pub fn prepare_new_task_on(
    input: &TaskInput,
    default_category: Category,
    today: NaiveDate,
) -> Result<NewTask> {
    let raw_text = input.text.join(" ");
    let inline = parse_inline_tokens(&raw_text, today)?;

    let text = inline.text_words.join(" ").trim().to_string();
    if text.is_empty() {
        return Err(anyhow!("Task text cannot be empty after parsing tokens"));
    }

    let date = match &input.date {
        Some(spec) => Some(parse_date_spec_on(spec, today)?),
        None => inline.date,
    };

    Ok(NewTask {
        text,
        completed: false,
        category: input.category.unwrap_or(default_category),
        date,
        priority: input
            .priority
            .or(inline.priority)
            .unwrap_or_else(Priority::legacy_default),
        order: 0,
    })
}

fn parse_inline_tokens(text: &str, today: NaiveDate) -> Result<InlineTokens> {
    let mut result = InlineTokens::default();

    for raw_piece in text.split_whitespace() {
        let (piece, trailing) = strip_trailing_punctuation(raw_piece);
        if let Some(spec) = piece.strip_prefix("p:") {
            result.priority = Some(spec.parse::<Priority>()?);
            if let Some(rest) = trailing {
                push_trailing(&mut result.text_words, rest);
            }
            continue;
        }
        if let Some(spec) = piece.strip_prefix("due:") {
            result.date = Some(parse_date_spec_on(spec, today)?);
            if let Some(rest) = trailing {
                push_trailing(&mut result.text_words, rest);
            }
            continue;
        }

        result.text_words.push(raw_piece.to_string());
    }

    Ok(result)
}

fn strip_trailing_punctuation(input: &str) -> (String, Option<String>) {
    static PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;.!?]+$").expect("valid regex"));
    if let Some(mat) = PUNCT_RE.find(input) {
        let token = input[..mat.start()].to_string();
        let trailing = input[mat.start()..].to_string();
        (token, Some(trailing))
    } else {
        (input.to_string(), None)
    }
}

fn push_trailing(words: &mut Vec<String>, trailing: String) {
    if let Some(last) = words.last_mut() {
        last.push_str(&trailing);
    }
}

pub fn parse_date_spec(spec: &str) -> Result<NaiveDate> {
    parse_date_spec_on(spec, Local::now().date_naive())
}

/// Resolve a date spec relative to `today`: `YYYY-MM-DD`, `today`, `tomorrow`,
/// `+3d` / `+2w` / `+1m`, or a weekday name (next occurrence, never today).
pub fn parse_date_spec_on(spec: &str, today: NaiveDate) -> Result<NaiveDate> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Date specification cannot be empty"));
    }

    let lower = trimmed.to_ascii_lowercase();
    match lower.as_str() {
        "today" => return Ok(today),
        "tomorrow" => return Ok(today + Duration::days(1)),
        _ => {}
    }

    if lower.starts_with('+') {
        return parse_relative_spec(&lower, today);
    }

    if let Some(weekday) = parse_weekday(&lower) {
        let mut days_ahead = (weekday.num_days_from_monday() as i64
            - today.weekday().num_days_from_monday() as i64)
            .rem_euclid(7);
        if days_ahead == 0 {
            days_ahead = 7;
        }
        return Ok(today + Duration::days(days_ahead));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }

    Err(anyhow!(
        "Unrecognized date specification '{}'. Try YYYY-MM-DD, today, tomorrow, +3d, mon",
        spec
    ))
}

fn parse_relative_spec(spec: &str, today: NaiveDate) -> Result<NaiveDate> {
    if spec.len() < 3 {
        return Err(anyhow!("Relative date '{}' is too short", spec));
    }
    let (number_part, unit) = spec[1..].split_at(spec.len() - 2);
    let value: i64 = number_part.parse().context("Invalid relative offset")?;
    match unit {
        "d" => Ok(today + Duration::days(value)),
        "w" => Ok(today + Duration::weeks(value)),
        "m" => {
            let months = Months::new(value.try_into()?);
            today
                .checked_add_months(months)
                .ok_or_else(|| anyhow!("Relative date '{}' is out of range", spec))
        }
        other => Err(anyhow!(
            "Unsupported relative unit '{}'. Use d, w, or m.",
            other
        )),
    }
}

fn parse_weekday(label: &str) -> Option<Weekday> {
    match label {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}
