//! Best-effort trip field extraction from free text.
//!
//! English and French phrasings are recognized. A phrase that does not
//! match leaves its field unset; nothing here fails.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

use crate::capabilities::travel::BudgetTier;
use crate::crew::Inputs;

pub const DEFAULT_DESTINATION: &str = "unknown destination";
pub const DEFAULT_ORIGIN: &str = "unknown origin";
pub const DEFAULT_DURATION: &str = "3";
pub const DEFAULT_BUDGET: &str = "moderate";

/// Amounts below this are an economy trip.
const ECONOMY_CEILING: u64 = 800;
/// Amounts below this (and not economy) are a moderate trip.
const MODERATE_CEILING: u64 = 2000;

static DESTINATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:je\s+vais\s+(?:aux|au|à|a|en)|going\s+to|travel(?:l?ing)?\s+to|trip\s+to|visit(?:ing)?)\s+([^,.!?\n]+)",
    )
    .expect("destination pattern")
});

static ORIGIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:je\s+pars\s+(?:de\s+|d['’]\s*)|(?:leaving|departing)\s+from\s+|from\s+)([^,.!?\n]+)")
        .expect("origin pattern")
});

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:for|pendant|pour)\s+(\d{1,3})\s+(?:days?|jours?|nights?|nuits?)\b")
        .expect("duration pattern")
});

static RANGE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:je\s+reviens\s+le|(?:back|returning|return)\s+on(?:\s+the)?)\s+(\d{1,2})(?:st|nd|rd|th|er)?\s+(\p{L}+)",
    )
    .expect("range end pattern")
});

static RANGE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:le|on(?:\s+the)?)\s+(\d{1,2})(?:st|nd|rd|th|er)?\s+(\p{L}+)")
        .expect("range start pattern")
});

static BUDGET_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bbudget\s*(?:of|de|is|:)?\s*[$€£]?\s*(\d+)").expect("budget amount pattern")
});

static BUDGET_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bbudget\s*(?:is|:)?\s*(economy|cheap|economique|économique|moderate|moyen|luxury|luxe)\b",
    )
    .expect("budget word pattern")
});

/// Words that end a place name: "going to Lisbon from Porto for 4 days".
static CLAUSE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s+(?:from|for|on|with|and|in|next|this|le|pour|pendant|avec|et|depuis|je)\b",
    )
    .expect("clause pattern")
});

/// Extract whatever trip fields the text mentions. Date ranges are resolved in `today`'s year.
pub fn extract_fields_on(text: &str, today: NaiveDate) -> Inputs {
    let mut fields = Inputs::new();

    if let Some(place) = capture_place(&DESTINATION, text) {
        fields.insert("destination".to_string(), place);
    }
    if let Some(place) = capture_place(&ORIGIN, text) {
        fields.insert("origin".to_string(), place);
    }

    if let Some(caps) = DURATION.captures(text) {
        fields.insert("duration".to_string(), caps[1].to_string());
    } else if let Some(days) = range_days(text, today.year()) {
        fields.insert("duration".to_string(), days.to_string());
    }

    if let Some(tier) = budget_tier(text) {
        fields.insert("budget".to_string(), tier.label().to_string());
    }

    fields
}

/// Fill every unset trip field with its default.
pub fn apply_defaults(inputs: &mut Inputs) {
    for (field, default) in [
        ("destination", DEFAULT_DESTINATION),
        ("origin", DEFAULT_ORIGIN),
        ("duration", DEFAULT_DURATION),
        ("budget", DEFAULT_BUDGET),
    ] {
        inputs
            .entry(field.to_string())
            .or_insert_with(|| default.to_string());
    }
}

/// The full input map for one inbound message: raw text, extracted fields, defaults.
pub fn build_inputs(text: &str, today: NaiveDate) -> Inputs {
    let mut inputs = extract_fields_on(text, today);
    inputs.insert("user_request".to_string(), text.to_string());
    apply_defaults(&mut inputs);
    inputs
}

fn capture_place(pattern: &Regex, text: &str) -> Option<String> {
    let raw = pattern.captures(text)?.get(1)?.as_str();
    let cut = CLAUSE_BREAK.find(raw).map_or(raw, |m| &raw[..m.start()]);
    let place = cut.trim();
    (!place.is_empty()).then(|| place.to_string())
}

fn budget_tier(text: &str) -> Option<BudgetTier> {
    if let Some(caps) = BUDGET_AMOUNT.captures(text) {
        // The pattern only matches digits, so a failed parse is an overflow.
        let amount = caps[1].parse::<u64>().unwrap_or(u64::MAX);
        return Some(if amount < ECONOMY_CEILING {
            BudgetTier::Economy
        } else if amount < MODERATE_CEILING {
            BudgetTier::Moderate
        } else {
            BudgetTier::Luxury
        });
    }
    BUDGET_WORD
        .captures(text)
        .map(|caps| BudgetTier::parse(&caps[1]))
}

/// Inclusive day count of a "on 28 February … back on 3 March" range.
/// An end before the start rolls over into the next year.
fn range_days(text: &str, year: i32) -> Option<i64> {
    let end_caps = RANGE_END.captures(text)?;
    let end_at = end_caps.get(0)?.start();
    let start_caps = RANGE_START.captures(&text[..end_at])?;

    let start = day_in(year, &start_caps[1], &start_caps[2])?;
    let mut end = day_in(year, &end_caps[1], &end_caps[2])?;
    if end < start {
        end = day_in(year + 1, &end_caps[1], &end_caps[2])?;
    }

    let days = (end - start).num_days() + 1;
    (days > 0).then_some(days)
}

fn day_in(year: i32, day: &str, month: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month_number(month)?, day.parse().ok()?)
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "january" | "jan" | "janvier" => 1,
        "february" | "feb" | "fevrier" | "février" => 2,
        "march" | "mar" | "mars" => 3,
        "april" | "apr" | "avril" => 4,
        "may" | "mai" => 5,
        "june" | "jun" | "juin" => 6,
        "july" | "jul" | "juillet" => 7,
        "august" | "aug" | "aout" | "août" => 8,
        "september" | "sep" | "sept" | "septembre" => 9,
        "october" | "oct" | "octobre" => 10,
        "november" | "nov" | "novembre" => 11,
        "december" | "dec" | "decembre" | "décembre" => 12,
        _ => return None,
    };
    Some(month)
}
