//! Timestamp resolution for parsed lines
//!
//! The pipeline only depends on the [`TimestampResolver`] trait. [`DefaultResolver`]
//! picks a time field out of the merged mapping and parses it with the configured
//! format hint, falling back to the current time when nothing usable is found.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use std::cell::{Cell, RefCell};

use crate::event::{FieldMap, FieldValue};

/// Field names tried, in order, when no time field is configured
pub const WELL_KNOWN_TIME_FIELDS: [&str; 10] = [
    "time",
    "Time",
    "timestamp",
    "Timestamp",
    "TimeStamp",
    "date",
    "Date",
    "datetime",
    "Datetime",
    "DateTime",
];

/// Picks the event timestamp out of a merged field mapping
pub trait TimestampResolver: Send + Sync {
    fn resolve(
        &self,
        fields: &FieldMap,
        field_name: Option<&str>,
        format: Option<&str>,
    ) -> DateTime<Utc>;
}

impl<F> TimestampResolver for F
where
    F: Fn(&FieldMap, Option<&str>, Option<&str>) -> DateTime<Utc> + Send + Sync,
{
    fn resolve(
        &self,
        fields: &FieldMap,
        field_name: Option<&str>,
        format: Option<&str>,
    ) -> DateTime<Utc> {
        self(fields, field_name, format)
    }
}

thread_local! {
    // One adaptive parser per worker thread, so reordering never contends
    static TS_PARSER: RefCell<AdaptiveTsParser> = RefCell::new(AdaptiveTsParser::new());
    static WARNED_ABOUT_TIME: Cell<bool> = const { Cell::new(false) };
}

/// Resolver used when none is injected.
///
/// - with a field name: parse that field (string, int or float) using the format
///   hint, or auto-detect without one; missing or unparseable means "now"
/// - without a field name: the first of [`WELL_KNOWN_TIME_FIELDS`] that parses wins
///
/// The field mapping is never modified.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResolver;

impl TimestampResolver for DefaultResolver {
    fn resolve(
        &self,
        fields: &FieldMap,
        field_name: Option<&str>,
        format: Option<&str>,
    ) -> DateTime<Utc> {
        let format = format.filter(|f| !f.is_empty());

        match field_name.filter(|f| !f.is_empty()) {
            Some(name) => {
                let Some(value) = fields.get(name) else {
                    warn_once(name, "couldn't find specified time field");
                    return Utc::now();
                };
                let Some(text) = value_as_time_text(value) else {
                    warn_once(name, "time field has a type that can't hold a timestamp");
                    return Utc::now();
                };
                parse_with_hint(&text, format).unwrap_or_else(|| {
                    warn_once(name, "found time field but failed to parse it");
                    Utc::now()
                })
            }
            None => WELL_KNOWN_TIME_FIELDS
                .iter()
                .filter_map(|name| fields.get(*name))
                .filter_map(value_as_time_text)
                .find_map(|text| parse_with_hint(&text, format))
                .unwrap_or_else(Utc::now),
        }
    }
}

fn warn_once(field: &str, message: &str) {
    WARNED_ABOUT_TIME.with(|warned| {
        if !warned.replace(true) {
            tracing::warn!(
                time_field = field,
                "{}; using current time (further warnings from this worker suppressed)",
                message
            );
        }
    });
}

/// Textual form of a field value that may hold a timestamp
fn value_as_time_text(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Str(s) if !s.is_empty() => Some(s.clone()),
        FieldValue::Int(i) => Some(i.to_string()),
        FieldValue::Float(f) if f.is_finite() => Some(f.to_string()),
        _ => None,
    }
}

/// Parse with an explicit format hint if given, otherwise auto-detect
pub fn parse_with_hint(ts_str: &str, format: Option<&str>) -> Option<DateTime<Utc>> {
    match format {
        Some(format) => parse_with_format(ts_str, format),
        None => TS_PARSER.with(|parser| parser.borrow_mut().parse_ts(ts_str)),
    }
}

/// Parse using one of the recognized format syntaxes:
/// epoch keywords (`unix`, `unix_ms`, `unix_us`, `unix_ns`), strftime
/// (anything containing `%`), or a Go reference layout (`2006-01-02T15:04:05Z07:00`).
pub fn parse_with_format(ts_str: &str, format: &str) -> Option<DateTime<Utc>> {
    let ts_str = ts_str.trim();
    match format {
        "unix" | "%s" => parse_epoch(ts_str, EpochUnit::Seconds),
        "unix_ms" => parse_epoch(ts_str, EpochUnit::Millis),
        "unix_us" => parse_epoch(ts_str, EpochUnit::Micros),
        "unix_ns" => parse_epoch(ts_str, EpochUnit::Nanos),
        f if f.contains('%') => try_parse_with_format(ts_str, f),
        layout => {
            let translated = go_layout_to_strftime(layout);
            let ts_str = if translated.zulu && ts_str.ends_with('Z') {
                let offset = if translated.format.contains("%:z") {
                    "+00:00"
                } else {
                    "+0000"
                };
                format!("{}{}", &ts_str[..ts_str.len() - 1], offset)
            } else {
                ts_str.to_string()
            };
            try_parse_with_format(&ts_str, &translated.format)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EpochUnit {
    Seconds,
    Millis,
    Micros,
    Nanos,
}

fn parse_epoch(ts_str: &str, unit: EpochUnit) -> Option<DateTime<Utc>> {
    if let Ok(value) = ts_str.parse::<i64>() {
        return match unit {
            EpochUnit::Seconds => DateTime::from_timestamp(value, 0),
            EpochUnit::Millis => DateTime::from_timestamp_millis(value),
            EpochUnit::Micros => DateTime::from_timestamp_micros(value),
            EpochUnit::Nanos => Some(DateTime::from_timestamp_nanos(value)),
        };
    }

    // Fractional epoch values, e.g. 1700000000.250
    let value = ts_str.parse::<f64>().ok().filter(|v| v.is_finite())?;
    let nanos_per_unit = match unit {
        EpochUnit::Seconds => 1e9,
        EpochUnit::Millis => 1e6,
        EpochUnit::Micros => 1e3,
        EpochUnit::Nanos => 1.0,
    };
    let total_nanos = value * nanos_per_unit;
    if total_nanos.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(DateTime::from_timestamp_nanos(total_nanos.round() as i64))
}

/// Try to parse Unix timestamp based on string length
fn try_parse_unix_timestamp(ts_str: &str) -> Option<DateTime<Utc>> {
    let (int_part, frac_part) = match ts_str.split_once('.') {
        Some((i, f)) if !f.is_empty() && f.chars().all(|c| c.is_ascii_digit()) => (i, Some(f)),
        Some(_) => return None,
        None => (ts_str, None),
    };
    if int_part.is_empty() || !int_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let unit = match int_part.len() {
        10 => EpochUnit::Seconds,
        13 => EpochUnit::Millis,
        16 => EpochUnit::Micros,
        19 => EpochUnit::Nanos,
        _ => return None,
    };

    match frac_part {
        Some(_) => parse_epoch(ts_str, unit),
        None => parse_epoch(int_part, unit),
    }
}

/// Try to parse a timestamp with a strftime format. Naive results are taken as UTC.
fn try_parse_with_format(ts_str: &str, format: &str) -> Option<DateTime<Utc>> {
    // Strip brackets if present (common in Apache/Nginx logs)
    let ts_str = ts_str.trim();
    let ts_str = ts_str
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(ts_str);

    // Comma-separated fractional seconds (Python logging format)
    let (ts_str, format) = normalize_comma_fraction(ts_str, format);

    if let Ok(dt) = DateTime::parse_from_str(&ts_str, &format) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive_dt) = NaiveDateTime::parse_from_str(&ts_str, &format) {
        return Some(naive_dt.and_utc());
    }

    // Year-less syslog timestamps: assume the current year, then the previous one
    // (a December log read in January)
    if format.contains("%b") && format.contains("%d") && !format.contains("%Y") {
        let current_year = Utc::now().year();
        for year in [current_year, current_year - 1] {
            let with_year = format!("{} {}", year, ts_str);
            let format_with_year = format!("%Y {}", format);
            if let Ok(naive_dt) = NaiveDateTime::parse_from_str(&with_year, &format_with_year) {
                let dt = naive_dt.and_utc();
                if dt <= Utc::now() + chrono::Duration::days(1) {
                    return Some(dt);
                }
            }
        }
    }

    // Date-only formats land at midnight
    if let Ok(date) = NaiveDate::parse_from_str(&ts_str, &format) {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    None
}

fn normalize_comma_fraction(ts_str: &str, format: &str) -> (String, String) {
    if !format.contains(",%f") {
        return (ts_str.to_string(), format.to_string());
    }

    match ts_str.rsplit_once(',') {
        Some((base, frac)) if !frac.is_empty() && frac.chars().all(|c| c.is_ascii_digit()) => {
            // %f wants nanoseconds; pad or truncate to 9 digits
            let mut nanos: String = frac.chars().take(9).collect();
            while nanos.len() < 9 {
                nanos.push('0');
            }
            (
                format!("{}.{}", base, nanos),
                format.replace(",%f", ".%f"),
            )
        }
        _ => (ts_str.to_string(), format.to_string()),
    }
}

struct TranslatedLayout {
    format: String,
    /// The layout accepts a literal `Z` in place of a UTC offset
    zulu: bool,
}

/// Go reference-time layout elements and their strftime equivalents.
/// Longer elements come first so that e.g. `2006` wins over `2`.
const GO_LAYOUT_ELEMENTS: &[(&str, &str)] = &[
    ("January", "%B"),
    ("Monday", "%A"),
    ("Z07:00", "%:z"),
    ("-07:00", "%:z"),
    ("Z0700", "%z"),
    ("-0700", "%z"),
    ("Z07", "%#z"),
    ("-07", "%#z"),
    (".000000000", "%.9f"),
    (".999999999", "%.f"),
    (".000000", "%.6f"),
    (".999999", "%.f"),
    (".000", "%.3f"),
    (".999", "%.f"),
    ("2006", "%Y"),
    ("Jan", "%b"),
    ("Mon", "%a"),
    ("MST", "%Z"),
    ("01", "%m"),
    ("02", "%d"),
    ("_2", "%e"),
    ("06", "%y"),
    ("15", "%H"),
    ("03", "%I"),
    ("04", "%M"),
    ("05", "%S"),
    ("PM", "%p"),
    ("pm", "%P"),
    ("1", "%m"),
    ("2", "%d"),
    ("3", "%I"),
    ("4", "%M"),
    ("5", "%S"),
];

fn go_layout_to_strftime(layout: &str) -> TranslatedLayout {
    let mut format = String::with_capacity(layout.len() * 2);
    let mut zulu = false;
    let mut rest = layout;

    'outer: while !rest.is_empty() {
        for (element, strftime) in GO_LAYOUT_ELEMENTS {
            if let Some(after) = rest.strip_prefix(element) {
                if element.starts_with('Z') {
                    zulu = true;
                }
                format.push_str(strftime);
                rest = after;
                continue 'outer;
            }
        }

        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            if ch == '%' {
                format.push_str("%%");
            } else {
                format.push(ch);
            }
        }
        rest = chars.as_str();
    }

    TranslatedLayout { format, zulu }
}

/// Adaptive timestamp parser that dynamically reorders formats based on success.
/// Each thread has its own instance to avoid contention.
pub struct AdaptiveTsParser {
    /// Format list with successful formats moved to front
    formats: Vec<&'static str>,
}

impl AdaptiveTsParser {
    pub fn new() -> Self {
        Self {
            formats: INITIAL_TIMESTAMP_FORMATS.to_vec(),
        }
    }

    /// Auto-detect and parse a timestamp
    pub fn parse_ts(&mut self, ts_str: &str) -> Option<DateTime<Utc>> {
        let ts_str = ts_str.trim();
        if ts_str.is_empty() {
            return None;
        }

        if let Some(dt) = try_parse_unix_timestamp(ts_str) {
            return Some(dt);
        }

        // Standard RFC formats are cheap, try them before the list
        if let Ok(dt) = DateTime::parse_from_rfc3339(ts_str) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(ts_str) {
            return Some(dt.with_timezone(&Utc));
        }

        self.try_formats_with_reordering(ts_str)
    }

    fn try_formats_with_reordering(&mut self, ts_str: &str) -> Option<DateTime<Utc>> {
        let (index, parsed) = self
            .formats
            .iter()
            .enumerate()
            .find_map(|(index, format)| try_parse_with_format(ts_str, format).map(|dt| (index, dt)))?;

        if index > 0 {
            let successful_format = self.formats.remove(index);
            self.formats.insert(0, successful_format);
        }
        Some(parsed)
    }

    /// Current format ordering
    pub fn format_ordering(&self) -> &[&'static str] {
        &self.formats
    }
}

impl Default for AdaptiveTsParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered by likelihood, most common formats first
const INITIAL_TIMESTAMP_FORMATS: &[&str] = &[
    // ISO 8601 variants
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    // Space-separated ISO variants
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.fZ",
    "%Y-%m-%d %H:%M:%SZ",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S %z",
    // Syslog and server log formats
    "%b %d %H:%M:%S",
    "%b %d %Y %H:%M:%S",
    "%d/%b/%Y:%H:%M:%S %z",
    // Application-specific formats
    "%Y-%m-%d %H:%M:%S,%f",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%a %b %d %H:%M:%S %Y",
    "%b %d, %Y %I:%M:%S %p",
    // Date only
    "%Y-%m-%d",
];
