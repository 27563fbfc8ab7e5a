use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};

/// Filter value meaning "no constraint".
pub const ALL: &str = "all";

/// A typed filter record owned by one view.
///
/// `set` validates a user edit at the boundary; `apply` serializes the record
/// into query parameters, omitting unconstrained fields.
pub trait FilterSet: Clone + Default + Send + Sync + 'static {
    /// Recognized field names, in display order.
    fn fields(&self) -> &'static [&'static str];

    fn set(&mut self, field: &str, value: &str) -> anyhow::Result<()>;

    /// Current value of every field, for display.
    fn values(&self) -> Vec<(&'static str, String)>;

    fn apply(&self, query: &mut QueryParams);
}

/// Ordered query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        self.pairs.push((key.into(), value.to_string()));
    }

    /// Enumerated value; the sentinel and empty values are omitted.
    pub fn push_choice(&mut self, key: &str, value: &str) {
        if !is_unconstrained(value) {
            self.push(key, value.trim());
        }
    }

    /// Free-text value; empty input is omitted.
    pub fn push_text(&mut self, key: &str, value: &str) {
        let value = value.trim();
        if !value.is_empty() {
            self.push(key, value);
        }
    }

    pub fn push_amount(&mut self, key: &str, raw: &str) {
        if let Some(amount) = parse_amount(raw) {
            self.push(key, format_amount(amount));
        }
    }

    pub fn push_day_start<Tz: TimeZone>(&mut self, key: &str, raw: &str, tz: &Tz) {
        if let Some(instant) = parse_day(raw).and_then(|day| day_start(day, tz)) {
            self.push(key, format_instant(instant));
        }
    }

    pub fn push_day_end<Tz: TimeZone>(&mut self, key: &str, raw: &str, tz: &Tz) {
        if let Some(instant) = parse_day(raw).and_then(|day| day_end(day, tz)) {
            self.push(key, format_instant(instant));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

pub fn is_unconstrained(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case(ALL)
}

/// Lenient amount parsing: spaces are ignored and `,` is accepted as the
/// decimal separator. Non-finite or unparseable input yields `None`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '_')
        .map(|ch| if ch == ',' { '.' } else { ch })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{}", amount as i64)
    } else {
        format!("{amount}")
    }
}

pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    ["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

/// 00:00:00.000 of `day` in `tz`.
pub fn day_start<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> Option<DateTime<Utc>> {
    let naive = day.and_hms_milli_opt(0, 0, 0, 0)?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

/// 23:59:59.999 of `day` in `tz`.
pub fn day_end<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> Option<DateTime<Utc>> {
    let naive = day.and_hms_milli_opt(23, 59, 59, 999)?;
    tz.from_local_datetime(&naive)
        .latest()
        .map(|local| local.with_timezone(&Utc))
}

pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}
