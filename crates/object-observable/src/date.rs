//! Date adapter with setter/getter methods in the style of a JS `Date`.
//!
//! Times are naive UTC with millisecond precision. Setters normalize
//! out-of-range components by carrying into the next larger unit, so
//! `set_date(32)` in January lands on February 1st.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc};
use serde_json::{json, Value};

use crate::adapter::{int_arg, opt_int_arg, MutableValue};
use crate::error::AdapterError;

const MUTATORS: &[(&str, &str)] = &[
    ("set_year", "year"),
    ("set_full_year", "year"),
    ("set_month", "month"),
    ("set_date", "date"),
    ("set_hours", "hours"),
    ("set_minutes", "minutes"),
    ("set_seconds", "seconds"),
    ("set_milliseconds", "milliseconds"),
    ("set_time", "time"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DateValue {
    inner: NaiveDateTime,
}

/// Broken-down components; `month` is zero-based.
#[derive(Debug, Clone, Copy)]
struct Parts {
    year: i64,
    month: i64,
    day: i64,
    hours: i64,
    minutes: i64,
    seconds: i64,
    millis: i64,
}

impl DateValue {
    pub fn new(inner: NaiveDateTime) -> Self {
        let millis = inner.and_utc().timestamp_subsec_millis();
        let inner = inner
            .with_nanosecond(millis * 1_000_000)
            .unwrap_or(inner);
        Self { inner }
    }

    pub fn now() -> Self {
        Self::new(Utc::now().naive_utc())
    }

    /// Builds a date from milliseconds since the Unix epoch.
    pub fn from_timestamp_millis(ms: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(ms).map(|dt| Self::new(dt.naive_utc()))
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.inner
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.inner.and_utc().timestamp_millis()
    }

    /// ISO-8601 with millisecond precision, e.g. `2000-02-01T00:00:00.000Z`.
    pub fn to_iso_string(&self) -> String {
        self.inner.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }

    fn parts(&self) -> Parts {
        let d = self.inner;
        Parts {
            year: i64::from(d.year()),
            month: i64::from(d.month0()),
            day: i64::from(d.day()),
            hours: i64::from(d.hour()),
            minutes: i64::from(d.minute()),
            seconds: i64::from(d.second()),
            millis: i64::from(d.nanosecond() / 1_000_000),
        }
    }

    fn assign(&mut self, method: &str, parts: Parts) -> Result<Value, AdapterError> {
        let next = compose(parts).ok_or_else(|| AdapterError::OutOfRange(method.to_string()))?;
        self.inner = next;
        Ok(json!(self.timestamp_millis()))
    }
}

fn compose(p: Parts) -> Option<NaiveDateTime> {
    let year = p.year.checked_add(p.month.div_euclid(12))?;
    let month = u32::try_from(p.month.rem_euclid(12)).ok()? + 1;
    let first = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, 1)?;
    let date = first.checked_add_signed(TimeDelta::try_days(p.day.checked_sub(1)?)?)?;
    let millis = p
        .hours
        .checked_mul(60)?
        .checked_add(p.minutes)?
        .checked_mul(60)?
        .checked_add(p.seconds)?
        .checked_mul(1000)?
        .checked_add(p.millis)?;
    date.and_hms_opt(0, 0, 0)?
        .checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}

impl MutableValue for DateValue {
    fn type_name(&self) -> &'static str {
        "Date"
    }

    fn mutators(&self) -> &'static [(&'static str, &'static str)] {
        MUTATORS
    }

    fn call(&mut self, method: &str, args: &[Value]) -> Result<Value, AdapterError> {
        let mut p = self.parts();
        match method {
            "set_full_year" => {
                p.year = int_arg(method, args, 0)?;
                if let Some(m) = opt_int_arg(method, args, 1)? {
                    p.month = m;
                }
                if let Some(d) = opt_int_arg(method, args, 2)? {
                    p.day = d;
                }
                self.assign(method, p)
            }
            "set_year" => {
                let y = int_arg(method, args, 0)?;
                p.year = if (0..=99).contains(&y) { 1900 + y } else { y };
                self.assign(method, p)
            }
            "set_month" => {
                p.month = int_arg(method, args, 0)?;
                if let Some(d) = opt_int_arg(method, args, 1)? {
                    p.day = d;
                }
                self.assign(method, p)
            }
            "set_date" => {
                p.day = int_arg(method, args, 0)?;
                self.assign(method, p)
            }
            "set_hours" => {
                p.hours = int_arg(method, args, 0)?;
                p.minutes = opt_int_arg(method, args, 1)?.unwrap_or(p.minutes);
                p.seconds = opt_int_arg(method, args, 2)?.unwrap_or(p.seconds);
                p.millis = opt_int_arg(method, args, 3)?.unwrap_or(p.millis);
                self.assign(method, p)
            }
            "set_minutes" => {
                p.minutes = int_arg(method, args, 0)?;
                p.seconds = opt_int_arg(method, args, 1)?.unwrap_or(p.seconds);
                p.millis = opt_int_arg(method, args, 2)?.unwrap_or(p.millis);
                self.assign(method, p)
            }
            "set_seconds" => {
                p.seconds = int_arg(method, args, 0)?;
                p.millis = opt_int_arg(method, args, 1)?.unwrap_or(p.millis);
                self.assign(method, p)
            }
            "set_milliseconds" => {
                p.millis = int_arg(method, args, 0)?;
                self.assign(method, p)
            }
            "set_time" => {
                let ms = int_arg(method, args, 0)?;
                *self = Self::from_timestamp_millis(ms)
                    .ok_or_else(|| AdapterError::OutOfRange(method.to_string()))?;
                Ok(json!(ms))
            }
            "get_full_year" => Ok(json!(p.year)),
            "get_year" => Ok(json!(p.year - 1900)),
            "get_month" => Ok(json!(p.month)),
            "get_date" => Ok(json!(p.day)),
            "get_day" => Ok(json!(self.inner.weekday().num_days_from_sunday())),
            "get_hours" => Ok(json!(p.hours)),
            "get_minutes" => Ok(json!(p.minutes)),
            "get_seconds" => Ok(json!(p.seconds)),
            "get_milliseconds" => Ok(json!(p.millis)),
            "get_time" | "value_of" => Ok(json!(self.timestamp_millis())),
            "to_iso_string" | "to_json" => Ok(json!(self.to_iso_string())),
            _ => Err(AdapterError::UnknownMethod(method.to_string())),
        }
    }

    fn snapshot(&self) -> Value {
        Value::String(self.to_iso_string())
    }

    fn box_clone(&self) -> Box<dyn MutableValue> {
        Box::new(*self)
    }
}
