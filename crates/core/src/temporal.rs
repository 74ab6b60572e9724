//! Conversions between kdb+ temporal payloads and `chrono` types
//!
//! kdb+ counts dates and timestamps from 2000.01.01. Integer temporal
//! types reserve the minimum value for null and the maximum for infinity;
//! datetimes use NaN for null. Every conversion here returns `None` for
//! null, infinite, or out-of-range input.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::native::{Date, Timestamp};
use crate::vector::Vector;

/// Null for 32-bit temporal types (`0Nd`, `0Nm`, ...).
pub const NULL_INT: i32 = i32::MIN;
/// Infinity for 32-bit temporal types.
pub const INF_INT: i32 = i32::MAX;
/// Null for 64-bit temporal types (`0Np`, `0Nn`).
pub const NULL_LONG: i64 = i64::MIN;
/// Infinity for 64-bit temporal types.
pub const INF_LONG: i64 = i64::MAX;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default()
}

fn epoch_datetime() -> NaiveDateTime {
    epoch().and_hms_opt(0, 0, 0).unwrap_or_default()
}

fn finite_int(v: i32) -> Option<i64> {
    (v != NULL_INT && v != INF_INT && v != -INF_INT).then_some(i64::from(v))
}

fn finite_long(v: i64) -> Option<i64> {
    (v != NULL_LONG && v != INF_LONG && v != -INF_LONG).then_some(v)
}

/// Calendar date of a date payload (days since 2000.01.01).
pub fn date(days: i32) -> Option<NaiveDate> {
    epoch().checked_add_signed(Duration::days(finite_int(days)?))
}

/// Date payload of a calendar date.
pub fn from_date(date: NaiveDate) -> Option<i32> {
    i32::try_from(date.signed_duration_since(epoch()).num_days()).ok()
}

/// Date payload as a `yyyymmdd` integer, e.g. `20160101`.
pub fn date_to_yyyymmdd(days: i32) -> Option<i32> {
    use chrono::Datelike;
    let d = date(days)?;
    Some(d.year() * 10_000 + d.month() as i32 * 100 + d.day() as i32)
}

/// Date and time of a timestamp payload (nanoseconds since 2000.01.01).
pub fn timestamp(nanos: i64) -> Option<NaiveDateTime> {
    epoch_datetime().checked_add_signed(Duration::nanoseconds(finite_long(nanos)?))
}

/// Timestamp payload of a date and time.
pub fn from_timestamp(ts: NaiveDateTime) -> Option<i64> {
    ts.signed_duration_since(epoch_datetime()).num_nanoseconds()
}

/// Year and month (1-based) of a month payload (months since 2000.01).
pub fn month(months: i32) -> Option<(i32, u32)> {
    let m = finite_int(months)?;
    let year = 2000 + m.div_euclid(12);
    let month = m.rem_euclid(12) as u32 + 1;
    Some((i32::try_from(year).ok()?, month))
}

/// Month payload of a year and 1-based month.
pub fn from_month(year: i32, month: u32) -> Option<i32> {
    if !(1..=12).contains(&month) {
        return None;
    }
    year.checked_sub(2000)?.checked_mul(12)?.checked_add(month as i32 - 1)
}

/// Date and time of a datetime payload (fractional days since 2000.01.01).
pub fn datetime(days: f64) -> Option<NaiveDateTime> {
    if !days.is_finite() || days.abs() > 1.0e8 {
        return None;
    }
    let millis = (days * MILLIS_PER_DAY).round() as i64;
    epoch_datetime().checked_add_signed(Duration::milliseconds(millis))
}

/// Datetime payload of a date and time, at millisecond precision.
pub fn from_datetime(dt: NaiveDateTime) -> f64 {
    dt.signed_duration_since(epoch_datetime()).num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// Duration of a timespan payload (nanoseconds).
pub fn timespan(nanos: i64) -> Option<Duration> {
    Some(Duration::nanoseconds(finite_long(nanos)?))
}

/// Duration of a minute payload.
pub fn minute(minutes: i32) -> Option<Duration> {
    Some(Duration::minutes(finite_int(minutes)?))
}

/// Duration of a second payload.
pub fn second(seconds: i32) -> Option<Duration> {
    Some(Duration::seconds(finite_int(seconds)?))
}

/// Time since midnight of a time payload (milliseconds).
pub fn time(millis: i32) -> Option<Duration> {
    Some(Duration::milliseconds(finite_int(millis)?))
}

impl Vector<Date> {
    /// Elements as calendar dates; nulls become `None`.
    pub fn dates(&self) -> impl DoubleEndedIterator<Item = Option<NaiveDate>> + '_ {
        self.iter().map(|&d| date(d))
    }
}

impl Vector<Timestamp> {
    /// Elements as dates and times; nulls become `None`.
    pub fn datetimes(&self) -> impl DoubleEndedIterator<Item = Option<NaiveDateTime>> + '_ {
        self.iter().map(|&ns| timestamp(ns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::value::Value;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_dates() {
        assert_eq!(date(0), Some(ymd(2000, 1, 1)));
        assert_eq!(date(5844), Some(ymd(2016, 1, 1)));
        assert_eq!(date(-1), Some(ymd(1999, 12, 31)));
        assert_eq!(date(NULL_INT), None);
        assert_eq!(date(INF_INT), None);
        assert_eq!(from_date(ymd(2016, 1, 1)), Some(5844));
    }

    #[test]
    fn test_yyyymmdd() {
        assert_eq!(date_to_yyyymmdd(0), Some(20000101));
        assert_eq!(date_to_yyyymmdd(5844), Some(20160101));
        assert_eq!(date_to_yyyymmdd(NULL_INT), None);
    }

    #[test]
    fn test_timestamps() {
        let ts = ymd(2016, 1, 1).and_hms_opt(10, 0, 0).unwrap();
        let nanos = from_timestamp(ts).unwrap();
        assert_eq!(nanos, 504_957_600_000_000_000);
        assert_eq!(timestamp(nanos), Some(ts));
        assert_eq!(timestamp(NULL_LONG), None);
    }

    #[test]
    fn test_months() {
        assert_eq!(month(0), Some((2000, 1)));
        assert_eq!(month(13), Some((2001, 2)));
        assert_eq!(month(-1), Some((1999, 12)));
        assert_eq!(from_month(2001, 2), Some(13));
        assert_eq!(from_month(2001, 13), None);
        assert_eq!(from_month(i32::MIN, 1), None);
        assert_eq!(from_month(i32::MIN + 1000, 6), None);
        assert_eq!(month(NULL_INT), None);
    }

    #[test]
    fn test_datetime() {
        let dt = datetime(1.5).unwrap();
        assert_eq!(dt, ymd(2000, 1, 2).and_hms_opt(12, 0, 0).unwrap());
        assert_eq!(from_datetime(dt), 1.5);
        assert_eq!(datetime(f64::NAN), None);
        assert_eq!(datetime(f64::INFINITY), None);
    }

    #[test]
    fn test_durations() {
        assert_eq!(timespan(1_000_000_000), Some(Duration::seconds(1)));
        assert_eq!(minute(90), Some(Duration::minutes(90)));
        assert_eq!(second(61), Some(Duration::seconds(61)));
        assert_eq!(time(45_296_789), Some(Duration::milliseconds(45_296_789)));
        assert_eq!(time(NULL_INT), None);
    }

    #[test]
    fn test_vector_helpers() {
        let v = Value::from(Block::vector::<Date>(vec![0, NULL_INT]));
        let dates: Vec<_> = v.as_vector::<Date>().unwrap().dates().collect();
        assert_eq!(dates, vec![Some(ymd(2000, 1, 1)), None]);

        let v = Value::from(Block::vector::<Timestamp>(vec![0]));
        let ts: Vec<_> = v.as_vector::<Timestamp>().unwrap().datetimes().collect();
        assert_eq!(ts, vec![Some(epoch_datetime())]);
    }
}
