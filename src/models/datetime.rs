//! Timestamp field type used by generated entities.
//!
//! `NormalDatetime` is what stamp columns are declared as. Its zero value is
//! `0001-01-01 00:00:00`, which is what an entity field holds before anything
//! assigns it; stamp exclusion keys off [`NormalDatetime::is_zero`].

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Text form used for JSON and display.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ZERO_DATE: NaiveDate = match NaiveDate::from_ymd_opt(1, 1, 1) {
    Some(date) => date,
    None => panic!("0001-01-01 is a valid date"),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalDatetime(NaiveDateTime);

impl NormalDatetime {
    pub const ZERO: NormalDatetime = NormalDatetime(NaiveDateTime::new(ZERO_DATE, NaiveTime::MIN));

    pub fn new(value: NaiveDateTime) -> Self {
        Self(value)
    }

    /// Current local time truncated to whole seconds (DATETIME precision).
    pub fn now() -> Self {
        Self(Local::now().naive_local().trunc_subsecs(0))
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn as_naive(&self) -> &NaiveDateTime {
        &self.0
    }

    pub fn into_naive(self) -> NaiveDateTime {
        self.0
    }

    /// Parse from `YYYY-MM-DD HH:MM:SS`. An empty string is the zero value.
    pub fn parse(text: &str) -> Result<Self, chrono::ParseError> {
        if text.is_empty() {
            return Ok(Self::ZERO);
        }
        NaiveDateTime::parse_from_str(text, DATETIME_FORMAT).map(Self)
    }
}

impl Default for NormalDatetime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<NaiveDateTime> for NormalDatetime {
    fn from(value: NaiveDateTime) -> Self {
        Self(value)
    }
}

impl fmt::Display for NormalDatetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATETIME_FORMAT))
    }
}

impl Serialize for NormalDatetime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NormalDatetime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zero() {
        let dt = NormalDatetime::default();
        assert!(dt.is_zero());
        assert_eq!(dt.to_string(), "0001-01-01 00:00:00");
    }

    #[test]
    fn test_now_is_not_zero() {
        let now = NormalDatetime::now();
        assert!(!now.is_zero());
        assert_eq!(now.as_naive().and_utc().timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_json_format() {
        let dt = NormalDatetime::parse("2023-05-06 07:08:09").unwrap();
        assert_eq!(
            serde_json::to_string(&dt).unwrap(),
            "\"2023-05-06 07:08:09\""
        );
        let back: NormalDatetime = serde_json::from_str("\"2023-05-06 07:08:09\"").unwrap();
        assert_eq!(back, dt);
    }

    #[test]
    fn test_empty_string_parses_to_zero() {
        let dt: NormalDatetime = serde_json::from_str("\"\"").unwrap();
        assert!(dt.is_zero());
    }

    #[test]
    fn test_invalid_text_rejected() {
        assert!(NormalDatetime::parse("yesterday").is_err());
    }
}
