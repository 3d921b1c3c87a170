//! Audit stamps and the business timezone
//!
//! Bank files carry local calendar dates (generation date, due dates), so the
//! system keeps a configurable business timezone next to the UTC audit
//! timestamps recorded on every entity.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// Timezone wrapper for the collection business calendar
///
/// Wraps chrono_tz::Tz with custom serialization support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for Timezone {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tz::from_str(s)
            .map(Timezone)
            .map_err(|_| TemporalError::InvalidTimezone(s.to_string()))
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Returns the calendar date of `instant` in this timezone
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.0).date_naive()
    }

    /// Returns today's calendar date in this timezone
    pub fn today(&self) -> NaiveDate {
        self.local_date(Utc::now())
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::America::Sao_Paulo)
    }
}

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

/// Who created and last touched an entity, and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamp {
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

impl AuditStamp {
    /// Stamps a newly created entity
    pub fn created_by(actor: impl Into<String>) -> Self {
        let actor = actor.into();
        let now = Utc::now();
        Self {
            created_at: now,
            created_by: actor.clone(),
            updated_at: now,
            updated_by: actor,
        }
    }

    /// Records a modification
    pub fn touch(&mut self, actor: impl Into<String>) {
        self.updated_at = Utc::now();
        self.updated_by = actor.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_local_date_crosses_midnight() {
        // 02:00 UTC is still the previous day in Sao Paulo (UTC-3)
        let instant = Utc.with_ymd_and_hms(2025, 3, 10, 2, 0, 0).unwrap();
        let tz = Timezone::default();
        assert_eq!(tz.local_date(instant), NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
    }

    #[test]
    fn test_timezone_parse() {
        let tz: Timezone = "America/Sao_Paulo".parse().unwrap();
        assert_eq!(tz, Timezone::default());
        assert!("Nowhere/City".parse::<Timezone>().is_err());
    }

    #[test]
    fn test_audit_touch_keeps_creation() {
        let mut stamp = AuditStamp::created_by("alice");
        let created_at = stamp.created_at;
        stamp.touch("bob");
        assert_eq!(stamp.created_by, "alice");
        assert_eq!(stamp.updated_by, "bob");
        assert_eq!(stamp.created_at, created_at);
        assert!(stamp.updated_at >= created_at);
    }
}
