use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Three-letter timing-screen abbreviation (VER, HAM, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DriverCode(String);

impl DriverCode {
    pub fn new(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let len = trimmed.chars().count();
        if !(2..=4).contains(&len) || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::InvalidDriverCode(raw.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DriverCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DriverCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DriverCode::new(s)
    }
}

impl TryFrom<String> for DriverCode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        DriverCode::new(&value)
    }
}

impl From<DriverCode> for String {
    fn from(code: DriverCode) -> Self {
        code.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compound {
    Soft,
    Medium,
    Hard,
    Intermediate,
    Wet,
}

impl Compound {
    /// Lenient parse of provider compound labels; unknown labels yield None
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SOFT" | "S" => Some(Compound::Soft),
            "MEDIUM" | "M" => Some(Compound::Medium),
            "HARD" | "H" => Some(Compound::Hard),
            "INTERMEDIATE" | "INTER" | "I" => Some(Compound::Intermediate),
            "WET" | "W" => Some(Compound::Wet),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Compound::Soft => "soft",
            Compound::Medium => "medium",
            Compound::Hard => "hard",
            Compound::Intermediate => "intermediate",
            Compound::Wet => "wet",
        }
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One driver's lap as every provider adapter must emit it.
///
/// Missing values are `None`, never zero or another sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub driver: DriverCode,
    pub lap_number: u32,
    pub lap_time_ms: Option<u32>,
    pub sector_times_ms: [Option<u32>; 3],
    pub compound: Option<Compound>,
    pub position: Option<u32>,
    pub is_personal_best: bool,
    pub timestamp: Option<DateTime<Utc>>,
}

impl NormalizedRecord {
    pub fn new(driver: DriverCode, lap_number: u32) -> Self {
        Self {
            driver,
            lap_number,
            lap_time_ms: None,
            sector_times_ms: [None; 3],
            compound: None,
            position: None,
            is_personal_best: false,
            timestamp: None,
        }
    }

    /// Sort key used for canonical ordering (driver-major, lap-minor)
    pub fn order_key(&self) -> (&DriverCode, u32) {
        (&self.driver, self.lap_number)
    }
}

/// Convert provider seconds to whole milliseconds.
///
/// Rejects negative and non-finite values so a broken upstream never
/// turns into a plausible lap time.
pub fn seconds_to_ms(seconds: f64) -> std::result::Result<u32, String> {
    if !seconds.is_finite() {
        return Err(format!("non-finite duration {}", seconds));
    }
    if seconds < 0.0 {
        return Err(format!("negative duration {}", seconds));
    }
    let ms = (seconds * 1000.0).round();
    if ms > u32::MAX as f64 {
        return Err(format!("duration out of range {}", seconds));
    }
    Ok(ms as u32)
}

/// Entry on a session's driver list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverInfo {
    pub code: DriverCode,
    pub number: Option<u32>,
    pub name: Option<String>,
    pub team: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_code_normalizes_case() {
        assert_eq!(DriverCode::new("ver").unwrap().as_str(), "VER");
        assert_eq!(DriverCode::new(" HAM ").unwrap().as_str(), "HAM");
        assert!(DriverCode::new("V").is_err());
        assert!(DriverCode::new("VER1").is_err());
        assert!(DriverCode::new("").is_err());
    }

    #[test]
    fn test_driver_code_serde() {
        let code: DriverCode = serde_json::from_str("\"lec\"").unwrap();
        assert_eq!(code.as_str(), "LEC");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"LEC\"");
        assert!(serde_json::from_str::<DriverCode>("\"12\"").is_err());
    }

    #[test]
    fn test_compound_parse() {
        assert_eq!(Compound::parse("SOFT"), Some(Compound::Soft));
        assert_eq!(Compound::parse("intermediate"), Some(Compound::Intermediate));
        assert_eq!(Compound::parse("UNKNOWN"), None);
        assert_eq!(Compound::parse("TEST_UNKNOWN"), None);
    }

    #[test]
    fn test_seconds_to_ms() {
        assert_eq!(seconds_to_ms(83.456), Ok(83456));
        assert_eq!(seconds_to_ms(0.0), Ok(0));
        assert!(seconds_to_ms(-1.0).is_err());
        assert!(seconds_to_ms(f64::NAN).is_err());
        assert!(seconds_to_ms(f64::INFINITY).is_err());
    }
}
