use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirySource {
    Manual,
    Recognized,
    Unresolved,
}

/// Final expiry decision for one upload, with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedExpiry {
    pub date: Option<NaiveDate>,
    pub source: ExpirySource,
    pub display_status: String,
}

impl ResolvedExpiry {
    pub fn manual(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            source: ExpirySource::Manual,
            display_status: format!("Manually specified: {}", date.format("%d.%m.%Y")),
        }
    }

    pub fn recognized(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            source: ExpirySource::Recognized,
            display_status: format!("Recognized from photo: {}", date.format("%d.%m.%Y")),
        }
    }

    pub fn unresolved() -> Self {
        Self {
            date: None,
            source: ExpirySource::Unresolved,
            display_status: "Could not find a date on the photo".to_string(),
        }
    }
}
