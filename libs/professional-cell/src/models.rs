use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

/// Day of week as stored in the availability grid. Serialized with the
/// capitalized English names the mobile clients send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday() {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Monday" => Ok(Weekday::Monday),
            "Tuesday" => Ok(Weekday::Tuesday),
            "Wednesday" => Ok(Weekday::Wednesday),
            "Thursday" => Ok(Weekday::Thursday),
            "Friday" => Ok(Weekday::Friday),
            "Saturday" => Ok(Weekday::Saturday),
            "Sunday" => Ok(Weekday::Sunday),
            other => Err(format!("Unknown day of week: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Booked,
    Disabled,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Available => "available",
            SlotStatus::Booked => "booked",
            SlotStatus::Disabled => "disabled",
        }
    }
}

/// One row of the availability grid: a recurring weekly time range owned by
/// a professional, addressed by (professional_id, day, start_time, end_time).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub day: Weekday,
    pub start_time: String,
    pub end_time: String,
    pub status: SlotStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Time range as submitted by the client when editing a day's grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_slot_status")]
    pub status: SlotStatus,
}

fn default_slot_status() -> SlotStatus {
    SlotStatus::Available
}

impl TimeSlot {
    /// Parse both endpoints, rejecting malformed or inverted ranges.
    pub fn parse_range(&self) -> Result<(NaiveTime, NaiveTime), ProfessionalError> {
        let start = parse_grid_time(&self.start_time)?;
        let end = parse_grid_time(&self.end_time)?;
        if start >= end {
            return Err(ProfessionalError::Validation(format!(
                "Start time {} must be before end time {}",
                self.start_time, self.end_time
            )));
        }
        Ok((start, end))
    }
}

pub fn parse_grid_time(value: &str) -> Result<NaiveTime, ProfessionalError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| {
            ProfessionalError::Validation(format!("Invalid time of day: {}", value))
        })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Professional {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub phone_number: Option<String>,
    pub profile_image: Option<String>,
    pub qualification: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct EditAvailabilityRequest {
    pub day: Weekday,
    pub time_slots: Vec<TimeSlot>,
}

/// Weekly grid grouped by day for read endpoints.
#[derive(Debug, Serialize)]
pub struct DayAvailability {
    pub day: Weekday,
    pub time_slots: Vec<AvailabilitySlot>,
}

#[derive(Error, Debug)]
pub enum ProfessionalError {
    #[error("Professional not found: {0}")]
    NotFound(String),

    #[error("Slot is not available")]
    SlotNotAvailable,

    #[error("Booked slot not found")]
    SlotNotFound,

    #[error("Overlapping time slots: {0}")]
    OverlappingSlots(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<ProfessionalError> for AppError {
    fn from(err: ProfessionalError) -> Self {
        match err {
            ProfessionalError::NotFound(msg) => AppError::NotFound(msg),
            ProfessionalError::SlotNotAvailable => {
                AppError::Conflict("The selected time slot is not available".to_string())
            }
            ProfessionalError::SlotNotFound => {
                AppError::NotFound("No booked slot matches the session time".to_string())
            }
            ProfessionalError::OverlappingSlots(msg) => AppError::ValidationError(msg),
            ProfessionalError::Validation(msg) => AppError::ValidationError(msg),
            ProfessionalError::Database(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_from_date_matches_calendar() {
        // 2024-01-01 was a Monday.
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(Weekday::from_date(date), Weekday::Monday);

        let date = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert_eq!(Weekday::from_date(date), Weekday::Sunday);
    }

    #[test]
    fn weekday_serializes_as_capitalized_name() {
        let json = serde_json::to_string(&Weekday::Wednesday).unwrap();
        assert_eq!(json, "\"Wednesday\"");

        let day: Weekday = serde_json::from_str("\"Friday\"").unwrap();
        assert_eq!(day, Weekday::Friday);
    }

    #[test]
    fn slot_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SlotStatus::Available).unwrap(),
            "\"available\""
        );
        let status: SlotStatus = serde_json::from_str("\"booked\"").unwrap();
        assert_eq!(status, SlotStatus::Booked);
    }

    #[test]
    fn time_slot_rejects_inverted_range() {
        let slot = TimeSlot {
            start_time: "15:00".to_string(),
            end_time: "14:00".to_string(),
            status: SlotStatus::Available,
        };
        assert!(slot.parse_range().is_err());
    }

    #[test]
    fn time_slot_accepts_seconds_precision() {
        let slot = TimeSlot {
            start_time: "09:00:00".to_string(),
            end_time: "10:00:00".to_string(),
            status: SlotStatus::Available,
        };
        assert!(slot.parse_range().is_ok());
    }
}
