//! Mock calendar provider.
//!
//! Offers four free slots (09:00 today, 10:00 tomorrow, 11:00 and 12:00 on
//! the two days after) and two fixed events today. The clock can be pinned
//! so observations replay identically in tests.

use async_trait::async_trait;
use chrono::{Days, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tools::tool::{Tool, parse_params, to_observation};

pub const READ_CALENDAR: &str = "read_calendar";

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const FIRST_SLOT_HOUR: u32 = 9;

const SLOT_COUNT: u32 = 4;

/// A calendar entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub title: String,
    pub time: String,
}

/// Observation returned by `read_calendar`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarResult {
    pub tool: String,
    pub user_id: String,
    /// ISO-8601 local timestamps, earliest first.
    pub available_slots: Vec<String>,
    pub events: Vec<CalendarEvent>,
    pub note: String,
}

/// Deterministic calendar backed by the local clock or a pinned date.
#[derive(Debug, Clone, Default)]
pub struct MockCalendar {
    today: Option<NaiveDate>,
}

impl MockCalendar {
    /// Calendar that reads the local date on every call.
    pub fn new() -> Self {
        Self { today: None }
    }

    /// Calendar pinned to a fixed "today".
    pub fn pinned(today: NaiveDate) -> Self {
        Self { today: Some(today) }
    }

    pub fn read_calendar(&self, user_id: &str, date_hint: Option<&str>) -> CalendarResult {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());

        let available_slots = (0..SLOT_COUNT)
            .filter_map(|i| {
                let day = today.checked_add_days(Days::new(u64::from(i)))?;
                let time = NaiveTime::from_hms_opt(FIRST_SLOT_HOUR + i, 0, 0)?;
                Some(format_iso(day.and_time(time)))
            })
            .collect();

        let events = [("Daily Standup", 10), ("Project Sync", 15)]
            .into_iter()
            .filter_map(|(title, hour)| {
                let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
                Some(CalendarEvent {
                    title: title.to_string(),
                    time: format_iso(today.and_time(time)),
                })
            })
            .collect();

        let note = match date_hint.filter(|h| !h.trim().is_empty()) {
            Some(hint) => format!("Date hint received: {hint}"),
            None => "No date hint".to_string(),
        };

        CalendarResult {
            tool: READ_CALENDAR.to_string(),
            user_id: user_id.to_string(),
            available_slots,
            events,
            note,
        }
    }
}

fn format_iso(at: NaiveDateTime) -> String {
    at.format(ISO_FORMAT).to_string()
}

#[derive(Debug, Deserialize)]
struct ReadCalendarArgs {
    #[serde(default = "default_user_id")]
    user_id: String,
    #[serde(default)]
    date_hint: Option<String>,
}

fn default_user_id() -> String {
    "me".to_string()
}

/// `read_calendar` tool over a [`MockCalendar`].
#[derive(Debug, Clone, Default)]
pub struct ReadCalendarTool {
    calendar: MockCalendar,
}

impl ReadCalendarTool {
    pub fn new(calendar: MockCalendar) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl Tool for ReadCalendarTool {
    fn name(&self) -> &str {
        READ_CALENDAR
    }

    fn description(&self) -> &str {
        "Read the user's calendar: upcoming events and available meeting slots."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "user_id": {
                    "type": "string",
                    "description": "Calendar owner (default: me)"
                },
                "date_hint": {
                    "type": ["string", "null"],
                    "description": "Free-text hint about the wanted date, e.g. 'next available'"
                }
            }
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: ReadCalendarArgs = parse_params(READ_CALENDAR, params)?;
        let result = self
            .calendar
            .read_calendar(&args.user_id, args.date_hint.as_deref());
        to_observation(READ_CALENDAR, &result)
    }
}
