use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Entity;

/// What a schedule event does when it fires: show content or blank the
/// screen entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScheduleAction {
    #[serde(rename_all = "camelCase")]
    Play { content_id: String },
    TurnOff,
}

/// A calendar entry within a schedule. `recurrence` is an iCalendar RRULE
/// string interpreted by the server; the cache treats it as opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEvent {
    #[serde(rename = "startsAt")]
    pub starts_at: DateTime<Utc>,
    #[serde(rename = "endsAt")]
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub recurrence: Option<String>,
    pub action: ScheduleAction,
}

/// A named set of calendar events assignable to screens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub events: Vec<ScheduleEvent>,
}

impl Entity for Schedule {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_round_trips_through_tagged_json() {
        let play: ScheduleAction =
            serde_json::from_str(r#"{"type":"play","contentId":"PL-7"}"#).unwrap();
        assert_eq!(
            play,
            ScheduleAction::Play {
                content_id: "PL-7".to_string()
            }
        );

        let off: ScheduleAction = serde_json::from_str(r#"{"type":"turnOff"}"#).unwrap();
        assert_eq!(off, ScheduleAction::TurnOff);
    }

    #[test]
    fn schedule_defaults_to_no_events() {
        let schedule: Schedule =
            serde_json::from_str(r#"{"id":"SC1","name":"Weekdays"}"#).unwrap();
        assert!(schedule.events.is_empty());
    }
}
