//! Day grouping of an ordered message view.

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::models::Message;

/// Consecutive messages that fall on one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayGroup {
    pub day: NaiveDate,
    /// e.g. "Monday, March 4, 2024"
    pub label: String,
    pub messages: Vec<Message>,
}

/// Group `messages` by calendar day in the local time zone.
#[must_use]
pub fn group_by_day(messages: &[Message]) -> Vec<DayGroup> {
    group_by_day_in(messages, &Local)
}

/// Group `messages` by calendar day in `tz`.
///
/// A new group starts whenever a message's day differs from the one before
/// it. Pending messages use their local submission time. The result depends
/// on `messages` and `tz` only.
#[must_use]
pub fn group_by_day_in<Tz: TimeZone>(messages: &[Message], tz: &Tz) -> Vec<DayGroup> {
    let mut groups: Vec<DayGroup> = Vec::new();
    for message in messages {
        let day = calendar_day(message.created_at.display_millis(), tz);
        match groups.last_mut() {
            Some(group) if group.day == day => group.messages.push(message.clone()),
            _ => groups.push(DayGroup {
                day,
                label: day_label(day),
                messages: vec![message.clone()],
            }),
        }
    }
    groups
}

fn calendar_day<Tz: TimeZone>(millis: i64, tz: &Tz) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .with_timezone(tz)
        .date_naive()
}

fn day_label(day: NaiveDate) -> String {
    day.format("%A, %B %-d, %Y").to_string()
}
