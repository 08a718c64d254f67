use std::fs;
use std::path::Path;

use chrono::{DateTime, Local};
use duet_core::cache::DayGroup;
use duet_core::config::parse_config;
use duet_core::{ChatConfig, Message};
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct MessageItem {
    pub id: String,
    pub sender: String,
    pub body: String,
    pub pending: bool,
    pub time: String,
    pub reaction: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DayGroupItem {
    pub day: String,
    pub label: String,
    pub messages: Vec<MessageItem>,
}

/// Config from `path` when given, otherwise from the environment.
pub fn load_config(path: Option<&Path>) -> Result<ChatConfig, CliError> {
    match path {
        Some(path) => {
            let payload = fs::read_to_string(path)?;
            Ok(parse_config(&payload)?)
        }
        None => Ok(ChatConfig::from_env()?),
    }
}

pub fn format_clock(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis).map_or_else(
        || "--:--".to_string(),
        |time| time.with_timezone(&Local).format("%H:%M").to_string(),
    )
}

pub fn message_to_item(message: &Message) -> MessageItem {
    MessageItem {
        id: message.id.to_string(),
        sender: message.sender_display_name.clone(),
        body: message.body.clone(),
        pending: message.is_pending(),
        time: format_clock(message.created_at.display_millis()),
        reaction: message.reaction.clone(),
    }
}

pub fn day_group_to_item(group: &DayGroup) -> DayGroupItem {
    DayGroupItem {
        day: group.day.to_string(),
        label: group.label.clone(),
        messages: group.messages.iter().map(message_to_item).collect(),
    }
}

pub fn format_message_line(message: &Message) -> String {
    let item = message_to_item(message);
    let mut line = format!("[{}] {}: {}", item.time, item.sender, item.body);
    if item.pending {
        line.push_str(" (sending)");
    }
    if let Some(reaction) = item.reaction {
        line.push_str("  ");
        line.push_str(&reaction);
    }
    line
}

pub fn format_transcript_lines(groups: &[DayGroup]) -> Vec<String> {
    let mut lines = Vec::new();
    for group in groups {
        lines.push(format!("-- {} --", group.label));
        lines.extend(group.messages.iter().map(format_message_line));
    }
    lines
}
