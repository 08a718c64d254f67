use duet_core::{derive_conversation_id, ConversationId};
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct ConversationIdItem {
    pub conversation_id: String,
    pub participants: [String; 2],
}

pub fn conversation_id_item(id: &ConversationId, a: &str, b: &str) -> ConversationIdItem {
    ConversationIdItem {
        conversation_id: id.to_string(),
        participants: [a.trim().to_string(), b.trim().to_string()],
    }
}

pub fn run_conversation_id(a: &str, b: &str, as_json: bool) -> Result<(), CliError> {
    let id = derive_conversation_id(a.trim(), b.trim())?;

    if as_json {
        let item = conversation_id_item(&id, a, b);
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        println!("{id}");
    }

    Ok(())
}
