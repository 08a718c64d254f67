use std::sync::Arc;
use std::time::Duration;

use duet_core::state::ConnectionState;
use duet_core::store::InMemoryStore;
use duet_core::unread::ViewportMetrics;
use duet_core::{ChatClient, ChatConfig, ClientUpdate, Participant, ParticipantId, Session};
use serde::Serialize;
use tokio::time::timeout;

use crate::commands::common::{day_group_to_item, format_transcript_lines, DayGroupItem};
use crate::error::CliError;

const UPDATE_TIMEOUT: Duration = Duration::from_secs(10);

const SCRIPT: [&str; 6] = [
    "hey, are you around?",
    "yep, just got back",
    "did you see the new build?",
    "not yet, sending it over?",
    "check your inbox",
    "got it, thanks!",
];

#[derive(Debug, Serialize)]
pub struct DemoReport {
    pub conversation_id: String,
    pub transcript: Vec<DayGroupItem>,
    /// Alice's counter while she was scrolled away from the tail
    pub unread_while_scrolled_up: u32,
    pub unread_after_return: u32,
    pub reaction: Option<String>,
    pub connection_state: Option<ConnectionState>,
    #[serde(skip)]
    pub lines: Vec<String>,
}

type DemoClient = ChatClient<InMemoryStore>;

fn client_for(
    store: &Arc<InMemoryStore>,
    id: &str,
    name: &str,
    config: &ChatConfig,
) -> Result<DemoClient, CliError> {
    let session = Session::signed_in(Participant::new(ParticipantId::new(id)?, name));
    Ok(ChatClient::new(Arc::clone(store), session, config.clone()))
}

/// Wait until `client` replaces its view, skipping other updates.
async fn wait_for_view(client: &mut DemoClient, who: &str) -> Result<ClientUpdate, CliError> {
    loop {
        match timeout(UPDATE_TIMEOUT, client.next_update()).await {
            Err(_) => return Err(CliError::Timeout(format!("{who}'s view"))),
            Ok(None) => return Err(CliError::QueueClosed(who.to_string())),
            Ok(Some(update @ ClientUpdate::ViewReplaced { .. })) => return Ok(update),
            Ok(Some(other)) => tracing::debug!(?other, who, "Skipping update"),
        }
    }
}

async fn settle(alice: &mut DemoClient, bob: &mut DemoClient) -> Result<(), CliError> {
    wait_for_view(alice, "alice").await?;
    wait_for_view(bob, "bob").await?;
    Ok(())
}

/// Run the scripted session and collect what Alice ends up seeing.
pub async fn build_demo_report(
    config: ChatConfig,
    message_count: usize,
) -> Result<DemoReport, CliError> {
    if message_count == 0 {
        return Err(CliError::EmptyScript);
    }

    let store = Arc::new(InMemoryStore::new());
    let mut alice = client_for(&store, "alice", "Alice", &config)?;
    let mut bob = client_for(&store, "bob", "Bob", &config)?;

    let conversation_id = alice.open_conversation(&ParticipantId::new("bob")?)?;
    bob.open_conversation(&ParticipantId::new("alice")?)?;
    settle(&mut alice, &mut bob).await?;

    alice.on_viewport(ViewportMetrics {
        offset: 0.0,
        max_offset: 480.0,
    });

    for (index, body) in SCRIPT.iter().cycle().take(message_count).enumerate() {
        let sender = if index % 2 == 0 { &mut bob } else { &mut alice };
        sender.mark_typing();
        sender.submit(body)?.await?;
        settle(&mut alice, &mut bob).await?;
    }

    if let Some(target) = alice.messages().last().map(|message| message.id) {
        alice.attach_reaction(&target, "❤️")?.await?;
        bob.attach_reaction(&target, "👍")?.await?;
        settle(&mut alice, &mut bob).await?;
        settle(&mut alice, &mut bob).await?;
    }

    store.disconnect_all().await;
    settle(&mut alice, &mut bob).await?;

    let unread_while_scrolled_up = alice.unread_count();
    alice.reached_bottom();

    let groups = alice.day_groups();
    Ok(DemoReport {
        conversation_id: conversation_id.to_string(),
        transcript: groups.iter().map(day_group_to_item).collect(),
        unread_while_scrolled_up,
        unread_after_return: alice.unread_count(),
        reaction: alice
            .messages()
            .last()
            .and_then(|message| message.reaction.clone()),
        connection_state: alice.connection_state(),
        lines: format_transcript_lines(&groups),
    })
}

pub async fn run_demo(
    config: ChatConfig,
    message_count: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let report = build_demo_report(config, message_count).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Conversation {}", report.conversation_id);
    for line in &report.lines {
        println!("{line}");
    }
    println!(
        "Alice unread while scrolled up: {} (after returning: {})",
        report.unread_while_scrolled_up, report.unread_after_return
    );
    let live = report.connection_state.is_some_and(ConnectionState::is_live);
    println!(
        "Live after transport loss: {}",
        if live { "yes" } else { "no" }
    );

    Ok(())
}
