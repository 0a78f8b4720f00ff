use super::{load_config, Flags};
use anyhow::Context;
use roster_core::chat::ChatClient;
use roster_core::document::DocumentAdded;
use roster_core::notify::Notifier;
use std::path::Path;

/// Run from the document store's post-consume hook.
pub fn run(root: &Path, flags: Flags) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let document_cfg = config.document()?;
    let doc = DocumentAdded::from_env().context("document details missing from environment")?;
    let text = doc.message(document_cfg);

    if !flags.mode().is_live() {
        println!("  would post: {text}");
        return Ok(());
    }
    let chat = ChatClient::bot(&config.chat);
    Notifier::new(&chat, &config.chat.notification_channel)
        .as_bot(&document_cfg.username, &document_cfg.icon_emoji)
        .quiet(flags.quiet)
        .post(&text, None)?;
    tracing::info!("announced document {}", doc.id);
    Ok(())
}
