use super::load_config;
use anyhow::Context;
use roster_core::chat::ChatClient;
use roster_core::io::atomic_write;
use std::path::Path;

pub fn run(root: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let chat = ChatClient::bot(&config.chat);
    let files = chat.files().context("failed to list chat files")?;
    tracing::info!("listed {} files", files.len());

    let json = serde_json::to_string_pretty(&files)?;
    match output {
        Some(path) => atomic_write(path, json.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
