use super::{load_config, Flags};
use anyhow::Context;
use roster_core::chat::ChatClient;
use roster_core::files::Downloader;
use roster_core::ledger::Ledger;
use roster_core::paths;
use std::path::Path;

pub fn run(root: &Path, flags: Flags, channel: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let channel = channel
        .map(str::to_string)
        .or_else(|| config.downloads.channel.clone())
        .context("no channel given and downloads.channel is not set")?;

    let chat = ChatClient::bot(&config.chat);
    let me = chat.auth_test().context("failed to identify the bot user")?;
    let downloader = Downloader {
        chat: &chat,
        channel,
        dir: paths::download_dir(root, config.downloads.dir.as_deref()),
        marker: config.downloads.marker.clone(),
        me: me.user_id,
    };

    let mut ledger = Ledger::load(&paths::ledger_path(root))?;
    let live = flags.mode().is_live();
    let written = downloader.run(&mut ledger, live)?;
    if ledger.is_dirty() {
        ledger.save().context("failed to save ledger")?;
    }
    if live {
        println!("Downloaded {} file(s) to {}", written.len(), downloader.dir.display());
    } else {
        println!("{} file(s) to download. Run with --live to fetch them.", written.len());
    }
    Ok(())
}
