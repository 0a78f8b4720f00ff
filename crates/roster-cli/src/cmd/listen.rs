use super::load_config;
use anyhow::Context;
use roster_core::chat::ChatClient;
use roster_core::listener::{Listener, SocketSource};
use std::path::Path;

/// Runs until a fatal error. Dropped connections are reopened.
pub fn run(root: &Path) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let app = ChatClient::app(&config.chat)?;
    let bot = ChatClient::bot(&config.chat);
    let me = bot.auth_test().context("failed to identify the bot user")?;
    println!("Connected to chat as \"{}\" with ID {}", me.user, me.user_id);

    let listener = Listener::new(&bot, &config);
    loop {
        let mut source = SocketSource::open(&app).context("failed to open the event stream")?;
        let handled = listener.run(&mut source)?;
        tracing::info!("event stream closed after {handled} events, reconnecting");
    }
}
