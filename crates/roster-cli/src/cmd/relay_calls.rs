use super::{load_config, Flags};
use anyhow::Context;
use roster_core::calls::CallRelay;
use roster_core::chat::ChatClient;
use std::path::Path;

pub fn run(root: &Path, flags: Flags) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let calls = config.calls()?;
    // Deleting the emailed originals needs a person's token.
    let reader = ChatClient::user(&config.chat).context("removing call emails acts as a person")?;
    let poster = ChatClient::bot(&config.chat);

    let relay = CallRelay {
        reader: &reader,
        poster: &poster,
        cfg: calls,
    };
    let live = flags.mode().is_live();
    let relayed = relay.run(live)?;
    if live {
        println!("Relayed {} call(s).", relayed.len());
    } else {
        println!("{} call(s) to relay. Run with --live to post them.", relayed.len());
    }
    Ok(())
}
