use super::{load_config, Flags};
use crate::output::{print_json, print_table};
use anyhow::Context;
use chrono::NaiveDate;
use roster_core::directory::DirectoryClient;
use roster_core::snapshot;
use std::path::Path;

pub fn run(root: &Path, date: &str, flags: Flags) -> anyhow::Result<()> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("'{date}' is not a YYYY-MM-DD date"))?;
    let config = load_config(root)?;
    let directory = DirectoryClient::new(&config.directory);
    let memberships = directory
        .memberships()
        .context("failed to load memberships")?;

    let snap = snapshot::take(&memberships, date);
    if flags.json {
        return print_json(&snap);
    }
    let rows = snap
        .by_level
        .iter()
        .map(|(level, count)| vec![level.clone(), count.to_string()])
        .collect();
    print_table(&["Level", "Members"], rows);
    println!("Total: {}", snap.total);
    Ok(())
}
