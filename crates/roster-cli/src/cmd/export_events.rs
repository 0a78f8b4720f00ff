use super::load_config;
use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use clap::ValueEnum;
use roster_core::calendar::CalendarClient;
use roster_core::directory::{DirectoryClient, EventQuery};
use roster_core::events;
use roster_core::io::atomic_write;
use std::path::Path;

const DIRECTORY_LIMIT: u32 = 30;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Source {
    Directory,
    Calendar,
}

pub fn run(root: &Path, source: Source, output: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let now = Utc::now();
    let exported = match source {
        Source::Directory => {
            let directory = DirectoryClient::new(&config.directory);
            let query = EventQuery {
                limit: Some(DIRECTORY_LIMIT),
                start_at: Some(now.to_rfc3339_opts(SecondsFormat::Secs, true)),
                public_only: true,
            };
            let upcoming = directory.events(&query).context("failed to load events")?;
            events::export_directory(upcoming)
        }
        Source::Calendar => CalendarClient::new(config.calendar()?)
            .upcoming(now)
            .context("failed to load calendar events")?,
    };
    tracing::info!("exporting {} events", exported.len());

    let json = serde_json::to_string_pretty(&exported)?;
    match output {
        Some(path) => atomic_write(path, json.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
