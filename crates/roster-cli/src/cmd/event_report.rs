use super::load_config;
use anyhow::Context;
use chrono::Local;
use roster_core::directory::DirectoryClient;
use roster_core::io::atomic_write;
use roster_core::reports;
use std::path::Path;

pub fn run(root: &Path, name: &str, output: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let Some(events) = config.event_reports.reports.get(name) else {
        let known: Vec<&str> = config.event_reports.reports.keys().map(String::as_str).collect();
        anyhow::bail!(
            "event report '{name}' not found (available: {})",
            known.join(", ")
        );
    };

    let template = match &config.event_reports.template {
        Some(path) => {
            let path = root.join(path);
            std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read template {}", path.display()))?
        }
        None => reports::DEFAULT_EVENT_TEMPLATE.to_string(),
    };

    let directory = DirectoryClient::new(&config.directory);
    let mut rows = Vec::with_capacity(events.len());
    for id in events {
        let event = directory
            .event(*id)
            .with_context(|| format!("failed to load event {id}"))?;
        let tickets = directory
            .tickets(*id)
            .with_context(|| format!("failed to load tickets for event {id}"))?;
        rows.push(reports::event_row(&event, &tickets));
    }

    let generated = Local::now().format("%Y-%m-%d %H:%M").to_string();
    let html = reports::render_event_report(&template, &rows.join("\n"), &generated);
    match output {
        Some(path) => {
            atomic_write(path, html.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => println!("{html}"),
    }
    Ok(())
}
