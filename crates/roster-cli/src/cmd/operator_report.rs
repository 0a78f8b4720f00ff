use super::load_config;
use anyhow::Context;
use roster_core::directory::DirectoryClient;
use roster_core::policy::report_groups;
use roster_core::reports::{self, Column};
use std::path::Path;

pub fn run(root: &Path, name: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let directory = DirectoryClient::new(&config.directory);

    let Some(name) = name else {
        let groups = directory.groups().context("failed to load groups")?;
        println!("{}", reports::list_reports(&config.reports, &groups));
        anyhow::bail!("no report name given");
    };

    let ids = report_groups(&config.reports, name)?;
    let mut columns = Vec::with_capacity(ids.len());
    for id in ids {
        let group = directory
            .group(id)
            .with_context(|| format!("failed to load group {id}"))?;
        columns.push(Column::from_group(&group, &config.reports.prefix));
    }
    let contacts = directory
        .contacts()
        .context("failed to load directory contacts")?;
    println!("{}", reports::operator_table(&columns, &contacts));
    Ok(())
}
