use super::{gate, load_config, summarize, Flags};
use anyhow::Context;
use clap::Subcommand;
use roster_core::directory::DirectoryClient;
use roster_core::executor::Executor;
use roster_core::gate::{GateState, StdinPrompt};
use roster_core::identity::linked_contacts;
use roster_core::title_file;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum TitlesFileSubcommand {
    /// Write the directory's titles to a file for editing
    Read {
        #[arg(long, short = 'f', default_value = "titles.json")]
        file: PathBuf,
    },
    /// Write edited titles from the file back to the directory
    Set {
        #[arg(long, short = 'f', default_value = "titles.json")]
        file: PathBuf,
    },
}

pub fn run(root: &Path, flags: Flags, subcmd: TitlesFileSubcommand) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let title_field = &config.directory.fields.title;
    if title_field.is_empty() {
        anyhow::bail!("directory.fields.title must name the custom field holding titles");
    }
    let directory = DirectoryClient::new(&config.directory);
    let contacts = directory
        .contacts()
        .context("failed to load directory contacts")?;
    let linked = linked_contacts(&contacts, &config.directory);
    let current = title_file::entries(&linked, title_field);

    match subcmd {
        TitlesFileSubcommand::Read { file } => {
            title_file::save(&file, &current)
                .with_context(|| format!("failed to write {}", file.display()))?;
            println!(
                "Wrote {} titled contact(s) to {}. Edit it, then run `roster titles-file set`.",
                current.len(),
                file.display()
            );
        }
        TitlesFileSubcommand::Set { file } => {
            let edited = title_file::load(&file)?;
            let actions = title_file::plan_set(&edited, &current, title_field);
            let mut prompt = StdinPrompt;
            let mut gate = gate(flags, &config, &mut prompt);
            let mut executor =
                Executor::new(&config.pause).with_directory(&directory, &config.directory.fields.chat);
            let outcome = gate.run(&actions, &mut executor)?;
            summarize(&outcome, actions.len());
            if outcome.state == GateState::Applied {
                println!("Directory updated. Run `roster titles` to copy the titles to chat.");
            }
        }
    }
    Ok(())
}
