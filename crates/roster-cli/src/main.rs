mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, export_events::Source, titles_file::TitlesFileSubcommand, Flags};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "roster",
    about = "Keep the member directory, chat workspace and task tracker in step",
    version,
    propagate_version = true
)]
struct Cli {
    /// Directory holding roster.yaml (default: search upward from cwd)
    #[arg(long, global = true, env = "ROSTER_ROOT")]
    root: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Apply changes (without this flag every task is a dry run)
    #[arg(long, global = true)]
    live: bool,

    /// Unattended: with --live, apply without asking
    #[arg(long, global = true)]
    cron: bool,

    /// Don't post notifications to the chat workspace
    #[arg(long, global = true)]
    quiet: bool,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Invite members into the channels their groups map to
    SyncChannels,

    /// Create template tasks on tagged tracker stories
    SyncTasks,

    /// Warn about memberships that are about to expire
    CheckExpiry {
        /// Also place expiring contacts into billing groups
        #[arg(long)]
        billing: bool,
    },

    /// Link directory contacts to chat accounts by email
    LinkAccounts,

    /// Fix the capitalisation of contact names
    CorrectNames,

    /// Set profile status badges from directory groups
    Badges,

    /// Set profile titles from the directory
    Titles,

    /// Edit directory titles in bulk through a JSON file
    TitlesFile {
        #[command(subcommand)]
        subcommand: TitlesFileSubcommand,
    },

    /// Print a table of operators per group
    OperatorReport {
        /// Report name (omit to list reports)
        name: Option<String>,
    },

    /// Render ticket sales for a set of events
    EventReport {
        name: String,

        /// Write the report here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Count memberships active on a date
    MembershipSnapshot {
        /// Date as YYYY-MM-DD
        date: String,
    },

    /// Print upcoming events as JSON
    ExportEvents {
        #[arg(value_enum)]
        source: Source,

        /// Write the events here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Copy a recent event at a fixed interval
    RepeatEvent {
        /// Event id (default: pick from the newest events)
        #[arg(long)]
        event: Option<u64>,

        /// Days between copies
        #[arg(long)]
        every: Option<i64>,

        /// Number of copies
        #[arg(long)]
        count: Option<u32>,
    },

    /// Create prefixed groups
    AddGroups {
        /// Label prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Group names (comma separated values are split)
        names: Vec<String>,
    },

    /// Announce a document added to the document store (reads DOCUMENT_* variables)
    NotifyDocument,

    /// Download files posted in a chat channel
    DownloadFiles {
        /// Channel id (default: downloads.channel)
        channel: Option<String>,
    },

    /// Dump every file in the chat workspace as JSON
    ListFiles {
        /// Write the listing here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Delete join notices, orphaned replies and, after review, old messages
    PurgeChannel {
        /// Channel id (default: purge.channel)
        channel: Option<String>,
    },

    /// Turn phone-system emails into call messages
    RelayCalls,

    /// Listen to the chat event stream
    Listen,

    /// Validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let flags = Flags {
        live: cli.live,
        cron: cli.cron,
        quiet: cli.quiet,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::SyncChannels => cmd::sync_channels::run(&root, flags),
        Commands::SyncTasks => cmd::sync_tasks::run(&root, flags),
        Commands::CheckExpiry { billing } => cmd::check_expiry::run(&root, flags, billing),
        Commands::LinkAccounts => cmd::link_accounts::run(&root, flags),
        Commands::CorrectNames => cmd::correct_names::run(&root, flags),
        Commands::Badges => cmd::badges::run(&root, flags),
        Commands::Titles => cmd::titles::run(&root, flags),
        Commands::TitlesFile { subcommand } => cmd::titles_file::run(&root, flags, subcommand),
        Commands::OperatorReport { name } => cmd::operator_report::run(&root, name.as_deref()),
        Commands::EventReport { name, output } => {
            cmd::event_report::run(&root, &name, output.as_deref())
        }
        Commands::MembershipSnapshot { date } => {
            cmd::membership_snapshot::run(&root, &date, flags)
        }
        Commands::ExportEvents { source, output } => {
            cmd::export_events::run(&root, source, output.as_deref())
        }
        Commands::RepeatEvent {
            event,
            every,
            count,
        } => cmd::repeat_event::run(&root, flags, event, every, count),
        Commands::AddGroups { prefix, names } => {
            cmd::add_groups::run(&root, flags, prefix.as_deref(), &names)
        }
        Commands::NotifyDocument => cmd::notify_document::run(&root, flags),
        Commands::DownloadFiles { channel } => {
            cmd::download_files::run(&root, flags, channel.as_deref())
        }
        Commands::ListFiles { output } => cmd::list_files::run(&root, output.as_deref()),
        Commands::PurgeChannel { channel } => {
            cmd::purge_channel::run(&root, flags, channel.as_deref())
        }
        Commands::RelayCalls => cmd::relay_calls::run(&root, flags),
        Commands::Listen => cmd::listen::run(&root),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, flags),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
