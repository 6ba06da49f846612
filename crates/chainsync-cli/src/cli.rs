use camino::Utf8PathBuf;
use chainsync_core::MalformedPolicy;
use clap::{ArgAction, Args, Parser, Subcommand};

pub const CHAINSYNC_BEFORE_HELP: &str = concat!(
    "chainsync ",
    env!("CARGO_PKG_VERSION"),
    " – keep job chain XML files in step with the job store\n\n",
    "  sync             Reconcile a scheduler's live folder with its store rows.\n",
    "  rename           Rename a job chain in the store and move its file.\n",
    "  remove           Delete a job chain from the store and its file.\n",
    "  path             Print where a scheduler or job chain lives on disk.\n",
);

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    disable_help_subcommand = true,
    before_help = CHAINSYNC_BEFORE_HELP
)]
pub struct ChainsyncCli {
    #[arg(
        long,
        value_name = "DIR",
        help = "Live folder root (overrides CHAINSYNC_LIVE_FOLDER)",
        global = true
    )]
    pub live_folder: Option<Utf8PathBuf>,
    #[arg(
        long,
        value_name = "FILE",
        help = "Job store file (overrides CHAINSYNC_STORE)",
        global = true
    )]
    pub store: Option<Utf8PathBuf>,
    #[arg(
        long,
        value_name = "POLICY",
        help = "What to do with undecodable files: abort or skip (overrides CHAINSYNC_ON_MALFORMED)",
        global = true
    )]
    pub on_malformed: Option<MalformedPolicy>,
    #[arg(short, long, help = "Suppress human output (errors still print to stderr)", global = true)]
    pub quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)", global = true)]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(long, help = "Emit {status,message,details} JSON envelopes", global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: CommandCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandCli {
    #[command(
        about = "Write missing files for store rows and import orphan files into the store.",
        override_usage = "chainsync sync <SCHEDULER>"
    )]
    Sync(SyncArgs),
    #[command(
        about = "Rename a job chain; its file moves with it.",
        override_usage = "chainsync rename <SCHEDULER> <FROM> <TO>"
    )]
    Rename(RenameArgs),
    #[command(
        about = "Delete a job chain and its file.",
        override_usage = "chainsync remove <SCHEDULER> <NAME>"
    )]
    Remove(RemoveArgs),
    #[command(
        about = "Print the canonical path of a scheduler scope or job chain.",
        override_usage = "chainsync path <SCHEDULER> [NAME]"
    )]
    Path(PathArgs),
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    #[arg(value_name = "SCHEDULER")]
    pub scheduler: String,
}

#[derive(Args, Debug)]
pub struct RenameArgs {
    #[arg(value_name = "SCHEDULER")]
    pub scheduler: String,
    #[arg(value_name = "FROM")]
    pub from: String,
    #[arg(value_name = "TO")]
    pub to: String,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    #[arg(value_name = "SCHEDULER")]
    pub scheduler: String,
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[derive(Args, Debug)]
pub struct PathArgs {
    #[arg(value_name = "SCHEDULER")]
    pub scheduler: String,
    #[arg(value_name = "NAME")]
    pub name: Option<String>,
}
