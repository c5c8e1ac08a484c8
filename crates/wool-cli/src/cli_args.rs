use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "wool-cli")]
#[command(about = "Run and check WOOL dialogue scripts")]
pub(crate) struct Cli {
    /// Log more to stderr (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub(crate) verbose: u8,
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    /// Parse every script of a folder and report all errors.
    Validate(ValidateArgs),
    /// Print what a single script reads, writes and references.
    Summary(SummaryArgs),
    Agent(AgentArgs),
    /// Interactive line mode.
    Play(PlayArgs),
}

#[derive(Debug, Args)]
pub(crate) struct ValidateArgs {
    #[arg(long = "scripts-dir")]
    pub(crate) scripts_dir: String,
}

#[derive(Debug, Args)]
pub(crate) struct SummaryArgs {
    #[arg(long = "file")]
    pub(crate) file: String,
}

#[derive(Debug, Args)]
pub(crate) struct AgentArgs {
    #[command(subcommand)]
    pub(crate) command: AgentCommand,
}

#[derive(Debug, Subcommand)]
pub(crate) enum AgentCommand {
    Start(StartArgs),
    Choose(ChooseArgs),
    Input(InputArgs),
}

#[derive(Debug, Clone, Args)]
pub(crate) struct SessionArgs {
    #[arg(long = "scripts-dir")]
    pub(crate) scripts_dir: String,
    #[arg(long = "entry-dialogue")]
    pub(crate) entry_dialogue: Option<String>,
    #[arg(long = "start-node")]
    pub(crate) start_node: Option<String>,
    #[arg(long = "seed")]
    pub(crate) seed: Option<u32>,
    /// Fail on reads of unknown variables instead of reading null.
    #[arg(long = "strict-variables")]
    pub(crate) strict_variables: bool,
    /// Initial variable, `name=value`; the value is JSON or plain text.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub(crate) set: Vec<String>,
}

#[derive(Debug, Args)]
pub(crate) struct StartArgs {
    #[command(flatten)]
    pub(crate) session: SessionArgs,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
}

#[derive(Debug, Args)]
pub(crate) struct ChooseArgs {
    #[arg(long = "state-in")]
    pub(crate) state_in: String,
    #[arg(long = "reply")]
    pub(crate) reply: usize,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
}

#[derive(Debug, Args)]
pub(crate) struct InputArgs {
    #[arg(long = "state-in")]
    pub(crate) state_in: String,
    #[arg(long = "reply")]
    pub(crate) reply: usize,
    /// Answer for one input field, `name=value`.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub(crate) set: Vec<String>,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
}

#[derive(Debug, Args)]
pub(crate) struct PlayArgs {
    #[command(flatten)]
    pub(crate) session: SessionArgs,
    #[arg(long = "state-file")]
    pub(crate) state_file: Option<String>,
}
