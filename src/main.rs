use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use sandctl::request::SandboxAction;

mod cmd;

#[derive(Parser)]
#[command(name = "sandctl")]
#[command(
    version,
    about = "Track and resume long-running sandbox provisioning jobs",
    long_about = "Track and resume long-running sandbox provisioning jobs.\n\n\
        Lifecycle notifications are read from stdin as JSON lines delivered by \
        the provisioning driver; sandctl turns them into a staged progress view \
        and a durable resume checkpoint."
)]
pub struct Cli {
    /// Emit the final response as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Override the tool configuration directory
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct ProvisionArgs {
    /// Sandbox name; generated when omitted on create
    #[arg(short, long)]
    pub name: Option<String>,

    /// TOML definition file with sandbox settings
    #[arg(short = 'f', long)]
    pub definition_file: Option<PathBuf>,

    /// Sandbox license type (Developer, Partial, Full)
    #[arg(short, long)]
    pub license_type: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Existing sandbox to clone from
    #[arg(long)]
    pub source_sandbox: Option<String>,

    /// Username (or alias) of the production org that owns the sandbox
    #[arg(short = 'o', long)]
    pub target_org: Option<String>,

    /// Alias to assign to the sandbox org on success
    #[arg(short, long)]
    pub alias: Option<String>,

    /// Make the sandbox org the default target on success
    #[arg(short = 'd', long)]
    pub set_default: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Track a sandbox create job
    Create(ProvisionArgs),
    /// Track a sandbox refresh job
    Refresh(ProvisionArgs),
    /// Re-attach to a cached in-progress operation
    Resume {
        /// Sandbox name; the most recently cached operation when omitted
        name: Option<String>,
    },
    /// Show cached resumable operations
    List,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match run(&cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {:#}", console::style("Error:").red().bold(), err);
            1
        }
    };
    std::process::exit(code);
}

async fn run(cli: &Cli) -> Result<i32> {
    match &cli.command {
        Commands::Create(args) => cmd::cmd_provision(cli, SandboxAction::Create, args).await,
        Commands::Refresh(args) => cmd::cmd_provision(cli, SandboxAction::Refresh, args).await,
        Commands::Resume { name } => cmd::cmd_resume(cli, name.as_deref()).await,
        Commands::List => cmd::cmd_list(cli),
    }
}
