//! syncstack: repository reconciliation and safe sync from the command line.
//!
//! Every invocation prints exactly one JSON object to stdout. Handled
//! failures are reported as `{"success": false, "message": ...}` with exit
//! code 0; only a command that cannot be dispatched exits non-zero.
//!
//! ```text
//! syncstack get_status <path>
//! syncstack get_detailed_status <path>
//! syncstack get_file_diff <path> <file>
//! syncstack sync <path> <name> <url> <credential> [strategy]
//! syncstack batch_sync <credential> <repos_json> [strategy]
//! syncstack list_snapshots <path>
//! syncstack restore_snapshot <path> <branch>
//! syncstack scan_local <path> [depth]
//! syncstack validate <username> <token>
//! syncstack get_repos <token>
//! syncstack search_repos <token> <query>
//! syncstack create_repo <token> <name> [description] [--private]
//! syncstack list_workflows <token> <owner/repo>
//! syncstack list_workflow_runs <token> <owner/repo>
//! syncstack trigger_workflow <token> <owner/repo> <workflow> [ref]
//! ```

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use syncstack::{resolve_config, EngineConfig, SyncEngine};

use commands::{failure, print_json};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "SYNCSTACK_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "syncstack",
    version,
    about = "Reconcile local working copies with their remotes, with a backup branch before every change",
    long_about = None,
)]
struct Cli {
    /// Engine config file (JSON).
    #[arg(long, global = true, env = "SYNCSTACK_CONFIG")]
    config: Option<PathBuf>,

    /// Root under which batch clones are placed.
    #[arg(long, global = true, env = "SYNCSTACK_WORKSPACE_ROOT")]
    workspace_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Branch, local changes, divergence and sync risk of a working copy.
    #[command(name = "get_status")]
    GetStatus { path: PathBuf },

    /// Status plus changed files and recent commits.
    #[command(name = "get_detailed_status")]
    GetDetailedStatus { path: PathBuf },

    /// Unified diff of one file against HEAD.
    #[command(name = "get_file_diff")]
    GetFileDiff { path: PathBuf, file: String },

    /// Clone or update one repository.
    #[command(name = "sync")]
    Sync {
        path: PathBuf,
        name: String,
        url: String,
        credential: String,
        /// pull, rebase or reset; anything else pulls.
        #[arg(default_value = "pull")]
        strategy: String,
    },

    /// Sync a JSON list of repositories under the workspace root.
    #[command(name = "batch_sync")]
    BatchSync {
        credential: String,
        repos_json: String,
        #[arg(default_value = "pull")]
        strategy: String,
    },

    /// Backup branches of a working copy, newest first.
    #[command(name = "list_snapshots")]
    ListSnapshots { path: PathBuf },

    /// Hard-reset the current branch to a backup branch.
    #[command(name = "restore_snapshot")]
    RestoreSnapshot { path: PathBuf, branch: String },

    /// Find working copies below a directory.
    #[command(name = "scan_local")]
    ScanLocal {
        path: PathBuf,
        #[arg(default_value_t = syncstack::DEFAULT_SCAN_DEPTH)]
        depth: usize,
    },

    /// Check that a token belongs to a user.
    #[command(name = "validate")]
    Validate { username: String, token: String },

    #[command(name = "get_repos")]
    GetRepos { token: String },

    #[command(name = "search_repos")]
    SearchRepos { token: String, query: String },

    #[command(name = "create_repo")]
    CreateRepo {
        token: String,
        name: String,
        description: Option<String>,
        #[arg(long)]
        private: bool,
    },

    #[command(name = "list_workflows")]
    ListWorkflows { token: String, repo: String },

    #[command(name = "list_workflow_runs")]
    ListWorkflowRuns { token: String, repo: String },

    #[command(name = "trigger_workflow")]
    TriggerWorkflow {
        token: String,
        repo: String,
        workflow: String,
        #[arg(default_value = "main")]
        git_ref: String,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return parse_failure(e),
    };

    init_logging();

    let config = match load_engine_config(&cli) {
        Ok(config) => config,
        Err(message) => {
            log::error!("{}", message);
            print_json(&failure(message));
            return ExitCode::FAILURE;
        }
    };

    print_json(&dispatch(cli.command, &config));
    ExitCode::SUCCESS
}

fn dispatch(command: Command, config: &EngineConfig) -> Value {
    match command {
        Command::GetStatus { path } => commands::status::get_status(&engine(config), &path),
        Command::GetDetailedStatus { path } => {
            commands::status::get_detailed_status(&engine(config), &path)
        }
        Command::GetFileDiff { path, file } => {
            commands::status::get_file_diff(&engine(config), &path, &file)
        }
        Command::Sync {
            path,
            name,
            url,
            credential,
            strategy,
        } => commands::sync::sync(&engine(config), &path, &name, &url, credential, &strategy),
        Command::BatchSync {
            credential,
            repos_json,
            strategy,
        } => commands::sync::batch_sync(&engine(config), credential, &repos_json, &strategy),
        Command::ListSnapshots { path } => {
            commands::snapshots::list_snapshots(&engine(config), &path)
        }
        Command::RestoreSnapshot { path, branch } => {
            commands::snapshots::restore_snapshot(&engine(config), &path, &branch)
        }
        Command::ScanLocal { path, depth } => {
            commands::scan::scan_local(&engine(config), &path, depth)
        }
        Command::Validate { username, token } => {
            commands::remote::validate(config, &username, token)
        }
        Command::GetRepos { token } => commands::remote::get_repos(config, token),
        Command::SearchRepos { token, query } => {
            commands::remote::search_repos(config, token, &query)
        }
        Command::CreateRepo {
            token,
            name,
            description,
            private,
        } => commands::remote::create_repo(config, token, &name, description.as_deref(), private),
        Command::ListWorkflows { token, repo } => {
            commands::remote::list_workflows(config, token, &repo)
        }
        Command::ListWorkflowRuns { token, repo } => {
            commands::remote::list_workflow_runs(config, token, &repo)
        }
        Command::TriggerWorkflow {
            token,
            repo,
            workflow,
            git_ref,
        } => commands::remote::trigger_workflow(config, token, &repo, &workflow, &git_ref),
    }
}

fn engine(config: &EngineConfig) -> SyncEngine {
    SyncEngine::from_config(config)
}

fn load_engine_config(cli: &Cli) -> Result<EngineConfig, String> {
    let mut config =
        resolve_config(cli.config.as_deref()).map_err(|e| format!("Config error: {}", e))?;
    if let Some(root) = &cli.workspace_root {
        config.workspace_root = root.clone();
    }
    Ok(config)
}

/// Help and version go to stdout as usual; anything else is a dispatch
/// failure reported as JSON.
fn parse_failure(e: clap::Error) -> ExitCode {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = e.print();
            ExitCode::SUCCESS
        }
        _ => {
            print_json(&failure(dispatch_error_message(&e)));
            ExitCode::FAILURE
        }
    }
}

/// First line of clap's message. A bare invocation renders the help text,
/// which is reported as a missing command instead.
fn dispatch_error_message(e: &clap::Error) -> String {
    if e.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand {
        return "Missing command".to_string();
    }

    let rendered = e.to_string();
    rendered
        .lines()
        .next()
        .unwrap_or("invalid command")
        .trim_start_matches("error: ")
        .to_string()
}

/// Logs go to stderr so stdout only ever carries the JSON result.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = Registry::default().with(filter).with(
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr),
    );

    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        let _ = tracing_log::LogTracer::init();
    }
}
