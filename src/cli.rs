use crate::actions::{ActionKind, PromptAction};
use crate::config::Config;
use crate::host::{ConsoleDisplay, ConsoleNotifier, ConsoleSelection, DisplayRegistry};
use crate::log_debug;
use crate::memory::{SessionMemoryCache, SystemClock};
use crate::orchestrator::{Outcome, ResponseOrchestrator};
use crate::providers::ProviderKind;
use clap::builder::{Styles, styling::AnsiColor};
use clap::{Args, Parser, Subcommand, crate_version};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

const LOG_FILE: &str = "codebuddy-debug.log";

/// CLI structure defining the available commands and global arguments
#[derive(Parser)]
#[command(
    author,
    version = crate_version!(),
    about = "CodeBuddy: AI coding assistant",
    long_about = "CodeBuddy sends a piece of code (or an error message) to the configured generative model and prints its answer: comments, reviews, refactors, explanations, fixes and more.",
    after_help = get_dynamic_help(),
    styles = get_styles(),
)]
pub struct Cli {
    /// Subcommands available for the CLI
    #[command(subcommand)]
    pub command: Commands,

    /// Log debug messages to a file
    #[arg(
        short = 'l',
        long = "log",
        global = true,
        help = "Log debug messages to a file"
    )]
    pub log: bool,

    /// Specify a custom log file path
    #[arg(
        long = "log-file",
        global = true,
        help = "Specify a custom log file path"
    )]
    pub log_file: Option<String>,

    /// Suppress non-essential output (status messages)
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress non-essential output"
    )]
    pub quiet: bool,
}

/// Arguments shared by every action
#[derive(Args, Clone, Debug, Default)]
pub struct ActionArgs {
    /// File holding the code to work on; stdin when omitted
    #[arg(short, long, help = "File holding the code to work on (defaults to stdin)")]
    pub file: Option<PathBuf>,

    /// Error text to use instead of the selection
    #[arg(short, long, help = "Error message to work on instead of selected code")]
    pub error: Option<String>,

    /// Override the configured provider for this run
    #[arg(long, help = "Override the provider for this run")]
    pub provider: Option<ProviderKind>,

    /// Override the configured model for this run
    #[arg(long, help = "Override the model for this run")]
    pub model: Option<String>,
}

/// Enumeration of available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Add comments to code
    #[command(about = "Add explanatory comments to code")]
    Comment {
        #[command(flatten)]
        args: ActionArgs,
    },

    /// Review code
    #[command(about = "Review code and suggest improvements")]
    Review {
        #[command(flatten)]
        args: ActionArgs,
    },

    /// Refactor code
    #[command(about = "Refactor code without changing its behavior")]
    Refactor {
        #[command(flatten)]
        args: ActionArgs,
    },

    /// Optimize code
    #[command(about = "Optimize code for speed and memory")]
    Optimize {
        #[command(flatten)]
        args: ActionArgs,
    },

    /// Explain code
    #[command(about = "Explain what code does")]
    Explain {
        #[command(flatten)]
        args: ActionArgs,
    },

    /// Suggest a fix for an error
    #[command(
        about = "Suggest a fix for an error",
        long_about = "Suggest a fix for an error. Pass the error text with --error, or pipe it on stdin."
    )]
    Fix {
        #[command(flatten)]
        args: ActionArgs,
    },

    /// Generate interview questions
    #[command(name = "interview-me", about = "Generate interview questions about code")]
    InterviewMe {
        #[command(flatten)]
        args: ActionArgs,
    },

    /// Generate unit tests
    #[command(name = "unit-test", about = "Generate unit tests for code")]
    UnitTest {
        #[command(flatten)]
        args: ActionArgs,
    },

    /// Chart code control flow
    #[command(about = "Draw a Mermaid flowchart of code")]
    Chart {
        #[command(flatten)]
        args: ActionArgs,
    },

    /// Configure CodeBuddy settings
    #[command(
        about = "Configure CodeBuddy settings and providers",
        long_about = "Configure CodeBuddy settings, including the active provider, API keys and models."
    )]
    Config {
        /// Set the active provider
        #[arg(long, help = "Set the active provider")]
        provider: Option<ProviderKind>,

        /// Set API key for the provider
        #[arg(long, help = "Set API key for the provider")]
        api_key: Option<String>,

        /// Set model for the provider
        #[arg(long, help = "Set model for the provider")]
        model: Option<String>,

        /// Set base URL for the provider
        #[arg(long, help = "Set base URL for the provider (proxies, self-hosted Ollama)")]
        base_url: Option<String>,
    },

    /// List supported providers
    #[command(about = "List supported providers and their settings keys")]
    Providers,
}

impl Commands {
    /// Action kind and arguments, for action subcommands
    fn action(&self) -> Option<(ActionKind, &ActionArgs)> {
        let pair = match self {
            Self::Comment { args } => (ActionKind::Comment, args),
            Self::Review { args } => (ActionKind::Review, args),
            Self::Refactor { args } => (ActionKind::Refactor, args),
            Self::Optimize { args } => (ActionKind::Optimize, args),
            Self::Explain { args } => (ActionKind::Explain, args),
            Self::Fix { args } => (ActionKind::Fix, args),
            Self::InterviewMe { args } => (ActionKind::InterviewMe, args),
            Self::UnitTest { args } => (ActionKind::UnitTest, args),
            Self::Chart { args } => (ActionKind::Chart, args),
            Self::Config { .. } | Self::Providers => return None,
        };
        Some(pair)
    }
}

/// Define custom styles for Clap
fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Magenta.on_default().bold())
        .usage(AnsiColor::Cyan.on_default().bold())
        .literal(AnsiColor::Green.on_default().bold())
        .placeholder(AnsiColor::Yellow.on_default())
        .valid(AnsiColor::Blue.on_default().bold())
        .invalid(AnsiColor::Red.on_default().bold())
        .error(AnsiColor::Red.on_default().bold())
}

/// Parse the command-line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Help footer listing the supported providers
fn get_dynamic_help() -> String {
    let providers_list = ProviderKind::all_names()
        .iter()
        .map(|p| format!("{}", p.bold()))
        .collect::<Vec<_>>()
        .join(" • ");

    format!("\nAvailable providers: {providers_list}")
}

/// Main function to parse arguments and handle the command
pub async fn main() -> anyhow::Result<()> {
    let cli = parse_args();

    if cli.log {
        crate::logger::enable_logging();
        let log_file = cli.log_file.as_deref().unwrap_or(LOG_FILE);
        crate::logger::set_log_file(log_file)?;
    } else {
        crate::logger::disable_logging();
    }

    handle_command(cli.command, cli.quiet).await
}

/// Dispatch a parsed subcommand
pub async fn handle_command(command: Commands, quiet: bool) -> anyhow::Result<()> {
    if let Some((kind, args)) = command.action() {
        return handle_action(kind, args, quiet).await;
    }

    match command {
        Commands::Config {
            provider,
            api_key,
            model,
            base_url,
        } => handle_config(provider, api_key, model, base_url),
        Commands::Providers => {
            handle_providers();
            Ok(())
        }
        _ => Ok(()),
    }
}

async fn handle_action(kind: ActionKind, args: &ActionArgs, quiet: bool) -> anyhow::Result<()> {
    log_debug!("Starting '{}' action with args: {:?}", kind, args);

    let mut config = Config::load()?;
    // Overrides apply to this run only and are never saved
    if args.provider.is_some() || args.model.is_some() {
        config.update(args.provider, None, args.model.clone(), None)?;
    }

    let cache = Arc::new(SessionMemoryCache::with_clock(
        Arc::new(SystemClock),
        config.session.ttl(),
    ));
    let orchestrator = ResponseOrchestrator::builder(
        Arc::new(config.clone()),
        Arc::new(ConsoleSelection::new(args.file.clone())),
        Arc::new(ConsoleNotifier { quiet }),
    )
    .displays(DisplayRegistry::shared(Arc::new(ConsoleDisplay)))
    .cache(cache)
    .history_window(config.session.history_window)
    .timeout(config.session.timeout())
    .build();

    let action = PromptAction::new(kind);
    match orchestrator.execute(&action, args.error.as_deref()).await {
        Outcome::Delivered(_) => Ok(()),
        // The notifier has already told the user what went wrong
        Outcome::Failed(error_kind) => std::process::exit(exit_code(error_kind)),
    }
}

/// Process exit code for a failed invocation
const fn exit_code(kind: crate::error::ErrorKind) -> i32 {
    use crate::error::ErrorKind;
    match kind {
        ErrorKind::Configuration => 2,
        ErrorKind::Input | ErrorKind::Prompt => 3,
        ErrorKind::Provider | ErrorKind::Format => 4,
    }
}

fn handle_config(
    provider: Option<ProviderKind>,
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
) -> anyhow::Result<()> {
    log_debug!(
        "Starting 'config' command with provider: {:?}, model: {:?}, base_url: {:?}",
        provider,
        model,
        base_url
    );

    let mut config = Config::load()?;
    let changes_made =
        provider.is_some() || api_key.is_some() || model.is_some() || base_url.is_some();

    if changes_made {
        config.update(provider, api_key, model, base_url)?;
        config.save()?;
        println!("{}", "✔ Configuration updated successfully.".bright_green());
        println!();
    }

    print_configuration(&config);
    Ok(())
}

fn print_configuration(config: &Config) {
    println!("{}", "Current configuration:".bright_cyan().bold());
    let active = if config.provider.is_empty() {
        "(none)".dimmed().to_string()
    } else {
        config.provider.bright_green().to_string()
    };
    println!("  {}: {}", "Active provider".yellow(), active);
    println!(
        "  {}: {} turns, {}h TTL, {}s timeout",
        "Session".yellow(),
        config.session.history_window,
        config.session.ttl_hours,
        config.session.timeout_seconds
    );

    for kind in ProviderKind::ALL {
        let Some(provider_config) = config.get_provider_config(*kind) else {
            continue;
        };
        println!("\n  {}", kind.name().bright_magenta().bold());
        let key_state = if provider_config.api_key.is_empty() {
            "not set".dimmed().to_string()
        } else {
            "set".green().to_string()
        };
        println!("    {}: {}", "API key".cyan(), key_state);
        println!("    {}: {}", "Model".cyan(), provider_config.model);
        if let Some(url) = &provider_config.base_url {
            println!("    {}: {}", "Base URL".cyan(), url);
        }
    }
}

fn handle_providers() {
    println!("{}", "Supported providers:".bright_cyan().bold());
    for kind in ProviderKind::ALL {
        let streaming = if matches!(kind, ProviderKind::Ollama) {
            " (streaming)"
        } else {
            ""
        };
        println!(
            "  {}{}\n    {} {}\n    {} {}\n    {} {}",
            kind.name().bright_magenta().bold(),
            streaming.dimmed(),
            "key:".cyan(),
            kind.api_key_key(),
            "model:".cyan(),
            kind.model_key(),
            "env:".cyan(),
            kind.api_key_env()
        );
    }
}
