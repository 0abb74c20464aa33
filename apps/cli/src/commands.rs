//! CLI command definitions, routing, and tracing setup.

use std::io::Write;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use trendchat_core::{ChatSession, ConversationController, Reply, UserInput, classify_input};
use trendchat_search::{HttpSearchClient, SearchOptions, search};
use trendchat_shared::{AppConfig, ToolSignature, init_config, load_config, validate_api_key};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// TrendChat: ask what creators are talking about.
#[derive(Parser)]
#[command(
    name = "trendchat",
    version,
    about = "Chat about social-media trends, grounded in semantic transcript search.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Tool shape offered to the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum SignatureArg {
    Batch,
    Single,
}

impl From<SignatureArg> for ToolSignature {
    fn from(arg: SignatureArg) -> Self {
        match arg {
            SignatureArg::Batch => ToolSignature::Batch,
            SignatureArg::Single => ToolSignature::Single,
        }
    }
}

/// Flags that override config file values for a conversation.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct ChatOverrides {
    /// Model identifier (defaults to `openrouter.default_model`).
    #[arg(short, long)]
    pub model: Option<String>,

    /// Transcript search endpoint URL.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Search tool shape: batch (up to 3 phrases per call) or single.
    #[arg(long)]
    pub tool_signature: Option<SignatureArg>,

    /// Maximum phrases per search call (1-3).
    #[arg(long)]
    pub max_terms: Option<usize>,
}

impl ChatOverrides {
    fn apply(&self, mut config: AppConfig) -> Result<AppConfig> {
        if let Some(model) = &self.model {
            config.openrouter.default_model = model.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.search.endpoint = endpoint.clone();
        }
        if let Some(signature) = self.tool_signature {
            config.search.tool_signature = signature.into();
        }
        if let Some(max_terms) = self.max_terms {
            config.search.max_terms = max_terms;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Start an interactive chat session.
    Chat {
        #[command(flatten)]
        overrides: ChatOverrides,
    },

    /// Ask a single question and print the answer.
    Ask {
        /// The question (words are joined with spaces).
        #[arg(required = true)]
        question: Vec<String>,

        #[command(flatten)]
        overrides: ChatOverrides,
    },

    /// Search transcripts directly and print the merged results as JSON.
    Search {
        /// Semantic phrases; only the first `max_terms` are used.
        #[arg(required = true)]
        terms: Vec<String>,

        /// Transcript search endpoint URL.
        #[arg(long)]
        endpoint: Option<String>,

        /// Results requested per phrase.
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "trendchat=warn",
        1 => "trendchat=info",
        2 => "trendchat=debug",
        _ => "trendchat=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Chat { overrides } => cmd_chat(&overrides).await,
        Command::Ask {
            question,
            overrides,
        } => cmd_ask(&question.join(" "), &overrides).await,
        Command::Search {
            terms,
            endpoint,
            limit,
        } => cmd_search(&terms, endpoint, limit).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

fn build_controller(overrides: &ChatOverrides) -> Result<ConversationController> {
    let config = overrides.apply(load_config()?)?;
    let api_key = validate_api_key(&config)?;
    Ok(ConversationController::from_config(&config, api_key)?)
}

// ---------------------------------------------------------------------------
// chat
// ---------------------------------------------------------------------------

async fn cmd_chat(overrides: &ChatOverrides) -> Result<()> {
    let mut session = ChatSession::new(build_controller(overrides)?);
    info!(session = %session.id(), "chat session started");

    println!("TrendChat — ask what creators are talking about. Type 'exit' to leave.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt("You: ")?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };

        // EOF
        let Some(line) = line else {
            println!();
            break;
        };

        match classify_input(&line) {
            UserInput::Empty => continue,
            UserInput::Exit => {
                session.send(&line).await?;
                println!("Goodbye!");
                break;
            }
            UserInput::Query(_) => {}
        }

        let spinner = thinking_spinner();
        let reply = tokio::select! {
            reply = session.send(&line) => reply,
            _ = tokio::signal::ctrl_c() => {
                spinner.finish_and_clear();
                println!("(cancelled)");
                println!();
                continue;
            }
        };
        spinner.finish_and_clear();

        match reply {
            Ok(Reply::Answer(answer)) => {
                println!("Bot: {answer}");
                println!();
            }
            Ok(Reply::Ignored) => {}
            Ok(Reply::Exit) => break,
            Err(e) => {
                warn!(error = %e, "turn failed");
                eprintln!("Error: {e}");
                println!();
            }
        }
    }

    info!(
        session = %session.id(),
        turns = session.history().len(),
        "chat session finished"
    );
    Ok(())
}

fn prompt(label: &str) -> Result<()> {
    print!("{label}");
    std::io::stdout().flush()?;
    Ok(())
}

/// Spinner shown while a turn is in flight.
fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    spinner.set_style(style);
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

// ---------------------------------------------------------------------------
// ask
// ---------------------------------------------------------------------------

async fn cmd_ask(question: &str, overrides: &ChatOverrides) -> Result<()> {
    let query = match classify_input(question) {
        UserInput::Query(q) => q,
        _ => return Err(eyre!("question must not be blank or an exit keyword")),
    };

    let mut session = ChatSession::new(build_controller(overrides)?);

    let spinner = thinking_spinner();
    let reply = session.send(query).await;
    spinner.finish_and_clear();

    match reply? {
        Reply::Answer(answer) => println!("{answer}"),
        Reply::Ignored | Reply::Exit => {}
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// search
// ---------------------------------------------------------------------------

async fn cmd_search(terms: &[String], endpoint: Option<String>, limit: Option<u32>) -> Result<()> {
    let mut config = load_config()?;
    if let Some(endpoint) = endpoint {
        config.search.endpoint = endpoint;
    }
    if let Some(limit) = limit {
        config.search.per_term_limit = limit;
    }
    config.validate()?;

    let opts = SearchOptions::from_config(&config.search)?;
    let client = HttpSearchClient::new(&opts)?;

    if terms.len() > opts.max_terms {
        warn!(
            given = terms.len(),
            max_terms = opts.max_terms,
            "extra terms ignored"
        );
    }

    let results = search(&client, terms, opts.max_terms).await;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
