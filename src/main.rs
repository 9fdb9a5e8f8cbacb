use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

use troupe::auth::{self, AuthStorage};
use troupe::backend::Backend;
use troupe::backend::anthropic::AnthropicBackend;
use troupe::backend::human::HumanBackend;
use troupe::backend::openai::OpenAiCompatBackend;
use troupe::banner::{BannerInfo, print_banner, print_session_summary};
use troupe::config::{Config, KNOWN_KEYS};
use troupe::consts::{
    DEFAULT_ANTHROPIC_MODEL, DEFAULT_CONTEXT_WINDOW, DEFAULT_GROQ_MODEL, DEFAULT_MEMORY_CAPACITY,
    DEFAULT_OPENROUTER_MODEL, default_db_path,
};
use troupe::crew::Inputs;
use troupe::crews::{Pipeline, PipelineOptions};
use troupe::events::EventBus;
use troupe::progress;
use troupe::relay::extract::{
    DEFAULT_BUDGET, DEFAULT_DESTINATION, DEFAULT_DURATION, DEFAULT_ORIGIN,
};
use troupe::relay::{MessageRelay, TelegramTransport};
use troupe::telemetry;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Provider {
    Anthropic,
    Groq,
    Openrouter,
    Human,
}

impl Provider {
    fn key(self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::Groq => "groq",
            Provider::Openrouter => "openrouter",
            Provider::Human => "human",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CrewChoice {
    Travel,
    Simple,
}

impl From<CrewChoice> for Pipeline {
    fn from(choice: CrewChoice) -> Self {
        match choice {
            CrewChoice::Travel => Pipeline::Travel,
            CrewChoice::Simple => Pipeline::Simple,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SecretProvider {
    Anthropic,
    Groq,
    Openrouter,
    Telegram,
}

impl SecretProvider {
    fn key(self) -> &'static str {
        match self {
            SecretProvider::Anthropic => "anthropic",
            SecretProvider::Groq => "groq",
            SecretProvider::Openrouter => "openrouter",
            SecretProvider::Telegram => "telegram",
        }
    }
}

#[derive(Parser)]
#[command(name = "troupe", version, about = troupe::consts::DESCRIPTION)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Generation provider (stored `provider` setting, then anthropic)
    #[arg(short, long, value_enum, global = true)]
    provider: Option<Provider>,

    /// Model name (provider-specific, ignored for human)
    #[arg(long, global = true)]
    model: Option<String>,

    /// SQLite database for settings and credentials
    #[arg(long, global = true)]
    db: Option<String>,

    /// Log level for this crate; RUST_LOG takes priority
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// No banner and no progress output
    #[arg(short, long, global = true, default_value_t = false)]
    quiet: bool,

    /// Pipeline to run
    #[arg(short, long, value_enum, global = true)]
    crew: Option<CrewChoice>,

    /// Shared memory capacity in entries (0 disables memory)
    #[arg(long, global = true)]
    memory_capacity: Option<usize>,

    /// Characters of history kept in each prompt (0 keeps everything)
    #[arg(long, global = true)]
    context_window: Option<usize>,

    /// Directory for output files
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    #[arg(long)]
    destination: Option<String>,

    #[arg(long)]
    origin: Option<String>,

    /// Trip length in days
    #[arg(long)]
    duration: Option<String>,

    /// economy, moderate or luxury
    #[arg(long)]
    budget: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a pipeline once from the terminal (default)
    Run,
    /// Serve trip requests over Telegram
    Relay,
    /// Store an API key or bot token
    Login {
        #[arg(value_enum)]
        provider: SecretProvider,
        /// The secret; read from stdin when omitted
        #[arg(long)]
        key: Option<String>,
    },
    /// Remove a stored API key or bot token
    Logout {
        #[arg(value_enum)]
        provider: SecretProvider,
    },
    /// Read or change stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Get { key: String },
    Set { key: String, value: String },
    Unset { key: String },
    List,
}

/// Flags merged with stored settings.
struct Settings {
    provider: Provider,
    model: Option<String>,
    pipeline: Pipeline,
    memory_capacity: usize,
    context_window: Option<usize>,
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => {
            let path = default_db_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            path.to_string_lossy().into_owned()
        }
    };
    let config = Config::open(&db_path)?;

    let log_level = match &cli.log_level {
        Some(level) => level.clone(),
        None => config.get("log_level")?.unwrap_or_else(|| "info".to_string()),
    };
    telemetry::init(&log_level);

    match &cli.command {
        Some(Command::Login { provider, key }) => {
            return handle_login(&db_path, *provider, key.as_deref());
        }
        Some(Command::Logout { provider }) => {
            auth::logout(&db_path, provider.key())?;
            println!("✓ Removed stored {} credentials.", provider.key());
            return Ok(());
        }
        Some(Command::Config { action }) => return handle_config(&config, action),
        Some(Command::Run) | Some(Command::Relay) | None => {}
    }

    let settings = resolve_settings(&cli, &config)?;
    let storage = AuthStorage::open(&db_path)?;
    let (backend, model_label) = build_backend(&settings, &storage)?;
    let auth_status = auth::status(&storage, settings.provider.key())?;

    if !cli.quiet {
        print_banner(&BannerInfo {
            provider: settings.provider.key(),
            model: &model_label,
            auth_status: &auth_status,
            pipeline: &settings.pipeline.to_string(),
            memory_capacity: settings.memory_capacity,
            output_dir: &settings.output_dir,
        });
    }

    match cli.command {
        Some(Command::Relay) => run_relay(&settings, &storage, backend).await,
        _ => run_once(&cli, &settings, backend).await,
    }
}

fn resolve_settings(cli: &Cli, config: &Config) -> Result<Settings> {
    let provider = match cli.provider {
        Some(provider) => provider,
        None => match config.get("provider")? {
            Some(stored) => Provider::from_str(&stored, true)
                .map_err(|e| anyhow::anyhow!("stored provider '{stored}' is invalid: {e}"))?,
            None => Provider::Anthropic,
        },
    };

    let pipeline = match cli.crew {
        Some(choice) => choice.into(),
        None => config
            .get_parsed::<Pipeline>("crew")?
            .unwrap_or_default(),
    };

    let memory_capacity = match cli.memory_capacity {
        Some(n) => n,
        None => config
            .get_parsed("memory_capacity")?
            .unwrap_or(DEFAULT_MEMORY_CAPACITY),
    };

    let context_window = match cli.context_window {
        Some(n) => n,
        None => config
            .get_parsed("context_window")?
            .unwrap_or(DEFAULT_CONTEXT_WINDOW),
    };

    let output_dir = match &cli.output_dir {
        Some(dir) => dir.clone(),
        None => config
            .get("output_dir")?
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    Ok(Settings {
        provider,
        model: cli.model.clone().or(config.get("model")?),
        pipeline,
        memory_capacity,
        context_window: (context_window > 0).then_some(context_window),
        output_dir,
    })
}

fn build_backend(settings: &Settings, storage: &AuthStorage) -> Result<(Arc<dyn Backend>, String)> {
    let model = settings.model.clone();
    let backend: (Arc<dyn Backend>, String) = match settings.provider {
        Provider::Human => {
            if model.is_some() {
                eprintln!("warning: --model is ignored for human provider");
            }
            (Arc::new(HumanBackend), "—".to_string())
        }
        Provider::Anthropic => {
            let key = auth::require_secret(storage, "anthropic")?;
            let label = model
                .clone()
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());
            (Arc::new(AnthropicBackend::new(key, model)), label)
        }
        Provider::Groq => {
            let key = auth::require_secret(storage, "groq")?;
            let label = model
                .clone()
                .unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string());
            (Arc::new(OpenAiCompatBackend::groq(key, model)), label)
        }
        Provider::Openrouter => {
            let key = auth::require_secret(storage, "openrouter")?;
            let label = model
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENROUTER_MODEL.to_string());
            (Arc::new(OpenAiCompatBackend::openrouter(key, model)), label)
        }
    };
    Ok(backend)
}

fn pipeline_options(settings: &Settings) -> PipelineOptions {
    PipelineOptions {
        memory_capacity: settings.memory_capacity,
        context_window: settings.context_window,
        output_dir: Some(settings.output_dir.clone()),
        ..PipelineOptions::default()
    }
}

async fn run_once(cli: &Cli, settings: &Settings, backend: Arc<dyn Backend>) -> Result<()> {
    let inputs = collect_inputs(cli).await?;

    let bus = (!cli.quiet).then(|| Arc::new(EventBus::default()));
    let render = bus
        .as_ref()
        .map(|bus| tokio::spawn(progress::render(bus.subscribe())));

    let options = PipelineOptions {
        events: bus,
        ..pipeline_options(settings)
    };
    let mut crew = settings.pipeline.build(backend, &options)?;
    drop(options);

    // Ctrl+C cancels the run, not the summary.
    let outcome = tokio::select! {
        result = crew.run(&inputs) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    let usage = crew.session_usage();
    // Dropping the crew closes the event bus, which ends the renderer.
    drop(crew);
    if let Some(render) = render {
        let _ = render.await;
    }

    let failure = report_outcome(outcome);
    if let Some(file) = settings.pipeline.output_file() {
        let path = settings.output_dir.join(file);
        if path.exists() {
            println!("\nguide written to {}", path.display());
        }
    }
    print_session_summary(usage);
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Print what the run produced. A failed run is handed back so `main` exits non-zero.
fn report_outcome(outcome: Option<Result<String>>) -> Option<anyhow::Error> {
    match outcome {
        Some(Ok(result)) => {
            println!("\n{result}");
            None
        }
        Some(Err(e)) => Some(e),
        None => {
            println!("\n\ninterrupted");
            None
        }
    }
}

async fn run_relay(settings: &Settings, storage: &AuthStorage, backend: Arc<dyn Backend>) -> Result<()> {
    let token = auth::require_secret(storage, "telegram")?;

    let pipeline = settings.pipeline;
    let options = pipeline_options(settings);
    // No event bus: relay runs stay quiet.
    let factory = Box::new(move || pipeline.build(Arc::clone(&backend), &options));
    let mut relay = MessageRelay::new(TelegramTransport::new(token), factory);

    info!(crew = %pipeline, "starting relay");
    println!("relay running, Ctrl+C to stop");
    tokio::select! {
        result = relay.run() => result?,
        _ = tokio::signal::ctrl_c() => println!("\nstopped"),
    }
    Ok(())
}

/// Flags first, then an interactive prompt for anything missing.
async fn collect_inputs(cli: &Cli) -> Result<Inputs> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut inputs = Inputs::new();

    for (field, given, question, default) in [
        ("destination", &cli.destination, "Where are you going?", DEFAULT_DESTINATION),
        ("origin", &cli.origin, "Where are you leaving from?", DEFAULT_ORIGIN),
        ("duration", &cli.duration, "How many days?", DEFAULT_DURATION),
        ("budget", &cli.budget, "Budget (economy, moderate, luxury)?", DEFAULT_BUDGET),
    ] {
        let value = match given {
            Some(value) => value.clone(),
            None => ask(&mut lines, question, default).await?,
        };
        inputs.insert(field.to_string(), value);
    }

    inputs.insert(
        "user_request".to_string(),
        format!(
            "A {}-day trip to {} from {} on a {} budget",
            inputs["duration"], inputs["destination"], inputs["origin"], inputs["budget"]
        ),
    );
    Ok(inputs)
}

async fn ask(lines: &mut Lines<BufReader<Stdin>>, question: &str, default: &str) -> Result<String> {
    print!("{question} [{default}] ");
    io::stdout().flush()?;
    let answer = lines.next_line().await?.unwrap_or_default();
    let answer = answer.trim();
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    })
}

fn handle_login(db_path: &str, provider: SecretProvider, key: Option<&str>) -> Result<()> {
    let key = match key {
        Some(key) => key.to_string(),
        None => {
            print!("Paste the {} key: ", provider.key());
            io::stdout().flush()?;
            let mut key = String::new();
            io::stdin().read_line(&mut key)?;
            key
        }
    };
    auth::login(db_path, provider.key(), &key)?;
    println!("✓ Saved {} credentials to {db_path}", provider.key());
    Ok(())
}

fn handle_config(config: &Config, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Get { key } => match config.get(key)? {
            Some(value) => println!("{value}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            config.set(key, value)?;
            println!("✓ {key} = {value}");
        }
        ConfigAction::Unset { key } => {
            config.remove(key)?;
            println!("✓ {key} unset");
        }
        ConfigAction::List => {
            let stored = config.list()?;
            if stored.is_empty() {
                println!("no settings stored (keys: {})", KNOWN_KEYS.join(", "));
            }
            for (key, value) in stored {
                println!("{key} = {value}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn failed_run_is_returned_to_main() {
        let failure = report_outcome(Some(Err(anyhow!("backend exploded"))));
        assert_eq!(failure.map(|e| e.to_string()).as_deref(), Some("backend exploded"));
    }

    #[test]
    fn finished_or_interrupted_run_is_not_a_failure() {
        assert!(report_outcome(Some(Ok("plan".to_string()))).is_none());
        assert!(report_outcome(None).is_none());
    }
}
