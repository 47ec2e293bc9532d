use anyhow::{Context, Result};
use field_translate_sync::{
    config::{self, Config},
    FieldUpdate, HttpTranslator, LanguageRecord, RawData, TranslationSync,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// One line of input
#[derive(Debug, PartialEq, Eq)]
enum Command {
    /// `name=value`: debounced translate
    Translate { name: String, value: String },
    /// `:set name lang value`: correct a single language
    Set {
        name: String,
        language: String,
        value: String,
    },
    /// `:replace name {"en_US": "..."}`: replace a whole record
    Replace { name: String, record: LanguageRecord },
    /// `:add name`: register an empty field
    Add { name: String },
    /// `:init path`: reload the store from a JSON file
    Init { path: PathBuf },
    Show,
    Metrics,
}

fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }

    let Some(rest) = line.strip_prefix(':') else {
        let (name, value) = line
            .split_once('=')
            .context("Expected `name=value` or a `:command`")?;
        return Ok(Some(Command::Translate {
            name: name.trim().to_string(),
            value: value.to_string(),
        }));
    };

    let (verb, args) = rest.split_once(' ').unwrap_or((rest, ""));
    let command = match verb {
        "set" => {
            let mut parts = args.splitn(3, ' ');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(name), Some(language), value) if !name.is_empty() => Command::Set {
                    name: name.to_string(),
                    language: language.to_string(),
                    value: value.unwrap_or_default().to_string(),
                },
                _ => anyhow::bail!("Usage: :set <name> <lang> <value>"),
            }
        }
        "replace" => {
            let (name, json) = args
                .split_once(' ')
                .context("Usage: :replace <name> <json record>")?;
            let record = serde_json::from_str(json).context("Invalid JSON record")?;
            Command::Replace {
                name: name.to_string(),
                record,
            }
        }
        "add" if !args.trim().is_empty() => Command::Add {
            name: args.trim().to_string(),
        },
        "init" if !args.trim().is_empty() => Command::Init {
            path: PathBuf::from(args.trim()),
        },
        "show" => Command::Show,
        "metrics" => Command::Metrics,
        _ => anyhow::bail!("Unknown command: {}", line),
    };

    Ok(Some(command))
}

fn run_command(sync: &TranslationSync, command: Command) -> Result<()> {
    match command {
        Command::Translate { name, value } => {
            let field = name.clone();
            sync.translate_with(&name, value, move |record| {
                info!("✓ '{}' translated: {:?}", field, record);
            });
        }
        Command::Set {
            name,
            language,
            value,
        } => sync.update_data(&name, FieldUpdate::language(language, value))?,
        Command::Replace { name, record } => {
            sync.update_data(&name, FieldUpdate::Record(record))?
        }
        Command::Add { name } => sync.add_name(&name),
        Command::Init { path } => sync.init_data(&config::load_raw_data(&path)?),
        Command::Show => println!("{}", serde_json::to_string_pretty(&*sync.snapshot())?),
        Command::Metrics => println!("{}", serde_json::to_string_pretty(&sync.metrics())?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when absent)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("field_translate_sync=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    let initial = match &config.init_file {
        Some(path) => config::load_raw_data(path)?,
        None => RawData::new(),
    };

    info!(
        "Starting field sync for {:?} (current: {}, debounce: {}ms)",
        config.languages, config.current_language, config.debounce_ms
    );

    let translator = HttpTranslator::new(
        reqwest::Client::new(),
        config.translate_api_url.clone(),
        config.translate_api_key.clone(),
    );
    let sync = TranslationSync::new(
        config.language_context(),
        config.sync_config(),
        Arc::new(translator),
        &initial,
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        match parse_command(&line) {
            Ok(Some(command)) => {
                if let Err(e) = run_command(&sync, command) {
                    warn!("{:#}", e);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("{:#}", e),
        }
    }

    info!("Input closed, waiting for {} pending fields", sync.in_flight());
    sync.settle().await;

    println!("{}", serde_json::to_string_pretty(&*sync.snapshot())?);
    Ok(())
}
