use std::fs;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use prefs_core::{Defaults, FileStore, FileStoreConfig, PreferenceStore, SyncMode, Value, ValueKind};
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let prefs = open_preferences(&cli)?;
    let format = cli.format;

    match cli.command {
        Command::Init => {
            prefs.load_default_preferences()?;
            done(format, &format!("Loaded {} defaults", prefs.defaults().len()))
        }
        Command::Get(args) => cmd_get(&prefs, format, args),
        Command::Set(args) => cmd_set(&prefs, format, args),
        Command::Remove(args) => {
            prefs.remove(&args.key)?;
            done(format, &format!("Removed {}", args.key.yellow()))
        }
        Command::Reset(args) => {
            prefs.reset(&args.key)?;
            done(format, &format!("Reset {}", args.key.yellow()))
        }
        Command::ResetAll => {
            prefs.reset_all()?;
            done(format, "Reset all settings to defaults")
        }
        Command::Clear => {
            prefs.clear()?;
            done(format, "Cleared all settings")
        }
        Command::List => cmd_list(&prefs, format),
        Command::Contains(args) => {
            let present = prefs.contains(&args.key)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::json!({ "key": args.key, "present": present })),
                OutputFormat::Text if present => println!("{} {}", "✓".green(), args.key),
                OutputFormat::Text => println!("{} {}", "✗".red(), args.key),
            }
            Ok(())
        }
    }
}

fn open_preferences(cli: &Cli) -> anyhow::Result<PreferenceStore<FileStore>> {
    let defaults = match &cli.defaults {
        Some(path) => load_defaults(path)?,
        None => Defaults::new(),
    };

    let config = FileStoreConfig {
        sync_mode: if cli.no_sync { SyncMode::OsDefault } else { SyncMode::EveryCommit },
        ..FileStoreConfig::default()
    };
    let store = FileStore::open(&cli.store, config)
        .with_context(|| format!("failed to open {}", cli.store.display()))?;

    debug!(store = %cli.store.display(), defaults = defaults.len(), "opened preferences");
    Ok(PreferenceStore::new(store, defaults))
}

fn load_defaults(path: &Path) -> anyhow::Result<Defaults> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let defaults = if is_json {
        Defaults::from_json_str(&text)
    } else {
        Defaults::from_toml_str(&text)
    };
    defaults.with_context(|| format!("invalid defaults in {}", path.display()))
}

/// Stored variant first, then the registered default, then plain string.
fn resolve_kind(prefs: &PreferenceStore<FileStore>, key: &str) -> anyhow::Result<ValueKind> {
    if let Some(stored) = prefs.get_all()?.get(key) {
        return Ok(stored.kind());
    }
    Ok(prefs.defaults().get(key).map_or(ValueKind::String, Value::kind))
}

fn cmd_get(prefs: &PreferenceStore<FileStore>, format: OutputFormat, args: GetArgs) -> anyhow::Result<()> {
    let kind = match args.kind {
        Some(kind) => kind,
        None => resolve_kind(prefs, &args.key)?,
    };
    let key = args.key.as_str();
    let value = match kind {
        ValueKind::String => Value::String(prefs.get_string(key)?),
        ValueKind::Bool => Value::Bool(prefs.get_bool(key)?),
        ValueKind::Long => Value::Long(prefs.get_long(key)?),
        ValueKind::Int => Value::Int(prefs.get_int(key)?),
        ValueKind::Float => Value::Float(prefs.get_float(key)?),
        ValueKind::StringSet => Value::StringSet(prefs.get_string_set(key)?),
    };

    match format {
        OutputFormat::Json => {
            let mut doc = serde_json::to_value(&value)?;
            doc["key"] = serde_json::Value::from(key);
            println!("{doc}");
        }
        OutputFormat::Text => println!("{value}"),
    }
    Ok(())
}

fn cmd_set(prefs: &PreferenceStore<FileStore>, format: OutputFormat, args: SetArgs) -> anyhow::Result<()> {
    let value = Value::parse(args.kind, &args.value)?;
    prefs.save(&args.key, &value)?;
    done(format, &format!("Set {} = {} ({})", args.key.yellow(), value, value.kind().to_string().cyan()))
}

fn cmd_list(prefs: &PreferenceStore<FileStore>, format: OutputFormat) -> anyhow::Result<()> {
    let all = prefs.get_all()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&all)?),
        OutputFormat::Text if all.is_empty() => println!("No settings stored."),
        OutputFormat::Text => {
            for (key, value) in &all {
                println!("{} {} {}", key.bold(), format!("({})", value.kind()).dimmed(), value);
            }
        }
    }
    Ok(())
}

fn done(format: OutputFormat, message: &str) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "ok": true })),
        OutputFormat::Text => println!("{} {}", "✓".green().bold(), message),
    }
    Ok(())
}
