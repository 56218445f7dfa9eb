use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use prefs_types::ValueKind;

#[derive(Parser, Debug)]
#[command(
    name = "prefs",
    about = "Inspect and edit a prefs settings file",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Settings file to operate on
    #[arg(long, global = true, default_value = "prefs.json")]
    pub store: PathBuf,

    /// Defaults document (TOML, or JSON when the extension is .json)
    #[arg(long, global = true)]
    pub defaults: Option<PathBuf>,

    /// Skip fsync on commit
    #[arg(long, global = true)]
    pub no_sync: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write every registered default into the store
    Init,
    /// Read a setting, falling back to its default
    Get(GetArgs),
    /// Write a setting
    Set(SetArgs),
    /// Delete a setting
    Remove(KeyArgs),
    /// Restore a setting to its default (removes it when none is registered)
    Reset(KeyArgs),
    /// Erase everything and reload the defaults
    ResetAll,
    /// Erase every setting
    Clear,
    /// List stored settings
    List,
    /// Check whether a setting is stored
    Contains(KeyArgs),
}

#[derive(Args, Debug)]
pub struct KeyArgs {
    pub key: String,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    pub key: String,
    /// Value kind; inferred from the stored value or default when omitted
    #[arg(short, long)]
    pub kind: Option<ValueKind>,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    pub key: String,
    /// One of: string, bool, long, int, float, string_set
    pub kind: ValueKind,
    /// Literal value; string sets are comma-separated
    #[arg(allow_hyphen_values = true)]
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_with_kind() {
        let cli = Cli::try_parse_from(["prefs", "set", "timeout", "int", "30"]).unwrap();
        match cli.command {
            Command::Set(args) => {
                assert_eq!(args.key, "timeout");
                assert_eq!(args.kind, ValueKind::Int);
                assert_eq!(args.value, "30");
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.store, PathBuf::from("prefs.json"));
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "prefs", "list", "--store", "/tmp/x.json", "--format", "json", "-v",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::List));
        assert_eq!(cli.store, PathBuf::from("/tmp/x.json"));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
    }

    #[test]
    fn set_accepts_negative_literals() {
        let cli = Cli::try_parse_from(["prefs", "set", "offset", "int", "-5"]).unwrap();
        match cli.command {
            Command::Set(args) => assert_eq!(args.value, "-5"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["prefs", "set", "k", "double", "1.0"]).is_err());
    }

    #[test]
    fn get_kind_is_optional() {
        let cli = Cli::try_parse_from(["prefs", "get", "timeout"]).unwrap();
        assert!(matches!(cli.command, Command::Get(GetArgs { kind: None, .. })));
    }
}
