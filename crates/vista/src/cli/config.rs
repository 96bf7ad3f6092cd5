//! The `vista config` command for configuration management.

use clap::{Args, Subcommand};
use toml_edit::{DocumentMut, Item, Value};
use vista_core::Config;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,

    /// Show config file path
    Path,

    /// Initialize a new config file with defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Set one value, e.g. `vista config set store.backend weaviate`
    Set {
        /// Dotted key such as `store.milvus.endpoint`
        key: String,

        /// New value; parsed as TOML when possible, otherwise stored as a string
        value: String,
    },
}

/// Execute the config command.
pub async fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = Config::load()?;
            let toml = config.to_toml()?;
            println!("{}", toml);
        }

        ConfigCommand::Path => {
            let path = Config::default_path();
            println!("{}", path.display());
        }

        ConfigCommand::Init { force } => {
            let path = Config::default_path();

            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at: {}\nUse --force to overwrite.",
                    path.display()
                );
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let toml = Config::default().to_toml()?;
            std::fs::write(&path, toml)?;

            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }

        ConfigCommand::Set { key, value } => {
            let path = Config::default_path();
            let current = if path.exists() {
                std::fs::read_to_string(&path)?
            } else {
                Config::default().to_toml()?
            };

            let updated = set_value(&current, &key, &value)?;

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, updated)?;
            println!("{key} = {value}");
        }
    }

    Ok(())
}

/// Set `key` to `raw` in the TOML document `current`, preserving comments.
///
/// Only keys that exist in the default configuration are accepted, and the
/// edited document must still load as a valid [`Config`].
fn set_value(current: &str, key: &str, raw: &str) -> anyhow::Result<String> {
    let known: DocumentMut = Config::default().to_toml()?.parse()?;
    let segments: Vec<&str> = key.split('.').collect();
    if lookup(known.as_item(), &segments).map_or(true, |item| item.is_table()) {
        anyhow::bail!("Unknown config key: {key}\n\n  Hint: Run `vista config show` to list keys.");
    }

    let mut doc: DocumentMut = current.parse()?;
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| anyhow::anyhow!("Empty config key"))?;

    let mut table = doc.as_table_mut();
    for segment in parents {
        let entry = table
            .entry(segment)
            .or_insert_with(toml_edit::table)
            .as_table_mut();
        table = entry.ok_or_else(|| anyhow::anyhow!("{segment} is not a table in {key}"))?;
    }
    table.insert(last, Item::Value(parse_value(raw)));

    let updated = doc.to_string();
    Config::from_toml_str(&updated)?;
    Ok(updated)
}

fn lookup<'a>(item: &'a Item, segments: &[&str]) -> Option<&'a Item> {
    segments
        .iter()
        .try_fold(item, |current, segment| current.get(segment))
}

/// Parse `raw` as a TOML value, falling back to a plain string.
fn parse_value(raw: &str) -> Value {
    raw.parse::<Value>()
        .unwrap_or_else(|_| Value::from(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# my settings\n[store]\nbackend = \"milvus\"\n";

    #[test]
    fn test_set_preserves_comments() {
        let updated = set_value(SAMPLE, "store.backend", "weaviate").unwrap();
        assert!(updated.contains("# my settings"));
        assert!(updated.contains("backend = \"weaviate\""));
    }

    #[test]
    fn test_set_creates_nested_tables() {
        let updated = set_value(SAMPLE, "store.milvus.search_ef", "64").unwrap();
        let config = Config::from_toml_str(&updated).unwrap();
        assert_eq!(config.store.milvus.search_ef, 64);
    }

    #[test]
    fn test_set_rejects_unknown_key() {
        let err = set_value(SAMPLE, "store.qdrant.endpoint", "x").unwrap_err();
        assert!(err.to_string().contains("Unknown config key"));
        assert!(set_value(SAMPLE, "store", "x").is_err());
    }

    #[test]
    fn test_set_rejects_invalid_value() {
        assert!(set_value(SAMPLE, "processing.batch_size", "0").is_err());
        assert!(set_value(SAMPLE, "embedding.model_size", "huge").is_err());
    }

    #[test]
    fn test_parse_value_falls_back_to_string() {
        assert_eq!(parse_value("32").as_integer(), Some(32));
        assert_eq!(parse_value("true").as_bool(), Some(true));
        assert_eq!(
            parse_value("http://localhost:8080").as_str(),
            Some("http://localhost:8080")
        );
    }
}
