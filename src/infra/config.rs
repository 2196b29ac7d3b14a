use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};

/// Config file names probed in priority order
const CONFIG_FILES: [&str; 4] =
    ["tagsplice.toml", "tagsplice.yaml", "tagsplice.json", ".tagsplice.toml"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Tracing filter used when RUST_LOG is unset
    pub log_level: String,

    /// Default search settings
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig
{
    /// Cap on bytes read per find/rfind; unset means no cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_scan_bytes: Option<u64>,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self { log_level: "warn".to_string(), search: SearchConfig::default() }
    }
}

/// Load configuration from the working directory and environment
pub fn load_config() -> Result<Config>
{
    load_config_from(Path::new("."))
}

/// Load the first config file found in `dir`, then `TAGSPLICE_*` overrides
/// (nested keys use `__`, e.g. `TAGSPLICE_SEARCH__MAX_SCAN_BYTES`).
pub fn load_config_from(dir: &Path) -> Result<Config>
{
    let mut builder = config::Config::builder();

    for name in CONFIG_FILES
    {
        let path = dir.join(name);
        if path.exists()
        {
            builder = builder.add_source(config::File::from(path));
            break;
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("TAGSPLICE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
