use crate::config::toml_config::{ReviewConfig, DEFAULT_CONFIG_PATH};
use crate::core::resolver::NumberFormat;
use crate::utils::error::{ReviewError, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Parser)]
#[command(name = "xtf-review")]
#[command(about = "Preview, edit and convert INTERLIS transfer files through a conversion backend")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Override backend.base_url from the config file
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Number display policy (raw, fixed3)
    #[arg(long)]
    pub number_format: Option<NumberFormat>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Extract the files and print the preview tree
    Preview {
        #[arg(required = true)]
        files: Vec<String>,

        /// Open every section before printing
        #[arg(long)]
        expand: bool,
    },
    /// Submit the files for conversion
    Convert {
        files: Vec<String>,

        /// Fetch the produced files into this directory
        #[arg(long)]
        download_dir: Option<String>,
    },
    /// Interactive review shell (preview, edit, convert)
    Review {
        files: Vec<String>,

        /// Seed the parameter form from the backend's /config
        #[arg(long)]
        remote_defaults: bool,
    },
    /// Inspect or change the backend's stored defaults
    RemoteConfig {
        #[command(subcommand)]
        action: RemoteConfigAction,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum RemoteConfigAction {
    Show,
    Get { key: String },
    Set { key: String, value: String },
    /// Update several values in one request (key=value ...)
    Update {
        #[arg(required = true)]
        assignments: Vec<String>,
    },
    Reset,
}

/// 數字與布林以 JSON 送出，其餘視為字串
pub fn parse_remote_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// 把 `key=value` 清單轉成 POST /config 的本體，同一鍵以最後一次為準
pub fn parse_assignments(assignments: &[String]) -> Result<Map<String, Value>> {
    let mut values = Map::new();
    for assignment in assignments {
        let (key, raw) = assignment
            .split_once('=')
            .map(|(key, raw)| (key.trim(), raw.trim()))
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| {
                ReviewError::validation(format!(
                    "Ungültige Zuweisung '{}' (Format: schlüssel=wert)",
                    assignment
                ))
            })?;
        values.insert(key.to_string(), parse_remote_value(raw));
    }
    Ok(values)
}

impl CliConfig {
    /// 命令列覆蓋設定檔
    pub fn apply_overrides(&self, config: &mut ReviewConfig) {
        if let Some(url) = &self.backend_url {
            tracing::info!("🔧 Backend URL overridden to: {}", url);
            config.backend.base_url = url.clone();
        }
        if let Some(format) = self.number_format {
            tracing::info!("🔧 Number format overridden to: {:?}", format);
            config.display.number_format = format;
        }
    }
}
