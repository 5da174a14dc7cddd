use std::path::PathBuf;

use agent_session::InterfaceHints;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use packet::MacAddress;
use serde::Deserialize;

fn default_agent_path() -> PathBuf {
    PathBuf::from("6lhagent")
}

fn default_tx_attempts() -> u8 {
    3
}

fn default_log_filter() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Flags accepted on the command line. Mirrors [`FileConfig`] field-for-field
/// so a flag can override the matching TOML key; `None` means "not given on
/// the command line, fall through to the file or the default".
#[derive(Parser, Debug)]
#[command(name = "bridged", about, long_about = None)]
pub struct Cli {
    /// Path to an optional TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to the agent executable.
    #[arg(long)]
    pub agent_path: Option<PathBuf>,

    /// Interface name hint passed to the agent on spawn.
    #[arg(long)]
    pub if_name: Option<String>,

    /// Interface MAC address hint passed to the agent on spawn.
    #[arg(long)]
    pub if_mac: Option<MacAddress>,

    /// Interface MTU hint passed to the agent on spawn.
    #[arg(long)]
    pub if_mtu: Option<u16>,

    /// Retry bound for a queued frame that keeps getting NAK'd.
    #[arg(long)]
    pub tx_attempts: Option<u8>,

    /// `tracing_subscriber::EnvFilter` directive string.
    #[arg(long)]
    pub log_filter: Option<String>,

    /// Structured log output format.
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    agent_path: Option<PathBuf>,
    if_name: Option<String>,
    #[serde(deserialize_with = "deserialize_optional_mac", default)]
    if_mac: Option<MacAddress>,
    if_mtu: Option<u16>,
    tx_attempts: Option<u8>,
    log_filter: Option<String>,
    log_format: Option<LogFormat>,
}

/// `packet::MacAddress` has no `serde` impl of its own — the codec crate has
/// no business depending on a config-file format — so the TOML text form is
/// parsed through the same [`std::str::FromStr`] the CLI and the wire
/// protocol already use.
fn deserialize_optional_mac<'de, D>(deserializer: D) -> Result<Option<MacAddress>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let text: Option<String> = Deserialize::deserialize(deserializer)?;
    text.map(|t| t.parse().map_err(serde::de::Error::custom))
        .transpose()
}

/// Fully resolved configuration: CLI flags layered over an optional TOML
/// file, layered over built-in defaults.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub agent_path: PathBuf,
    pub if_name: Option<String>,
    pub if_mac: Option<MacAddress>,
    pub if_mtu: Option<u16>,
    pub tx_attempts: u8,
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl BridgeConfig {
    pub fn load(cli: Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                toml::from_str(&text)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => FileConfig::default(),
        };

        Ok(Self {
            agent_path: cli
                .agent_path
                .or(file.agent_path)
                .unwrap_or_else(default_agent_path),
            if_name: cli.if_name.or(file.if_name),
            if_mac: cli.if_mac.or(file.if_mac),
            if_mtu: cli.if_mtu.or(file.if_mtu),
            tx_attempts: cli.tx_attempts.or(file.tx_attempts).unwrap_or_else(default_tx_attempts),
            log_filter: cli.log_filter.or(file.log_filter).unwrap_or_else(default_log_filter),
            log_format: cli.log_format.or(file.log_format).unwrap_or_default(),
        })
    }

    pub fn interface_hints(&self) -> InterfaceHints {
        InterfaceHints {
            if_name: self.if_name.clone(),
            if_mac: self.if_mac,
            if_mtu: self.if_mtu,
        }
    }
}
