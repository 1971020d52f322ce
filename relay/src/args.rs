use std::{fmt, io::IsTerminal, net::SocketAddr, path::PathBuf, str::FromStr};

use clap::{Parser, ValueEnum};
use config::Config;
use logforth::filter::EnvFilter;

/// Crates whose logs follow `--log`. Everything else stays at `warn`.
const WORKSPACE_CRATES: &[&str] = &["relay", "server", "config", "llm"];

#[derive(Debug, Parser)]
#[command(name = "Relay", version, long_about = concat!("Relay v", env!("CARGO_PKG_VERSION"), ", an OpenAI-compatible chat completion gateway"))]
pub struct Args {
    /// Address the gateway listens on. Overrides `server.listen_address`.
    /// Default: 127.0.0.1:3000
    #[arg(short, long, env = "RELAY_LISTEN_ADDRESS")]
    pub listen_address: Option<SocketAddr>,
    /// Path to the TOML configuration file. Defaults apply when the file does not exist.
    #[arg(long, short, env = "RELAY_CONFIG_PATH", default_value = "./relay.toml")]
    pub config: PathBuf,
    /// Log level of the workspace crates.
    #[arg(long = "log", env = "RELAY_LOG", default_value_t = LogLevel::default())]
    pub log_level: LogLevel,
    /// Style of the log output.
    #[arg(long, env = "RELAY_LOG_STYLE", default_value_t = LogStyle::default())]
    pub log_style: LogStyle,
}

impl Args {
    pub fn config(&self) -> anyhow::Result<Config> {
        if !self.config.exists() {
            return Ok(Config::default());
        }

        Config::load(&self.config)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogStyle {
    /// Colorized text, the default on a terminal
    Color,
    /// Plain text, the default when stdout is not a terminal
    Text,
    /// One JSON object per line
    Json,
}

impl Default for LogStyle {
    fn default() -> Self {
        if std::io::stdout().is_terminal() {
            LogStyle::Color
        } else {
            LogStyle::Text
        }
    }
}

impl fmt::Display for LogStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = match self {
            LogStyle::Color => "color",
            LogStyle::Text => "text",
            LogStyle::Json => "json",
        };

        f.write_str(style)
    }
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogLevel {
    /// No logs at all
    Off,
    /// Errors only
    Error,
    /// Errors and warnings
    Warn,
    /// Errors, warnings and request milestones
    #[default]
    Info,
    /// Also per-request details such as model selection and stream progress
    Debug,
    /// Everything
    Trace,
}

impl LogLevel {
    fn directives(self) -> String {
        if self == LogLevel::Off {
            return "off".to_string();
        }

        let mut directives = vec!["warn".to_string()];
        directives.extend(WORKSPACE_CRATES.iter().map(|name| format!("{name}={self}")));

        directives.join(",")
    }

    pub fn env_filter(self) -> EnvFilter {
        EnvFilter::from_str(&self.directives()).expect("log directives are generated from known crate names")
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };

        f.write_str(level)
    }
}
