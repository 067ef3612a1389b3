use clap::Parser;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::{AppError, AppResult};
use crate::parser::MalformedLogPolicy;

pub const DEFAULT_WORKDIR: &str = "cypress";
pub const DEFAULT_MESSAGE_TEXT: &str =
    "A Cypress test just finished. Errors follow. Any screenshots are in this thread";
pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Command line and `INPUT_*` environment inputs
#[derive(Debug, Parser)]
#[command(
    name = "cypress-slack-notifier",
    about = "Post Cypress failures to Slack and attach screenshots in the thread",
    version
)]
pub struct Cli {
    #[arg(long, env = "INPUT_TOKEN", hide_env_values = true, help = "Slack bot token")]
    pub token: Option<String>,

    #[arg(long, env = "INPUT_CHANNEL", help = "Slack channel to post the failure summary to")]
    pub channel: Option<String>,

    #[arg(
        long,
        env = "INPUT_WORKDIR",
        help = "Directory holding the Cypress logs/ and screenshots/ folders (default: cypress)"
    )]
    pub workdir: Option<String>,

    #[arg(
        long = "message-text",
        env = "INPUT_MESSAGE_TEXT",
        help = "Header text of the posted message"
    )]
    pub message_text: Option<String>,

    #[arg(
        long = "skip-malformed-logs",
        env = "INPUT_SKIP_MALFORMED_LOGS",
        num_args = 0..=1,
        default_missing_value = "true",
        help = "Skip log files that are not valid failure reports instead of failing the run"
    )]
    pub skip_malformed_logs: Option<String>,

    #[arg(
        long = "slack-api-base",
        env = "SLACK_API_BASE",
        help = "Base URL of the Slack Web API (default: https://slack.com/api)"
    )]
    pub slack_api_base: Option<String>,

    #[arg(
        long = "request-timeout-secs",
        env = "INPUT_REQUEST_TIMEOUT_SECS",
        help = "Timeout in seconds for each Slack API request (default: 120)"
    )]
    pub request_timeout_secs: Option<String>,

    #[arg(
        long = "log-level",
        env = "INPUT_LOG_LEVEL",
        help = "One of error, warn, info, debug, trace (default: info)"
    )]
    pub log_level: Option<String>,
}

impl Cli {
    /// Requested log level, lowercased, with empty input meaning the default
    pub fn resolved_log_level(&self) -> String {
        non_empty(self.log_level.clone())
            .map(|level| level.to_lowercase())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
    }
}

#[derive(Clone)]
pub struct Config {
    pub token: String,
    pub channel: String,
    pub workdir: PathBuf,
    pub message_text: String,
    pub malformed_logs: MalformedLogPolicy,
    pub slack_api_base: String,
    pub request_timeout: Duration,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: String::new(),
            channel: String::new(),
            workdir: PathBuf::from(DEFAULT_WORKDIR),
            message_text: DEFAULT_MESSAGE_TEXT.to_string(),
            malformed_logs: MalformedLogPolicy::Fatal,
            slack_api_base: DEFAULT_SLACK_API_BASE.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

// Keep the token out of debug logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &mask_secret(&self.token))
            .field("channel", &self.channel)
            .field("workdir", &self.workdir)
            .field("message_text", &self.message_text)
            .field("malformed_logs", &self.malformed_logs)
            .field("slack_api_base", &self.slack_api_base)
            .field("request_timeout", &self.request_timeout)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl TryFrom<Cli> for Config {
    type Error = AppError;

    fn try_from(cli: Cli) -> AppResult<Self> {
        let defaults = Config::default();
        let log_level = cli.resolved_log_level();

        let malformed_logs = match non_empty(cli.skip_malformed_logs) {
            None => defaults.malformed_logs,
            Some(value) => match parse_flag(&value) {
                Some(true) => MalformedLogPolicy::Skip,
                Some(false) => MalformedLogPolicy::Fatal,
                None => {
                    return Err(AppError::validation(
                        "skip_malformed_logs",
                        "Must be true or false",
                    ))
                }
            },
        };

        let request_timeout = match non_empty(cli.request_timeout_secs) {
            None => defaults.request_timeout,
            Some(value) => value.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                AppError::validation("request_timeout_secs", "Must be a whole number of seconds")
            })?,
        };

        Ok(Config {
            token: non_empty(cli.token).unwrap_or_default(),
            channel: non_empty(cli.channel).unwrap_or_default(),
            workdir: non_empty(cli.workdir)
                .map(PathBuf::from)
                .unwrap_or(defaults.workdir),
            message_text: non_empty(cli.message_text).unwrap_or(defaults.message_text),
            malformed_logs,
            slack_api_base: non_empty(cli.slack_api_base)
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.slack_api_base),
            request_timeout,
            log_level,
        })
    }
}

/// Resolve CLI inputs into a validated configuration
pub fn load_config(cli: Cli) -> AppResult<Config> {
    let config = Config::try_from(cli)?;
    validate_config(&config)?;
    log::debug!("Loaded configuration: {:?}", config);
    Ok(config)
}

pub fn validate_config(config: &Config) -> AppResult<()> {
    if config.token.is_empty() {
        return Err(AppError::validation("token", "Slack token is required"));
    }

    if config.channel.is_empty() {
        return Err(AppError::validation("channel", "Slack channel is required"));
    }

    if config.message_text.trim().is_empty() {
        return Err(AppError::validation("message_text", "Message text cannot be empty"));
    }

    let timeout_secs = config.request_timeout.as_secs();
    if timeout_secs == 0 || timeout_secs > 600 {
        return Err(AppError::validation(
            "request_timeout_secs",
            "Must be between 1 and 600 seconds",
        ));
    }

    if !(config.slack_api_base.starts_with("https://")
        || config.slack_api_base.starts_with("http://"))
    {
        return Err(AppError::validation(
            "slack_api_base",
            "Must be an http:// or https:// URL",
        ));
    }

    let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
    if !valid_log_levels.contains(&config.log_level.as_str()) {
        return Err(AppError::validation("log_level", "Must be a valid log level"));
    }

    Ok(())
}

pub fn parse_log_level(level: &str) -> log::LevelFilter {
    match level {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let prefix: String = secret.chars().take(4).collect();
    format!("{}***", prefix)
}
