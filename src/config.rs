//! Configuration for the mail service.
//!
//! `SmtpConfig` is the immutable snapshot consumed by the dispatch core; the
//! service holds the current snapshot in an atomically swappable cell and
//! replaces it wholesale on reconfiguration. The top-level `Config` wraps it
//! for the binary and is loaded with `figment`, layering a `mailroom.toml`
//! file, `MAILROOM_`-prefixed environment variables, and command-line
//! arguments over the defaults.

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use std::time::Duration;

use crate::cli::Cli;

/// SMTP connection and dispatch-policy snapshot.
///
/// Replaced as a whole on every reconfiguration, never mutated in place.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SmtpConfig {
    /// Whether the service accepts messages at all.
    pub enabled: bool,
    /// SMTP server hostname.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// Username for authentication. Empty means dial unauthenticated.
    pub username: String,
    /// Password for authentication.
    pub password: String,
    /// Skip TLS certificate verification when dialing.
    ///
    /// This is an explicitly opted-in insecure mode for servers with
    /// self-signed certificates; it is never the default.
    pub no_verify: bool,
    /// Whether all alerts should trigger an email. Consumed by the alert
    /// routing layer, not by the dispatch core.
    pub global: bool,
    /// Whether alerts should only fire on state changes. Only applies when
    /// `global` is set; consumed by the alert routing layer.
    pub state_changes_only: bool,
    /// Default sender address.
    pub from: String,
    /// Default recipient addresses, used when a send supplies none.
    pub to: Vec<String>,
    /// Close the connection to the SMTP server after this long without a
    /// send, in seconds.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub idle_timeout: Duration,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "localhost".to_string(),
            port: 25,
            username: String::new(),
            password: String::new(),
            no_verify: false,
            global: false,
            state_changes_only: false,
            from: String::new(),
            to: Vec::new(),
            idle_timeout: Duration::from_secs(30),
        }
    }
}

impl SmtpConfig {
    /// Checks the snapshot for values that can never work.
    ///
    /// The snapshot store itself performs no validation; callers are expected
    /// to validate before storing a new snapshot.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            bail!("host cannot be empty");
        }
        if self.port == 0 {
            bail!("invalid port {}", self.port);
        }
        if self.enabled && self.from.is_empty() {
            bail!("must provide a 'from' address");
        }
        // Poor man's address validation; enough to catch obvious user error.
        if !self.from.is_empty() && !self.from.contains('@') {
            bail!("invalid from email address: {:?}", self.from);
        }
        for to in &self.to {
            if !to.is_empty() && !to.contains('@') {
                bail!("invalid to email address: {:?}", to);
            }
        }
        Ok(())
    }
}

/// Top-level configuration for the `mailroom` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// SMTP connection settings.
    pub smtp: SmtpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            smtp: SmtpConfig::default(),
        }
    }
}

impl Config {
    /// Loads the configuration by layering sources: defaults, TOML file,
    /// environment variables, and CLI arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        figment = match &cli.config {
            Some(path) => figment.merge(Toml::file(path)),
            None => figment.merge(Toml::file("mailroom.toml")),
        };
        let config = figment
            .merge(Env::prefixed("MAILROOM_").split("__"))
            .merge(cli.clone())
            .extract()?;
        Ok(config)
    }
}
