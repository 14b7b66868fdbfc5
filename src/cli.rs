//! Command-line interface for the mailroom binary.
//!
//! Arguments are parsed with `clap` and merged over the TOML file and
//! environment variables through figment's `Provider` trait, so a flag like
//! `--host` overrides the corresponding `smtp.host` key.

use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Sends alert email over a reused SMTP connection.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// SMTP server hostname override.
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// SMTP server port override.
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Sender address override.
    #[arg(long, value_name = "ADDRESS")]
    pub from: Option<String>,

    /// Recipient address for the message; may be repeated. Defaults to the
    /// configured recipient list.
    #[arg(long = "to", value_name = "ADDRESS")]
    pub to: Vec<String>,

    /// Subject line for the message.
    #[arg(long, default_value = "test subject")]
    pub subject: String,

    /// HTML body for the message.
    #[arg(long, default_value = "test body")]
    pub body: String,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut smtp = Dict::new();

        if let Some(host) = &self.host {
            smtp.insert("host".into(), Value::from(host.clone()));
        }
        if let Some(port) = self.port {
            smtp.insert("port".into(), Value::from(u64::from(port)));
        }
        if let Some(from) = &self.from {
            smtp.insert("from".into(), Value::from(from.clone()));
        }

        let mut dict = Dict::new();
        if !smtp.is_empty() {
            dict.insert("smtp".into(), Value::from(smtp));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
