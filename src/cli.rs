//! Command-line surface: `run` starts the service (the default when no
//! subcommand is given), `add-token`/`export`/`import` manage the auth
//! store without starting any listeners. Flag names and short forms
//! mirror the Go original's `cobra`/`viper` flag set one-for-one.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Configuration;

#[derive(Debug, Parser)]
#[command(name = "logdeck", about = "Lightweight multi-protocol log aggregation daemon")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Optional TOML config file; values here override its contents.
    #[arg(long, global = true)]
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the service (collectors, fan-out engine, reaper, HTTP API).
    Run,
    /// Add a token to the auth store.
    AddToken {
        #[arg(long)]
        token: String,
    },
    /// Export the auth store's tokens as a JSON array.
    Export {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Import tokens from a JSON array.
    Import {
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// API listen address (same endpoint for HTTP log collection)
    #[arg(short = 'a', long)]
    pub listen_http: Option<String>,

    /// UDP log collection endpoint
    #[arg(short = 'u', long)]
    pub listen_udp: Option<String>,

    /// TCP log collection endpoint
    #[arg(short = 't', long)]
    pub listen_tcp: Option<String>,

    /// Log publisher (pub/sub) address
    #[arg(short = 'p', long)]
    pub pub_address: Option<String>,

    /// Log storage address (`boltdb://…` / `file://…`)
    #[arg(short = 'd', long)]
    pub db_address: Option<String>,

    /// Address or file location of the auth db; empty disables auth
    #[arg(short = 'A', long)]
    pub auth_address: Option<String>,

    /// Age or count of logs to keep per type, as a JSON object
    #[arg(short = 'k', long)]
    pub log_keep: Option<String>,

    /// Level at which to log
    #[arg(short = 'l', long)]
    pub log_level: Option<String>,

    /// Default type to apply to incoming logs
    #[arg(short = 'L', long)]
    pub log_type: Option<String>,

    /// Admin token securing `/add-token` and `/remove-token`
    #[arg(short = 'T', long)]
    pub token: Option<String>,

    /// Seconds between retention reaper sweeps
    #[arg(long)]
    pub cleanup_frequency_secs: Option<u64>,

    /// Disable TLS
    #[arg(long)]
    pub insecure: bool,

    /// Allowed CORS origin
    #[arg(long)]
    pub cors_origin: Option<String>,
}

impl ConfigArgs {
    /// Overlay the parsed flags onto a base configuration (defaults, or a
    /// loaded TOML file); only flags actually given on the command line
    /// override their base value.
    pub fn apply(&self, mut base: Configuration) -> Configuration {
        if let Some(v) = &self.listen_http {
            base.listen_http = v.clone();
        }
        if let Some(v) = &self.listen_udp {
            base.listen_udp = v.clone();
        }
        if let Some(v) = &self.listen_tcp {
            base.listen_tcp = v.clone();
        }
        if let Some(v) = &self.pub_address {
            base.publisher_address = v.clone();
        }
        if let Some(v) = &self.db_address {
            base.archive_db = v.clone();
        }
        if let Some(v) = &self.auth_address {
            base.auth_db = v.clone();
        }
        if let Some(v) = &self.log_keep {
            base.retention_policy = v.clone();
        }
        if let Some(v) = &self.log_level {
            base.default_log_level = v.clone();
        }
        if let Some(v) = &self.log_type {
            base.default_type = v.clone();
        }
        if let Some(v) = &self.token {
            base.admin_token = v.clone();
        }
        if let Some(v) = self.cleanup_frequency_secs {
            base.cleanup_frequency_secs = v;
        }
        if self.insecure {
            base.insecure = true;
        }
        if let Some(v) = &self.cors_origin {
            base.cors_origin = v.clone();
        }
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_flags_leave_defaults_untouched() {
        let args = ConfigArgs {
            listen_http: None,
            listen_udp: None,
            listen_tcp: None,
            pub_address: None,
            db_address: None,
            auth_address: None,
            log_keep: None,
            log_level: None,
            log_type: None,
            token: None,
            cleanup_frequency_secs: None,
            insecure: false,
            cors_origin: None,
        };
        let config = args.apply(Configuration::default());
        assert_eq!(config, Configuration::default());
    }

    #[test]
    fn given_flags_override_the_base_config() {
        let args = ConfigArgs {
            listen_http: Some("0.0.0.0:9000".to_string()),
            listen_udp: None,
            listen_tcp: None,
            pub_address: None,
            db_address: None,
            auth_address: None,
            log_keep: None,
            log_level: None,
            log_type: None,
            token: Some("swordfish".to_string()),
            cleanup_frequency_secs: None,
            insecure: true,
            cors_origin: None,
        };
        let config = args.apply(Configuration::default());
        assert_eq!(config.listen_http, "0.0.0.0:9000");
        assert_eq!(config.admin_token, "swordfish");
        assert!(config.insecure);
    }
}
