//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged with
//! the configuration from the `incidentd.toml` file and environment variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Incident fan-out and on-call escalation service.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Interface to bind the HTTP server to.
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to bind the HTTP server to.
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Log filter, e.g. `info` or `incidentd=debug`.
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Enable or disable on-call escalation.
    #[arg(long, value_name = "BOOL")]
    pub oncall_enable: Option<bool>,

    /// Minutes to wait for an acknowledgment before paging.
    #[arg(long, value_name = "MINUTES")]
    pub oncall_wait_minutes: Option<u64>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        let mut server = Dict::new();
        if let Some(host) = &self.host {
            server.insert("host".into(), Value::from(host.clone()));
        }
        if let Some(port) = self.port {
            server.insert("port".into(), Value::from(port));
        }
        if !server.is_empty() {
            dict.insert("server".into(), Value::Dict(Tag::Default, server));
        }

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        let mut oncall = Dict::new();
        if let Some(enable) = self.oncall_enable {
            oncall.insert("enable".into(), Value::from(enable));
        }
        if let Some(minutes) = self.oncall_wait_minutes {
            oncall.insert("wait_minutes".into(), Value::from(minutes));
        }
        if !oncall.is_empty() {
            dict.insert("oncall".into(), Value::Dict(Tag::Default, oncall));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
