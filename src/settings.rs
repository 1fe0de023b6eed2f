/// This module contains the definition for esdrain configuration and command line arguments.
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use std::path::PathBuf;
use std::time::Duration;

use drain::adapters::primary::common::settings::QuerySettings;
use drain::adapters::secondary::elasticsearch::ElasticsearchStorageConfig;
use drain::utils::deserialize::{
    deserialize_datetime, deserialize_duration, deserialize_opt_duration,
};
use drain::utils::serialize::{serialize_duration, serialize_opt_duration};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Config Source Error: {}", source))]
    ConfigSource { source: common::config::Error },

    #[snafu(display("Config Merge Error: {} [{}]", msg, source))]
    ConfigMerge {
        msg: String,
        source: config::ConfigError,
    },

    #[snafu(display("Invalid Configuration: {}", msg))]
    Invalid { msg: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Logging {
    /// Directory of the daily log files, or a single log file. Logs go to
    /// stdout when missing.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Policy used to reach Elasticsearch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Retry {
    /// Attempts after the first failure.
    pub retries: u8,
    /// Wait after the first failure, doubled after each attempt.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub wait: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scan {
    /// Common prefix of the index names.
    pub prefix: String,
    #[serde(deserialize_with = "deserialize_datetime")]
    pub start: NaiveDateTime,
    #[serde(deserialize_with = "deserialize_datetime")]
    pub end: NaiveDateTime,
    /// Documents per page, `elasticsearch.scroll_page_size` when missing.
    #[serde(default)]
    pub page_size: Option<u64>,
    /// Cursor lifetime, `elasticsearch.scroll_cursor_ttl` when missing.
    #[serde(
        default,
        deserialize_with = "deserialize_opt_duration",
        serialize_with = "serialize_opt_duration"
    )]
    pub cursor_ttl: Option<Duration>,
    pub max_concurrent_scans: usize,
    #[serde(default)]
    pub query: QuerySettings,
}

impl Scan {
    pub fn page_size(&self, elasticsearch: &ElasticsearchStorageConfig) -> u64 {
        self.page_size.unwrap_or(elasticsearch.scroll_page_size)
    }

    pub fn cursor_ttl(&self, elasticsearch: &ElasticsearchStorageConfig) -> Duration {
        self.cursor_ttl.unwrap_or(elasticsearch.scroll_cursor_ttl)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub nb_threads: Option<usize>,
    #[serde(default)]
    pub logging: Logging,
    pub retry: Retry,
    pub scan: Scan,
    pub elasticsearch: ElasticsearchStorageConfig,
}

#[derive(Debug, Parser)]
#[clap(
    name = "esdrain",
    about = "Drain the documents of monthly Elasticsearch indices",
    version,
    author
)]
pub struct Opts {
    /// Defines the config directory
    ///
    /// This directory must contain 'elasticsearch' and 'esdrain' subdirectories.
    #[clap(parse(from_os_str), short = 'c', long = "config-dir")]
    pub config_dir: PathBuf,

    /// Defines the run mode in {testing, dev, prod, ...}
    ///
    /// If no run mode is provided, a default behavior will be used.
    #[clap(short = 'm', long = "run-mode")]
    pub run_mode: Option<String>,

    /// Override settings values using key=value
    #[clap(short = 's', long = "setting", multiple_occurrences = true)]
    pub settings: Vec<String>,

    #[clap(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute esdrain with the given configuration
    Run,
    /// Prints esdrain's configuration
    Config,
}

impl Settings {
    // Read the configuration from <config-dir>/esdrain and <config-dir>/elasticsearch
    pub fn new(opts: &Opts) -> Result<Self, Error> {
        let config = common::config::config_from(
            opts.config_dir.as_ref(),
            &["esdrain", "elasticsearch"],
            opts.run_mode.as_deref(),
            "ESDRAIN",
            opts.settings.clone(),
        )
        .context(ConfigSourceSnafu)?;

        let settings: Settings = config.try_deserialize().context(ConfigMergeSnafu {
            msg: String::from("Cannot convert configuration into esdrain settings"),
        })?;

        settings.validate()
    }

    fn validate(self) -> Result<Self, Error> {
        if self.scan.max_concurrent_scans == 0 {
            return Err(Error::Invalid {
                msg: String::from("scan.max_concurrent_scans must be at least 1"),
            });
        }
        if self.nb_threads == Some(0) {
            return Err(Error::Invalid {
                msg: String::from("nb_threads must be at least 1"),
            });
        }
        Ok(self)
    }
}
