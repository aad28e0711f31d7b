//! Configuration for the per-partition sink writer.
//!
//! Uses [Config](https://docs.rs/config/latest/config/index.html), loading
//! from defaults, an optional file, and `SINK_`-prefixed environment
//! variables (environment overrides file, which overrides defaults).

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use config::Config;
use serde::{Deserialize, Serialize};

const DEFAULT_FLUSH_SIZE: fn() -> u64 = || 1000;
const DEFAULT_ZERO_PAD_WIDTH: fn() -> usize = || 10;
const DEFAULT_RETRY_BACKOFF_MS: fn() -> i64 = || 5000;
const DEFAULT_TIMEZONE: fn() -> String = || "UTC".to_string();
const DEFAULT_SCHEMA_COMPATIBILITY: fn() -> String = || "NONE".to_string();

#[derive(Debug, Deserialize, Serialize, Clone)]
struct SinkConfigOptions {
    #[serde(rename = "topics.dir")]
    topics_dir: PathBuf,

    #[serde(rename = "logs.dir")]
    logs_dir: PathBuf,

    #[serde(rename = "flush.size", default = "DEFAULT_FLUSH_SIZE")]
    flush_size: u64,

    /// 0 disables record-time rotation.
    #[serde(rename = "rotate.interval.ms", default)]
    rotate_interval_ms: i64,

    /// 0 disables scheduled rotation.
    #[serde(rename = "rotate.schedule.interval.ms", default)]
    rotate_schedule_interval_ms: i64,

    #[serde(rename = "partitioner.timezone", default = "DEFAULT_TIMEZONE")]
    partitioner_timezone: String,

    #[serde(rename = "retry.backoff.ms", default = "DEFAULT_RETRY_BACKOFF_MS")]
    retry_backoff_ms: i64,

    #[serde(
        rename = "filename.offset.zero.pad.width",
        default = "DEFAULT_ZERO_PAD_WIDTH"
    )]
    filename_offset_zero_pad_width: usize,

    #[serde(rename = "hive.integration", default)]
    hive_integration: bool,

    #[serde(
        rename = "schema.compatibility",
        default = "DEFAULT_SCHEMA_COMPATIBILITY"
    )]
    schema_compatibility: String,

    #[serde(rename = "multi.schema.support", default)]
    multi_schema_support: bool,
}

impl Default for SinkConfigOptions {
    fn default() -> Self {
        SinkConfigOptions {
            topics_dir: PathBuf::from("topics"),
            logs_dir: PathBuf::from("logs"),
            flush_size: DEFAULT_FLUSH_SIZE(),
            rotate_interval_ms: 0,
            rotate_schedule_interval_ms: 0,
            partitioner_timezone: DEFAULT_TIMEZONE(),
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS(),
            filename_offset_zero_pad_width: DEFAULT_ZERO_PAD_WIDTH(),
            hive_integration: false,
            schema_compatibility: DEFAULT_SCHEMA_COMPATIBILITY(),
            multi_schema_support: false,
        }
    }
}

/// Recognized configuration options of the sink writer (spec §6), consumed
/// at `PartitionWriter` construction.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub topics_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub flush_size: u64,
    pub rotate_interval_ms: i64,
    pub rotate_schedule_interval_ms: i64,
    pub partitioner_timezone: String,
    pub retry_backoff_ms: i64,
    pub filename_offset_zero_pad_width: usize,
    pub hive_integration: bool,
    pub schema_compatibility: String,
    pub multi_schema_support: bool,
}

impl From<SinkConfigOptions> for SinkConfig {
    fn from(val: SinkConfigOptions) -> Self {
        SinkConfig {
            topics_dir: val.topics_dir,
            logs_dir: val.logs_dir,
            flush_size: val.flush_size,
            rotate_interval_ms: val.rotate_interval_ms,
            rotate_schedule_interval_ms: val.rotate_schedule_interval_ms,
            partitioner_timezone: val.partitioner_timezone,
            retry_backoff_ms: val.retry_backoff_ms,
            filename_offset_zero_pad_width: val.filename_offset_zero_pad_width,
            hive_integration: val.hive_integration,
            schema_compatibility: val.schema_compatibility,
            multi_schema_support: val.multi_schema_support,
        }
    }
}

impl SinkConfig {
    pub fn from_file(file: &str) -> Result<Self> {
        let builder = Config::builder()
            .add_source(config::File::from_str(
                serde_json::to_string(&SinkConfigOptions::default())?.as_str(),
                config::FileFormat::Json,
            ))
            .add_source(config::File::with_name(file))
            .add_source(config::Environment::with_prefix("SINK").separator("_"));

        let config: SinkConfigOptions = builder.build()?.try_deserialize()?;
        Self::check(&config)?;
        Ok(config.into())
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let builder = Config::builder()
            .add_source(config::File::from_str(
                serde_json::to_string(&SinkConfigOptions::default())?.as_str(),
                config::FileFormat::Json,
            ))
            .add_source(config::File::from_str(s, config::FileFormat::Json))
            .add_source(config::Environment::with_prefix("SINK").separator("_"));

        let config: SinkConfigOptions = builder.build()?.try_deserialize()?;
        Self::check(&config)?;
        Ok(config.into())
    }

    pub fn from_yaml(s: &str) -> Result<Self> {
        let builder = Config::builder()
            .add_source(config::File::from_str(
                serde_json::to_string(&SinkConfigOptions::default())?.as_str(),
                config::FileFormat::Json,
            ))
            .add_source(config::File::from_str(s, config::FileFormat::Yaml))
            .add_source(config::Environment::with_prefix("SINK").separator("_"));

        let config: SinkConfigOptions = builder.build()?.try_deserialize()?;
        Self::check(&config)?;
        Ok(config.into())
    }

    pub fn from_env() -> Result<Self> {
        let builder = Config::builder()
            .add_source(config::File::from_str(
                serde_json::to_string(&SinkConfigOptions::default())?.as_str(),
                config::FileFormat::Json,
            ))
            .add_source(config::Environment::with_prefix("SINK").separator("_"));

        let config: SinkConfigOptions = builder.build()?.try_deserialize()?;
        Self::check(&config)?;
        Ok(config.into())
    }

    fn check(config: &SinkConfigOptions) -> Result<()> {
        if config.topics_dir.as_os_str().is_empty() {
            return Err(anyhow!("topics.dir must be set"));
        }
        if config.logs_dir.as_os_str().is_empty() {
            return Err(anyhow!("logs.dir must be set"));
        }
        if config.flush_size == 0
            && config.rotate_interval_ms <= 0
            && config.rotate_schedule_interval_ms <= 0
        {
            log::warn!(
                "no rotation policy configured (flush.size, rotate.interval.ms, \
                 rotate.schedule.interval.ms are all disabled); files will never be committed"
            );
        }
        if config.partitioner_timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(anyhow!(
                "invalid partitioner.timezone: {}",
                config.partitioner_timezone
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
