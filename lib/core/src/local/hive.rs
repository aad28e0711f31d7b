//! Stand-in `HiveService` for running the daemon without a real catalog:
//! logs the calls a deployment's catalog integration would receive.

use log::info;

use sink_common::Record;

use crate::error::Result;
use crate::interfaces::{HiveService, Schema};

pub struct LoggingHiveService;

impl HiveService for LoggingHiveService {
    fn create_hive_table(&self, schema: &Schema) -> Result<()> {
        info!("catalog: create table for schema {}", schema.name);
        Ok(())
    }

    fn alter_hive_schema(&self, schema: &Schema) -> Result<()> {
        info!("catalog: alter table for schema {}", schema.name);
        Ok(())
    }

    fn add_hive_partition(&self, record: &Record, schema: Option<&Schema>) -> Result<()> {
        info!(
            "catalog: add partition for {}-{} (schema {:?})",
            record.topic,
            record.partition,
            schema.map(|s| s.name.as_str())
        );
        Ok(())
    }
}
