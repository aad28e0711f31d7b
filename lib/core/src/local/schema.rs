//! In-memory stand-ins for the schema-registry collaborators of spec §6
//! (`SchemaTracker`/`SchemaCompatibility`), for running the daemon without
//! a real registry: the last schema seen per name is remembered for the
//! lifetime of the process, and a change is whatever the tracker hasn't
//! seen under that name yet.

use std::collections::BTreeMap;

use sink_common::Record;

use crate::error::Result;
use crate::interfaces::{Schema, SchemaCompatibility, SchemaTracker};

#[derive(Default)]
pub struct InMemorySchemaTracker {
    by_name: BTreeMap<String, Schema>,
}

impl SchemaTracker for InMemorySchemaTracker {
    fn get_or_load_current_schema(&mut self, name: &str, _offset: i64) -> Result<Option<Schema>> {
        Ok(self.by_name.get(name).cloned())
    }

    fn update(&mut self, schema: Schema) {
        self.by_name.insert(schema.name.clone(), schema);
    }
}

/// Treats a record as carrying a new schema whenever its `value_schema_name`
/// doesn't match the tracker's current entry for that name. Records pass
/// through unprojected: there is no registry to reconcile field-level
/// differences against.
pub struct NameSchemaCompatibility;

impl SchemaCompatibility for NameSchemaCompatibility {
    fn should_change_schema(
        &self,
        record: &Record,
        previous: Option<&Schema>,
        _current: Option<&Schema>,
    ) -> bool {
        match (&record.value_schema_name, previous) {
            (Some(name), Some(previous)) => name != &previous.name,
            _ => false,
        }
    }

    fn project(&self, record: Record, _current: Option<&Schema>) -> std::result::Result<Record, crate::error::SinkError> {
        Ok(record)
    }
}
