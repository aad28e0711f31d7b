//! Per-partition sink writer core: recovery, buffered writes, rotation,
//! WAL bookkeeping and commit for one source partition's stream into a
//! content-addressed object store.

pub mod commit;
pub mod error;
pub mod interfaces;
pub mod local;
pub mod naming;
pub mod registry;
pub mod rotation;
pub mod schema;
pub mod state;
pub mod wal;

#[cfg(test)]
mod tests;

pub use error::{Result, SinkError};
pub use interfaces::{
    Clock, HiveService, PartitionField, Partitioner, RecordWriter, RecordWriterProvider, Schema,
    SchemaCompatibility, SchemaTracker, SinkTaskContext, Storage, TimestampExtractor,
    TopicPartition, Wal,
};
pub use rotation::RotationConfig;
pub use state::{PartitionWriter, State, WriterConfig};
