//! Reference adapters for the collaborator traits of `interfaces` (spec
//! §6). These are a local filesystem/Parquet stand-in for the real
//! object store, schema registry and catalog a deployment would plug in
//! — useful for tests and for running the daemon against a plain disk.

pub mod clock;
pub mod context;
pub mod fs;
pub mod hive;
pub mod parquet_writer;
pub mod partitioner;
pub mod schema;
pub mod wallclock;
