//! Stand-in `SinkTaskContext` for running the daemon standalone: there is
//! no real consumer group to pause/resume/seek, so these calls just log.

use log::{debug, info};

use crate::interfaces::{SinkTaskContext, TopicPartition};

pub struct LoggingContext;

impl SinkTaskContext for LoggingContext {
    fn pause(&self, partition: &TopicPartition) {
        debug!("pause {}-{}", partition.topic, partition.partition);
    }

    fn resume(&self, partition: &TopicPartition) {
        debug!("resume {}-{}", partition.topic, partition.partition);
    }

    fn seek(&self, partition: &TopicPartition, offset: i64) {
        info!("seek {}-{} to {offset}", partition.topic, partition.partition);
    }

    fn timeout(&self, ms: i64) {
        debug!("backoff for {ms}ms");
    }
}
