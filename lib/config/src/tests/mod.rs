use super::*;

#[test]
fn defaults_apply_when_file_omits_fields() {
    let config = SinkConfig::from_yaml(
        r#"
        topics.dir: /data/topics
        logs.dir: /data/logs
        "#,
    )
    .unwrap();

    assert_eq!(config.topics_dir, PathBuf::from("/data/topics"));
    assert_eq!(config.flush_size, 1000);
    assert_eq!(config.rotate_interval_ms, 0);
    assert_eq!(config.filename_offset_zero_pad_width, 10);
    assert_eq!(config.partitioner_timezone, "UTC");
    assert!(!config.multi_schema_support);
}

#[test]
fn overrides_from_file_are_applied() {
    let config = SinkConfig::from_yaml(
        r#"
        topics.dir: /data/topics
        logs.dir: /data/logs
        flush.size: 500
        rotate.interval.ms: 60000
        rotate.schedule.interval.ms: 3600000
        partitioner.timezone: America/Los_Angeles
        hive.integration: true
        multi.schema.support: true
        "#,
    )
    .unwrap();

    assert_eq!(config.flush_size, 500);
    assert_eq!(config.rotate_interval_ms, 60000);
    assert_eq!(config.rotate_schedule_interval_ms, 3_600_000);
    assert_eq!(config.partitioner_timezone, "America/Los_Angeles");
    assert!(config.hive_integration);
    assert!(config.multi_schema_support);
}

#[test]
fn invalid_timezone_is_rejected() {
    let err = SinkConfig::from_yaml(
        r#"
        topics.dir: /data/topics
        logs.dir: /data/logs
        partitioner.timezone: Not/ARealZone
        "#,
    )
    .unwrap_err();

    assert!(err.to_string().contains("partitioner.timezone"));
}
