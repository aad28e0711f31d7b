//! Entry point for the sink daemon. Responsible for:
//! - Loading configuration from file or environment variables
//! - Driving one `PartitionWriter` per assigned topic-partition from
//!   NDJSON records read off stdin

use anyhow::Result;
use log::info;
use sink_config::SinkConfig;

mod app;
use app::App;

fn main() -> Result<()> {
    env_logger::init();

    let argv: Vec<String> = std::env::args().collect();

    // Load configuration from file if provided, otherwise rely on
    // environment variables / defaults. Allows both "sink-daemon" and
    // "sink-daemon config.yaml" invocations.
    let config = match argv.len() {
        1 => SinkConfig::from_env()?,
        _ => SinkConfig::from_file(&argv[1])?,
    };

    let mut app = App::new(config);

    info!("sink daemon starting");
    let stdin = std::io::stdin();
    app.run(stdin.lock())?;
    info!("sink daemon stopped");

    Ok(())
}
