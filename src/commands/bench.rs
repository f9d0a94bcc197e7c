use std::{path::PathBuf, sync::Arc, thread, time::Instant};

use clap::Parser;
use eyre::{Context, OptionExt};

use asynclog::{
    config::ConfigManager,
    logging::{Level, Logger},
    LogContext,
};

#[derive(Parser, Clone, Debug)]
pub struct Cmd {
    #[arg(short, long, default_value_t = 10_000, help = "Records to log in total.")]
    pub count: usize,

    #[arg(short, long, default_value_t = 1, help = "Producer threads sharing the count.")]
    pub threads: usize,

    #[arg(
        long,
        default_value = "./logfile",
        help = "Directory for the plain and the rolling log file."
    )]
    pub dir: PathBuf,

    #[arg(long, default_value_t = 1024 * 1024, help = "Roll-over size in bytes.")]
    pub max_size: u64,

    #[arg(
        long,
        default_value_t = 0,
        help = "Log every Nth record at ERROR so it is also backed up. 0 disables."
    )]
    pub error_every: usize,

    #[arg(long, default_value = "asynclogger", help = "Name of the benchmark logger.")]
    pub logger: String,
}

impl Cmd {
    pub fn run(&self, config: &impl ConfigManager) -> eyre::Result<()> {
        let config = config.load()?;
        let context = LogContext::init(config).context("Failed initializing log context")?;

        let rolling_base = self.dir.join("RollFile_log");
        let logger = context
            .logger_builder(self.logger.clone())
            .with_file_sink(self.dir.join("FileFlush.log"))
            .with_rolling_file_sink(rolling_base.to_string_lossy(), self.max_size)
            .build()?;
        let logger = context
            .add_logger(logger)
            .ok_or_eyre("benchmark logger missing from registry")?;

        println!("Logging {} records from {} threads", self.count, self.threads.max(1));
        let start = Instant::now();

        let threads = self.threads.max(1);
        let producers: Vec<_> = (0..threads)
            .map(|t| {
                let logger = Arc::clone(&logger);
                let share = self.count / threads + usize::from(t < self.count % threads);
                let error_every = self.error_every;
                thread::spawn(move || produce(&logger, t, share, error_every))
            })
            .collect();
        for producer in producers {
            producer
                .join()
                .map_err(|_| eyre::eyre!("producer thread panicked"))?;
        }
        let produced = start.elapsed();

        context.shutdown();
        let drained = start.elapsed();

        println!("Produced:    {} ms", produced.as_millis());
        println!("Drained:     {} ms", drained.as_millis());
        println!(
            "Throughput:  {:.0} msg/s",
            self.count as f64 / drained.as_secs_f64().max(f64::EPSILON)
        );
        Ok(())
    }
}

fn produce(logger: &Logger, thread: usize, count: usize, error_every: usize) {
    for i in 0..count {
        let level = if error_every > 0 && (i + 1) % error_every == 0 {
            Level::Error
        } else {
            Level::Info
        };
        asynclog::log_at!(logger, level, "benchmark record {} from producer {}", i, thread);
    }
}
