use std::{fmt::Display, path::PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;

use asynclog::config::LocalConfigManager;

mod bench;
mod info;
mod serve;

#[derive(Subcommand, Debug)]
pub enum AsynclogCmd {
    Serve(serve::Cmd),

    Bench(bench::Cmd),

    Info(info::Cmd),
}

impl Display for AsynclogCmd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AsynclogCmd::Serve(cmd) => write!(f, "serve {}", cmd.port),
            AsynclogCmd::Bench(_cmd) => write!(f, "bench"),
            AsynclogCmd::Info(_cmd) => write!(f, "info"),
        }
    }
}

#[derive(Parser)]
#[command(version, long_version = "")]
#[command(about = "Asynchronous logging pipeline and backup log collector.", long_about = None, disable_help_subcommand = true)]
pub struct Asynclog {
    #[arg(
        global = true,
        long,
        help = "Pipeline config file. Defaults to $XDG_CONFIG_HOME/asynclog/config.json, falling back to built-in defaults when absent.",
        display_order = 0
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        global = true,
        help = "Write verbose messages to stderr for debugging.",
        display_order = 999
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: AsynclogCmd,
}

impl Asynclog {
    fn log_filter(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::OFF,
            1 => LevelFilter::ERROR,
            2 => LevelFilter::WARN,
            3 => LevelFilter::INFO,
            4 => LevelFilter::DEBUG,
            5_u8..=u8::MAX => LevelFilter::TRACE,
        }
    }

    fn setup_logging(&self) {
        tracing_subscriber::fmt()
            .with_max_level(self.log_filter())
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
    }

    pub fn run(self) -> eyre::Result<()> {
        self.setup_logging();

        tracing::info!(target: "asynclog", "running command {}", &self.cmd);
        tracing::trace!(target: "asynclog", "log level: {}", self.log_filter());

        let config = LocalConfigManager::new(self.config.clone());
        let result = match &self.cmd {
            AsynclogCmd::Serve(serve) => {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .build()?;
                runtime.block_on(serve.run())
            }
            AsynclogCmd::Bench(bench) => bench.run(&config),
            AsynclogCmd::Info(info) => info.run(&config),
        };

        if let Err(msg) = &result {
            tracing::error!(target: "asynclog", "failed running command {}, error={} cause={}", &self.cmd, msg, msg.root_cause());
        }

        result
    }
}
