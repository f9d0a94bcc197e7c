use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use clap::Parser;
use eyre::Context;

use asynclog::backup::{BackupServer, DEFAULT_MAX_CONNECTIONS};

#[derive(Parser, Clone, Debug)]
pub struct Cmd {
    #[arg(
        index = 1,
        value_name = "PORT",
        value_parser = clap::value_parser!(u16).range(1..),
        help = "Port to accept backup records on."
    )]
    pub port: u16,

    #[arg(
        long,
        default_value = "./logfile.log",
        help = "File the received records are appended to."
    )]
    pub store: PathBuf,

    #[arg(
        long,
        default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        help = "Address to bind."
    )]
    pub bind: IpAddr,

    #[arg(
        long,
        default_value_t = DEFAULT_MAX_CONNECTIONS,
        help = "Connections handled concurrently; the rest wait in the listen backlog."
    )]
    pub max_connections: usize,
}

impl Cmd {
    pub async fn run(&self) -> eyre::Result<()> {
        let addr = SocketAddr::new(self.bind, self.port);
        let server = BackupServer::bind(addr, &self.store, self.max_connections)
            .await
            .wrap_err("Can't start backup server")?;

        println!(
            "Collecting backups on {} into {}",
            server.local_addr()?,
            server.store_path().display()
        );

        server
            .run_until(async {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    tracing::warn!(target: "asynclog", "can't listen for ctrl-c: {}", err);
                    std::future::pending::<()>().await;
                }
            })
            .await
            .context("Backup server failed")
    }
}
