use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use linedb::server::{Server, ServerConfig};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[clap(name = "linedb")]
#[clap(about = "A small relational database served over a line protocol")]
struct Cli {
    /// Address to listen on.
    #[clap(short, long, env = "LINEDB_LISTEN", default_value_t = String::from("127.0.0.1:8888"))]
    listen: String,

    /// Folder holding one JSON file per database.
    #[clap(short, long, env = "LINEDB_DATA_DIR", default_value = "databases")]
    data_dir: PathBuf,

    /// Keep all databases in memory and ignore --data-dir.
    #[clap(long)]
    in_memory: bool,
}

impl Cli {
    fn server_config(self) -> ServerConfig {
        ServerConfig {
            listen_addr: self.listen,
            data_dir: (!self.in_memory).then_some(self.data_dir),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Cli::parse().server_config();
    let server = Server::bind(&config).await?;
    server
        .serve_until(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received interrupt");
            }
        })
        .await?;
    Ok(())
}
