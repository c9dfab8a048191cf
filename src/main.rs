use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use smelter::registry::ClientRegistry;
use smelter::server::{self, ServerConfig};

#[derive(Parser)]
#[command(name = "smelter")]
#[command(version, about = "On-demand cross-compilation service")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the build service (admin panel and client endpoint)
    Serve {
        /// Address both listeners bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the admin panel and build trigger
        #[arg(long, default_value = "9090")]
        admin_port: u16,

        /// Port for the endpoint built clients call home to
        #[arg(long, default_value = "8080")]
        client_port: u16,

        /// Path of the append-only client registry
        #[arg(long, default_value = "clients.jsonl")]
        registry: PathBuf,

        /// Build toolchain binary to invoke
        #[arg(long, default_value = "go")]
        toolchain: String,
    },
    /// Print every recorded build request as JSON
    Clients {
        /// Path of the append-only client registry
        #[arg(long, default_value = "clients.jsonl")]
        registry: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("smelter=debug,info")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve {
            host,
            admin_port,
            client_port,
            registry,
            toolchain,
        } => {
            server::serve(ServerConfig {
                host,
                admin_port,
                client_port,
                registry_path: registry,
                toolchain,
            })
            .await?;
        }
        Commands::Clients { registry } => {
            let registry = ClientRegistry::new(registry);
            let records = registry.list_all().await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }

    Ok(())
}
