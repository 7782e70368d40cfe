use clap::{Parser, Subcommand};

pub mod commands;

#[derive(Parser)]
#[command(name = "nexus")]
#[command(about = "Manufacturing traveler service")]
#[command(long_about = "NEXUS tracks manufacturing travelers: routings, step sign-off, labor time, \
                       approvals and audit history. Start the HTTP service with 'nexus serve'.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        /// Socket address to bind, overriding the configuration
        #[arg(long, help = "Address to listen on, e.g. 0.0.0.0:8000")]
        listen: Option<String>,
    },
    /// List traveler types, or print the default routing for one type
    Templates {
        /// Traveler type such as CABLE or PCB_ASSEMBLY
        traveler_type: Option<String>,
    },
    /// Barcode utilities
    Barcode {
        #[command(subcommand)]
        command: BarcodeCommands,
    },
    /// Configuration utilities
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum BarcodeCommands {
    /// Decode a scanned traveler barcode
    Parse {
        /// Raw scanner output
        data: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
}
