use anyhow::Result;

pub mod barcode;
pub mod config;
pub mod serve;
pub mod templates;

pub fn show_usage() -> Result<()> {
    println!("🏭 NEXUS - Manufacturing Traveler Service");
    println!();
    println!("To get started:");
    println!("  🚀 nexus serve                 # Run the HTTP service");
    println!("  📋 nexus templates             # List traveler types");
    println!("  📋 nexus templates CABLE       # Show a default routing");
    println!("  🔎 nexus barcode parse <DATA>  # Decode a scanned label");
    println!("  ⚙️  nexus config show           # Print the effective configuration");
    Ok(())
}
