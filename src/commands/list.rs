//! List command implementation.

use anyhow::Result;
use std::path::Path;

/// List all allowlist entries, oldest first
pub async fn run(config_path: &Path) -> Result<()> {
    let engine = super::open_engine(config_path).await?;
    let entries = engine.allowed_ips();

    println!();
    println!("Allowlist ({} entries):", entries.len());
    println!();

    if entries.is_empty() {
        println!("  (empty)");
    } else {
        for entry in entries {
            if entry.description.is_empty() {
                println!("  {:<43} added {}", entry.ip, entry.created_at);
            } else {
                println!(
                    "  {:<43} added {}  # {}",
                    entry.ip, entry.created_at, entry.description
                );
            }
        }
    }
    println!();

    Ok(())
}
