//! Rename command implementation.

use anyhow::Result;
use std::path::Path;

/// Re-key an allowlist entry, carrying its creation time forward
pub async fn run(old_ip: &str, new_ip: &str, description: &str, config_path: &Path) -> Result<()> {
    let mut engine = super::open_engine(config_path).await?;

    if engine.rename_allowed_ip(old_ip, new_ip, description).await? {
        println!("[OK] Renamed {} to {}", old_ip, new_ip);
    } else {
        println!(
            "Rename not applied: {} is missing or {} is already taken",
            old_ip, new_ip
        );
    }

    Ok(())
}
