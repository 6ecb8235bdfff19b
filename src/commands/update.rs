//! Update command implementation.

use anyhow::Result;
use std::path::Path;

/// Update the description of an existing allowlist entry
pub async fn run(ip: &str, description: &str, config_path: &Path) -> Result<()> {
    let mut engine = super::open_engine(config_path).await?;

    if engine.update_description(ip, description).await? {
        println!("[OK] Updated description for {}", ip);
    } else {
        println!("{} is not in the allowlist", ip);
    }

    Ok(())
}
