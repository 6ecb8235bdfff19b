//! Add command implementation.

use anyhow::Result;
use std::path::Path;

/// Add an IP/CIDR to the allowlist, locally and remotely
pub async fn run(ip: &str, description: &str, config_path: &Path) -> Result<()> {
    let mut engine = super::open_engine(config_path).await?;

    if engine.add_allowed_ip(ip, description).await? {
        println!("[OK] Added {} to allowlist", ip);
    } else {
        println!("{} is already in the allowlist", ip);
    }

    Ok(())
}
