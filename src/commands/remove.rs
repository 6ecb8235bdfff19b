//! Remove command implementation.

use anyhow::Result;
use std::path::Path;

/// Remove an IP/CIDR from the allowlist, locally and remotely
pub async fn run(ip: &str, config_path: &Path) -> Result<()> {
    let mut engine = super::open_engine(config_path).await?;

    if engine.remove_allowed_ip(ip).await? {
        println!("[OK] Removed {} from allowlist", ip);
    } else {
        println!("{} was not in the allowlist", ip);
    }

    Ok(())
}
