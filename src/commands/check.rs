//! Check command implementation.

use anyhow::Result;
use std::path::Path;

use crate::matcher;

/// Check whether an address is covered by the allowlist
pub async fn run(ip: &str, config_path: &Path) -> Result<()> {
    let engine = super::open_engine(config_path).await?;

    if engine.is_ip_allowed(ip) {
        let matched: Vec<_> = engine
            .allowed_ips()
            .iter()
            .filter(|entry| matcher::matches(ip, &entry.ip))
            .map(|entry| entry.ip.as_str())
            .collect();
        println!("{} is ALLOWED (matched: {})", ip, matched.join(", "));
    } else {
        println!("{} is NOT allowed", ip);
    }

    Ok(())
}
