//! Environment probe for base parameters.
//!
//! At startup the console asks the host for its default route and derives
//! `dev`, `gateway`, `localip` and, when readable, `mac_addr`. These values
//! only ever fill missing mandatory parameters during validation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{CreakError, Result};
use crate::plugins::Params;

/// Source of environment-derived default parameters.
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    async fn probe(&self) -> Result<Params>;
}

/// Reads the routing table with `ip r l` and the MAC address from sysfs.
#[derive(Debug, Clone)]
pub struct RouteProbe {
    ip_path: String,
    sysfs_net: PathBuf,
}

impl Default for RouteProbe {
    fn default() -> Self {
        Self {
            ip_path: "ip".into(),
            sysfs_net: PathBuf::from("/sys/class/net"),
        }
    }
}

#[async_trait]
impl NetworkProbe for RouteProbe {
    async fn probe(&self) -> Result<Params> {
        let output = Command::new(&self.ip_path)
            .args(["r", "l"])
            .output()
            .await
            .map_err(|e| CreakError::Config(format!("Failed to run {}: {}", self.ip_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CreakError::Config(format!(
                "'{} r l' failed: {}",
                self.ip_path,
                stderr.trim()
            )));
        }

        let mut params = parse_route_table(&String::from_utf8_lossy(&output.stdout));
        if let Some(dev) = params.get("dev").cloned() {
            if let Some(mac) = read_mac_address(&self.sysfs_net, &dev) {
                params.insert("mac_addr".into(), mac);
            }
        }
        debug!(params = ?params, "Probed network environment");
        Ok(params)
    }
}

/// A probe that reports nothing, for when probing is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

#[async_trait]
impl NetworkProbe for NoProbe {
    async fn probe(&self) -> Result<Params> {
        Ok(Params::new())
    }
}

/// Run `probe`, degrading to no defaults when it fails.
pub async fn base_params(probe: &dyn NetworkProbe) -> Params {
    match probe.probe().await {
        Ok(params) => params,
        Err(e) => {
            warn!(error = %e, "Network probe failed, continuing without defaults");
            Params::new()
        }
    }
}

/// Extract `gateway`, `dev` and `localip` from `ip route list` output.
///
/// The gateway follows the first `default via`; `dev` and `localip` are the
/// words after the last `dev` and `src` tokens respectively.
pub fn parse_route_table(output: &str) -> Params {
    let words: Vec<&str> = output.split_whitespace().collect();
    let mut params = Params::new();

    let gateway = words
        .windows(3)
        .find(|w| w[0] == "default" && w[1] == "via")
        .map(|w| w[2]);
    let after_last = |token: &str| {
        words
            .windows(2)
            .rev()
            .find(|w| w[0] == token)
            .map(|w| w[1])
    };

    if let Some(gateway) = gateway {
        params.insert("gateway".into(), gateway.to_string());
    }
    if let Some(dev) = after_last("dev") {
        params.insert("dev".into(), dev.to_string());
    }
    if let Some(src) = after_last("src") {
        params.insert("localip".into(), src.to_string());
    }
    params
}

/// MAC address of `dev`, skipping unreadable or all-zero addresses.
fn read_mac_address(sysfs_net: &Path, dev: &str) -> Option<String> {
    let raw = std::fs::read_to_string(sysfs_net.join(dev).join("address")).ok()?;
    let mac = raw.trim();
    if mac.is_empty() || mac == "00:00:00:00:00:00" {
        None
    } else {
        Some(mac.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ROUTES: &str = "\
default via 192.168.1.1 dev wlp3s0 proto dhcp metric 600
172.17.0.0/16 dev docker0 proto kernel scope link src 172.17.0.1 linkdown
192.168.1.0/24 dev wlp3s0 proto kernel scope link src 192.168.1.42 metric 600
";

    #[test]
    fn test_parse_route_table() {
        let params = parse_route_table(ROUTES);
        assert_eq!(params.get("gateway").map(String::as_str), Some("192.168.1.1"));
        assert_eq!(params.get("dev").map(String::as_str), Some("wlp3s0"));
        assert_eq!(params.get("localip").map(String::as_str), Some("192.168.1.42"));
    }

    #[test]
    fn test_parse_route_table_empty() {
        assert!(parse_route_table("").is_empty());
    }

    #[test]
    fn test_parse_route_table_without_default_route() {
        let params = parse_route_table("10.0.0.0/8 dev eth0 scope link src 10.0.0.5\n");
        assert!(params.get("gateway").is_none());
        assert_eq!(params.get("dev").map(String::as_str), Some("eth0"));
        assert_eq!(params.get("localip").map(String::as_str), Some("10.0.0.5"));
    }

    #[test]
    fn test_read_mac_address() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("eth0")).unwrap();
        std::fs::write(tmp.path().join("eth0/address"), "aa:bb:cc:dd:ee:ff\n").unwrap();
        std::fs::create_dir_all(tmp.path().join("lo")).unwrap();
        std::fs::write(tmp.path().join("lo/address"), "00:00:00:00:00:00\n").unwrap();

        assert_eq!(
            read_mac_address(tmp.path(), "eth0"),
            Some("aa:bb:cc:dd:ee:ff".to_string())
        );
        assert_eq!(read_mac_address(tmp.path(), "lo"), None);
        assert_eq!(read_mac_address(tmp.path(), "missing"), None);
    }

    #[tokio::test]
    async fn test_base_params_degrades_on_failure() {
        let probe = RouteProbe {
            ip_path: "definitely-not-a-real-binary-xyz".into(),
            sysfs_net: PathBuf::from("/nonexistent"),
        };
        assert!(base_params(&probe).await.is_empty());
    }

    #[tokio::test]
    async fn test_no_probe_is_empty() {
        assert!(base_params(&NoProbe).await.is_empty());
    }
}
