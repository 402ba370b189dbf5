//! # Launch manifest: the boundary to the configuration layer.
//!
//! Procvisor does not discover, template, or generate configuration. The
//! layer that does is outside this program; what crosses the boundary is
//! a small TOML manifest listing the services to launch, the log files to
//! follow, and the advertised front-end port:
//!
//! ```toml
//! port = 3000
//! grace_ms = 5000
//! logs = ["var/log/app.log", "var/log/web.log"]
//!
//! [[service]]
//! name = "app"
//! command = ["bin/app-server", "--port", "3001"]
//! settle_ms = 2000
//!
//! [service.env]
//! APP_ENV = "development"
//!
//! [[service]]
//! name = "web"
//! command = ["bin/front-end", "--port", "3000"]
//! ```
//!
//! Services start in manifest order, after the log aggregator; an entry's
//! `settle_ms` delays the next start.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use procvisor::LaunchSpec;

/// Task name reserved for the log aggregator.
pub const AGGREGATOR_NAME: &str = "logs";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    port: Option<u16>,
    grace_ms: Option<u64>,
    #[serde(default)]
    logs: Vec<PathBuf>,
    #[serde(default)]
    service: Vec<RawService>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawService {
    name: String,
    command: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    settle_ms: Option<u64>,
}

/// One validated service entry: the launch spec plus startup policy.
#[derive(Debug, Clone)]
pub struct ServiceEntry {
    /// Opaque launch description handed to the supervisor.
    pub spec: LaunchSpec,
    /// Delay before the next service starts.
    pub settle: Option<Duration>,
}

/// Validated launch manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Advertised front-end port (diagnostics only).
    pub port: Option<u16>,
    /// Shutdown grace override.
    pub grace: Option<Duration>,
    /// Log files the aggregator follows; empty disables the aggregator.
    pub logs: Vec<PathBuf>,
    /// Services in startup order.
    pub services: Vec<ServiceEntry>,
}

/// Loads and validates a manifest from disk.
pub fn load(path: &Path) -> Result<Manifest> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    parse(&contents).with_context(|| format!("invalid manifest {}", path.display()))
}

/// Parses and validates manifest text.
///
/// Checks:
/// - at least one service is declared,
/// - every command is non-empty,
/// - service names are unique and do not collide with the aggregator's.
pub fn parse(contents: &str) -> Result<Manifest> {
    let raw: RawManifest = toml::from_str(contents)?;
    if raw.service.is_empty() {
        bail!("manifest declares no services");
    }

    let mut seen = HashSet::new();
    if !raw.logs.is_empty() {
        seen.insert(AGGREGATOR_NAME.to_string());
    }

    let mut services = Vec::with_capacity(raw.service.len());
    for svc in raw.service {
        if svc.command.is_empty() {
            bail!("service '{}' has an empty command", svc.name);
        }
        if !seen.insert(svc.name.clone()) {
            bail!("duplicate service name '{}'", svc.name);
        }
        let mut spec = LaunchSpec::new(svc.name, svc.command);
        spec.env = svc.env;
        services.push(ServiceEntry {
            spec,
            settle: svc.settle_ms.map(Duration::from_millis),
        });
    }

    Ok(Manifest {
        port: raw.port,
        grace: raw.grace_ms.map(Duration::from_millis),
        logs: raw.logs,
        services,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
port = 3000
grace_ms = 4000
logs = ["var/log/app.log"]

[[service]]
name = "app"
command = ["bin/app-server", "--port", "3001"]
settle_ms = 2000

[service.env]
APP_ENV = "development"

[[service]]
name = "web"
command = ["bin/front-end", "--port", "3000"]
"#;

    #[test]
    fn test_sample_manifest_parses() {
        let m = parse(SAMPLE).expect("valid manifest");
        assert_eq!(m.port, Some(3000));
        assert_eq!(m.grace, Some(Duration::from_millis(4000)));
        assert_eq!(m.logs, vec![PathBuf::from("var/log/app.log")]);
        assert_eq!(m.services.len(), 2);

        let app = &m.services[0];
        assert_eq!(app.spec.name, "app");
        assert_eq!(app.spec.command[0], "bin/app-server");
        assert_eq!(app.spec.env.get("APP_ENV").map(String::as_str), Some("development"));
        assert_eq!(app.settle, Some(Duration::from_millis(2000)));

        assert_eq!(m.services[1].spec.name, "web");
        assert_eq!(m.services[1].settle, None);
    }

    #[test]
    fn test_no_services_is_rejected() {
        let err = parse("port = 3000").expect_err("must fail");
        assert!(err.to_string().contains("no services"));
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let err = parse(
            r#"
[[service]]
name = "app"
command = []
"#,
        )
        .expect_err("must fail");
        assert!(err.to_string().contains("empty command"));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let err = parse(
            r#"
[[service]]
name = "app"
command = ["a"]

[[service]]
name = "app"
command = ["b"]
"#,
        )
        .expect_err("must fail");
        assert!(err.to_string().contains("duplicate service name"));
    }

    #[test]
    fn test_aggregator_name_is_reserved_when_logs_follow() {
        let err = parse(
            r#"
logs = ["var/log/app.log"]

[[service]]
name = "logs"
command = ["a"]
"#,
        )
        .expect_err("must fail");
        assert!(err.to_string().contains("duplicate service name 'logs'"));
    }
}
