//! Container listing via `docker ps`

use std::time::Duration;

use async_trait::async_trait;
use autofwd_common::{shell, ContainerLister, ContainerRecord, FwdError, FwdResult};

use crate::commands::build_docker_ps_args;
use crate::config::ForwarderConfig;

/// Lists running containers by shelling out to the docker CLI
#[derive(Debug, Clone)]
pub struct DockerLister {
    program: String,
    timeout: Duration,
}

impl DockerLister {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ForwarderConfig) -> Self {
        Self::new(config.docker_command.clone(), config.list_timeout())
    }
}

#[async_trait]
impl ContainerLister for DockerLister {
    async fn list(&self) -> FwdResult<Vec<ContainerRecord>> {
        let stdout = shell::exec_or_throw(&self.program, &build_docker_ps_args(), self.timeout).await?;
        parse_listing(&stdout)
    }
}

/// Decode `docker ps --format '{{json .}}'` output, one object per line.
///
/// Stray single quotes from a shell-quoted template are removed. Blank lines
/// and `null` entries are skipped; any other undecodable line fails the
/// whole listing.
pub fn parse_listing(stdout: &str) -> FwdResult<Vec<ContainerRecord>> {
    let mut records = Vec::new();

    for (idx, line) in stdout.lines().enumerate() {
        let line = line.replace('\'', "");
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record: Option<ContainerRecord> = serde_json::from_str(line)
            .map_err(|e| FwdError::malformed_listing(idx + 1, e.to_string()))?;
        records.extend(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"{"Command":"\"docker-entrypoint.s…\"","ID":"9b2a","Image":"postgres:16","Names":"db","Ports":"0.0.0.0:5432->5432/tcp, :::5432->5432/tcp","State":"running"}
{"Command":"\"/bin/sh\"","ID":"1c3d","Image":"alpine","Names":"idle","Ports":"","State":"running"}
"#;

    #[test]
    fn test_parse_listing() {
        let records = parse_listing(LISTING).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].label(), "db");
        assert_eq!(
            records[0].port_spec(),
            Some("0.0.0.0:5432->5432/tcp, :::5432->5432/tcp")
        );
        assert_eq!(records[1].port_spec(), None);
    }

    #[test]
    fn test_parse_listing_quoted_template() {
        let records = parse_listing("'{\"ID\":\"x\",\"Ports\":\"80/tcp\"}'\n").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].port_spec(), Some("80/tcp"));
    }

    #[test]
    fn test_parse_listing_empty_and_null() {
        assert!(parse_listing("").unwrap().is_empty());
        assert!(parse_listing("\n\nnull\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_listing_malformed() {
        let result = parse_listing("{\"ID\":\"ok\"}\nnot json\n");
        match result {
            Err(FwdError::MalformedListing { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected MalformedListing, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_missing_docker_binary() {
        let lister = DockerLister::new("/nonexistent/docker", Duration::from_secs(1));
        assert!(matches!(lister.list().await, Err(FwdError::ShellExec { .. })));
    }

    #[tokio::test]
    async fn test_list_non_zero_exit() {
        let lister = DockerLister::new("false", Duration::from_secs(1));
        assert!(matches!(
            lister.list().await,
            Err(FwdError::ShellCommandFailed { .. })
        ));
    }
}
