//! Container build/run interface over `docker` and `docker compose`

use serde_json::Value;
use stackctl_core::{ContainerState, ContainersConfig, ProjectConfig, StackResult, TimeoutConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::classify::{classify_failure, Change};
use crate::traits::{CommandRunner, CommandSpec};

/// Client for the local container set
pub struct ComposeClient {
    runner: Arc<dyn CommandRunner>,
    project: String,
    image: String,
    compose_file: PathBuf,
    dockerfile: PathBuf,
    build_context: PathBuf,
    env: Vec<(String, String)>,
    command_timeout: Duration,
    apply_timeout: Duration,
    build_timeout: Duration,
}

impl ComposeClient {
    /// `env` is handed to `compose up` so the workload sees its variables
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        project: &ProjectConfig,
        containers: &ContainersConfig,
        timeouts: &TimeoutConfig,
        env: Vec<(String, String)>,
    ) -> Self {
        Self {
            runner,
            project: project.name.clone(),
            image: project.image.clone(),
            compose_file: containers.compose_file.clone(),
            dockerfile: containers.dockerfile.clone(),
            build_context: containers.build_context.clone(),
            env,
            command_timeout: Duration::from_secs(timeouts.command_secs),
            apply_timeout: Duration::from_secs(timeouts.apply_secs),
            build_timeout: Duration::from_secs(timeouts.build_secs),
        }
    }

    fn compose(&self, timeout: Duration) -> CommandSpec {
        CommandSpec::new("docker", timeout).args([
            "compose".to_string(),
            "-f".to_string(),
            self.compose_file.display().to_string(),
            "-p".to_string(),
            self.project.clone(),
        ])
    }

    /// Build the workload image
    pub async fn build(&self) -> StackResult<Change> {
        let spec = CommandSpec::new("docker", self.build_timeout).args([
            "build".to_string(),
            "-t".to_string(),
            self.image.clone(),
            "-f".to_string(),
            self.dockerfile.display().to_string(),
            self.build_context.display().to_string(),
        ]);
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            return Err(classify_failure("docker build", &output));
        }
        Ok(Change::Changed(format!("built {}", self.image)))
    }

    /// `docker compose up -d`
    pub async fn up(&self) -> StackResult<Change> {
        let spec = self
            .compose(self.apply_timeout)
            .args(["up", "-d"])
            .envs(&self.env);
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            return Err(classify_failure("compose up", &output));
        }
        // compose reports progress on stderr
        let text = output.combined();
        debug!(project = %self.project, "compose up finished");
        if ["Started", "Created", "Recreated"]
            .iter()
            .any(|w| text.contains(w))
        {
            Ok(Change::Changed("containers started".to_string()))
        } else {
            Ok(Change::Unchanged("containers already running".to_string()))
        }
    }

    /// `docker compose down --remove-orphans`
    pub async fn down(&self) -> StackResult<Change> {
        let spec = self
            .compose(self.apply_timeout)
            .args(["down", "--remove-orphans"]);
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            return Err(classify_failure("compose down", &output));
        }
        let text = output.combined();
        if ["Removed", "Stopped"].iter().any(|w| text.contains(w)) {
            Ok(Change::Changed("containers removed".to_string()))
        } else {
            Ok(Change::Unchanged("no containers to remove".to_string()))
        }
    }

    /// State of every container in the project
    pub async fn ps(&self) -> StackResult<Vec<ContainerState>> {
        let spec = self
            .compose(self.command_timeout)
            .args(["ps", "--all", "--format", "json"]);
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            return Err(classify_failure("compose ps", &output));
        }
        parse_ps(&output.stdout)
    }
}

/// Older compose versions print one JSON array, newer ones one object per line
fn parse_ps(stdout: &str) -> StackResult<Vec<ContainerState>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<Value> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)?
    } else {
        trimmed
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?
    };

    Ok(entries
        .iter()
        .map(|entry| {
            let name = entry["Name"]
                .as_str()
                .or_else(|| entry["Service"].as_str())
                .unwrap_or("unknown")
                .to_string();
            let state = entry["State"].as_str().unwrap_or_default();
            let status = entry["Status"].as_str().unwrap_or(state).to_string();
            ContainerState {
                name,
                running: state.eq_ignore_ascii_case("running"),
                status,
            }
        })
        .collect())
}
