//! Lifecycle actions on containers and Compose projects

use crate::{bounded, CoreError, Result};
use dockman_config::GlobalConfig;
use dockman_provider::{ActionOutcome, ContainerId, ContainerRuntime, ContainerSummary};
use std::sync::Arc;
use std::time::Duration;

/// Per-container results of a project operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectReport {
    pub project: String,
    /// Container names that reached the requested state
    pub succeeded: Vec<String>,
    /// Container names with the error that stopped them
    pub failed: Vec<(String, String)>,
}

impl ProjectReport {
    fn new(project: &str) -> Self {
        Self {
            project: project.to_string(),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, name: String, result: Result<ActionOutcome>) {
        match result {
            Ok(_) => self.succeeded.push(name),
            Err(e) => self.failed.push((name, e.to_string())),
        }
    }
}

/// Runs start/stop/restart/remove with bounded call durations
#[derive(Clone)]
pub struct Controller {
    runtime: Arc<dyn ContainerRuntime>,
    call_timeout: Duration,
    stop_timeout: Option<u32>,
}

impl Controller {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, call_timeout: Duration, stop_timeout: Option<u32>) -> Self {
        Self {
            runtime,
            call_timeout,
            stop_timeout,
        }
    }

    pub fn from_config(runtime: Arc<dyn ContainerRuntime>, config: &GlobalConfig) -> Self {
        Self::new(runtime, config.call_timeout(), config.runtime.stop_timeout_secs)
    }

    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Stop and restart may legitimately take as long as the grace period
    fn stop_limit(&self) -> Duration {
        self.call_timeout + Duration::from_secs(u64::from(self.stop_timeout.unwrap_or(10)))
    }

    pub async fn start(&self, id: &ContainerId) -> Result<ActionOutcome> {
        tracing::info!("starting {}", id.short());
        Ok(bounded(self.call_timeout, self.runtime.start(id)).await?)
    }

    /// Stopping an already stopped container succeeds
    pub async fn stop(&self, id: &ContainerId) -> Result<ActionOutcome> {
        tracing::info!("stopping {}", id.short());
        Ok(bounded(self.stop_limit(), self.runtime.stop(id, self.stop_timeout)).await?)
    }

    pub async fn restart(&self, id: &ContainerId) -> Result<ActionOutcome> {
        tracing::info!("restarting {}", id.short());
        Ok(bounded(self.stop_limit(), self.runtime.restart(id, self.stop_timeout)).await?)
    }

    pub async fn remove(&self, id: &ContainerId, force: bool) -> Result<ActionOutcome> {
        tracing::info!("removing {} (force: {})", id.short(), force);
        Ok(bounded(self.call_timeout, self.runtime.remove(id, force)).await?)
    }

    /// Containers carrying the project label, compared case-insensitively
    pub async fn project_members(&self, project: &str) -> Result<Vec<ContainerSummary>> {
        let all = bounded(self.call_timeout, self.runtime.list(true)).await?;
        let members: Vec<_> = all.into_iter().filter(|c| c.in_project(project)).collect();
        if members.is_empty() {
            return Err(CoreError::EmptyProject(project.to_string()));
        }
        Ok(members)
    }

    pub async fn start_project(&self, project: &str) -> Result<ProjectReport> {
        let members = self.project_members(project).await?;
        let mut report = ProjectReport::new(project);
        for member in members {
            let result = self.start(&member.id).await;
            report.record(member.display_name(), result);
        }
        Ok(report)
    }

    pub async fn stop_project(&self, project: &str) -> Result<ProjectReport> {
        let members = self.project_members(project).await?;
        let mut report = ProjectReport::new(project);
        for member in members {
            let result = self.stop(&member.id).await;
            report.record(member.display_name(), result);
        }
        Ok(report)
    }

    /// Stop every member, then start them all. Nothing is started if any
    /// stop failed.
    pub async fn restart_project(&self, project: &str) -> Result<ProjectReport> {
        let stopped = self.stop_project(project).await?;
        if !stopped.is_success() {
            tracing::warn!("not restarting {}: {} containers failed to stop", project, stopped.failed.len());
            return Ok(stopped);
        }
        self.start_project(project).await
    }

    /// Force-remove every member
    pub async fn remove_project(&self, project: &str) -> Result<ProjectReport> {
        let members = self.project_members(project).await?;
        let mut report = ProjectReport::new(project);
        for member in members {
            let result = self.remove(&member.id, true).await;
            report.record(member.display_name(), result);
        }
        Ok(report)
    }
}
