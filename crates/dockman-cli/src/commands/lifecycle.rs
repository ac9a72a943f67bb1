//! Lifecycle commands: start, stop, restart, rm and whole-project operations

use anyhow::{bail, Result};
use dockman_core::{Controller, ProjectReport};
use dockman_provider::{ActionOutcome, ContainerState};

use super::find_container;

/// Operations applied to every container of a Compose project
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProjectOp {
    /// Start every container
    Up,
    /// Stop every container
    Down,
    /// Stop every container, then start them all
    Restart,
    /// Force-remove every container
    Rm,
}

impl ProjectOp {
    fn verb(&self) -> &'static str {
        match self {
            Self::Up => "Started",
            Self::Down => "Stopped",
            Self::Restart => "Restarted",
            Self::Rm => "Removed",
        }
    }
}

/// Start a container
pub async fn start(controller: &Controller, container: &str) -> Result<()> {
    let target = find_container(controller, container).await?;
    let name = target.display_name();
    match controller.start(&target.id).await? {
        ActionOutcome::Applied => println!("Started '{}'", name),
        ActionOutcome::AlreadyDone => println!("Container '{}' is already running", name),
    }
    Ok(())
}

/// Stop a container; stopping a stopped container is not an error
pub async fn stop(controller: &Controller, container: &str) -> Result<()> {
    let target = find_container(controller, container).await?;
    let name = target.display_name();
    println!("Stopping '{}'...", name);
    match controller.stop(&target.id).await? {
        ActionOutcome::Applied => println!("Stopped '{}'", name),
        ActionOutcome::AlreadyDone => println!("Container '{}' is already stopped", name),
    }
    Ok(())
}

pub async fn restart(controller: &Controller, container: &str) -> Result<()> {
    let target = find_container(controller, container).await?;
    let name = target.display_name();
    println!("Restarting '{}'...", name);
    controller.restart(&target.id).await?;
    println!("Restarted '{}'", name);
    Ok(())
}

/// Remove a container
pub async fn remove(controller: &Controller, container: &str, force: bool) -> Result<()> {
    let target = find_container(controller, container).await?;
    let name = target.display_name();

    if !force && target.state == ContainerState::Running {
        bail!("Container '{}' is running (use --force)", name);
    }

    match controller.remove(&target.id, force).await? {
        ActionOutcome::Applied => println!("Removed '{}'", name),
        ActionOutcome::AlreadyDone => println!("Container '{}' was already removed", name),
    }
    Ok(())
}

/// Apply `op` to every container of `project`. Fails if any member failed.
pub async fn project(controller: &Controller, op: ProjectOp, project: &str) -> Result<ProjectReport> {
    let report = match op {
        ProjectOp::Up => controller.start_project(project).await?,
        ProjectOp::Down => controller.stop_project(project).await?,
        ProjectOp::Restart => controller.restart_project(project).await?,
        ProjectOp::Rm => controller.remove_project(project).await?,
    };

    for name in &report.succeeded {
        println!("  {} {}", op.verb(), name);
    }
    for (name, error) in &report.failed {
        eprintln!("  Failed {}: {}", name, error);
    }

    if !report.is_success() {
        bail!(
            "{} of {} containers in project '{}' failed",
            report.failed.len(),
            report.failed.len() + report.succeeded.len(),
            report.project
        );
    }
    println!(
        "{} {} containers in project '{}'",
        op.verb(),
        report.succeeded.len(),
        report.project
    );
    Ok(report)
}
