//! Read-only commands: ps, logs, config

use anyhow::{bail, Context, Result};
use dockman_config::GlobalConfig;
use dockman_core::{bounded, Controller, ProjectGroup, ReconcileOutcome, Reconciler};
use dockman_provider::LogConfig;
use std::io::Write;
use std::path::Path;

use super::find_container;

const NAME_WIDTH: usize = 28;
const IMAGE_WIDTH: usize = 24;
const STATUS_WIDTH: usize = 24;

/// Run one reconciliation pass and print the grouped listing.
///
/// Without `all` only running containers are shown; groups left empty are
/// skipped.
pub async fn ps(controller: &Controller, all: bool, json: bool, out: &mut impl Write) -> Result<()> {
    let mut reconciler = Reconciler::new();
    let outcome = reconciler
        .poll_once(&**controller.runtime(), controller.call_timeout())
        .await;
    if let ReconcileOutcome::Failed(message) = outcome {
        bail!("{}", message);
    }

    let groups: Vec<ProjectGroup> = reconciler
        .current_groups()
        .into_iter()
        .map(|mut group| {
            if !all {
                group.containers.retain(|c| c.status_class.is_running());
            }
            group
        })
        .filter(|group| !group.containers.is_empty())
        .collect();

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&groups_json(&groups))?)?;
        return Ok(());
    }

    if groups.is_empty() {
        let hint = if all { "" } else { " (use --all to include stopped ones)" };
        writeln!(out, "No containers found{}.", hint)?;
        return Ok(());
    }

    writeln!(
        out,
        "  {:<4} {:<NAME_WIDTH$} {:<IMAGE_WIDTH$} {:<STATUS_WIDTH$} PORTS",
        "#", "NAME", "IMAGE", "STATUS"
    )?;
    for group in &groups {
        writeln!(
            out,
            "{} ({}/{} running)",
            group.name,
            group.running(),
            group.containers.len()
        )?;
        for record in &group.containers {
            let symbol = if record.status_class.is_running() { "●" } else { "○" };
            writeln!(
                out,
                "{} {:<4} {:<NAME_WIDTH$} {:<IMAGE_WIDTH$} {:<STATUS_WIDTH$} {}",
                symbol,
                record.display_index,
                truncate(&record.name, NAME_WIDTH),
                truncate(&record.image, IMAGE_WIDTH),
                truncate(&record.status_raw, STATUS_WIDTH),
                record.ports
            )?;
        }
    }
    Ok(())
}

fn groups_json(groups: &[ProjectGroup]) -> serde_json::Value {
    serde_json::Value::Array(
        groups
            .iter()
            .map(|group| {
                let containers: Vec<_> = group
                    .containers
                    .iter()
                    .map(|record| {
                        serde_json::json!({
                            "index": record.display_index,
                            "id": record.id,
                            "name": record.name,
                            "image": record.image,
                            "status": record.status_raw,
                            "state": record.status_class.label(),
                            "ports": record.ports,
                            "created": record.created_at,
                        })
                    })
                    .collect();
                serde_json::json!({
                    "project": group.name,
                    "running": group.running(),
                    "containers": containers,
                })
            })
            .collect(),
    )
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
    short.push('…');
    short
}

/// Print a container's logs, following them if asked
pub async fn logs(
    controller: &Controller,
    config: &GlobalConfig,
    container: &str,
    follow: bool,
    tail: Option<String>,
    out: &mut impl Write,
) -> Result<()> {
    let target = find_container(controller, container).await?;
    let log_config = LogConfig {
        follow,
        tail: tail.unwrap_or_else(|| config.sessions.log_tail.clone()),
        timestamps: config.sessions.log_timestamps,
        ..LogConfig::default()
    };

    let mut stream = bounded(
        controller.call_timeout(),
        controller.runtime().logs(&target.id, &log_config),
    )
    .await?;

    while let Some(line) = stream
        .next_line()
        .await
        .with_context(|| format!("Log stream for '{}' failed", target.display_name()))?
    {
        writeln!(out, "{}", line)?;
        if follow {
            out.flush()?;
        }
    }
    Ok(())
}

/// Show the active configuration, or create the config file with defaults
pub fn config(path: &Path, write_default: bool, out: &mut impl Write) -> Result<()> {
    if write_default {
        if path.exists() {
            bail!("Config file {:?} already exists", path);
        }
        GlobalConfig::default().save_to(&path.to_path_buf())?;
        writeln!(out, "Created default config at {:?}", path)?;
        return Ok(());
    }

    if path.exists() {
        let config = GlobalConfig::load_from(&path.to_path_buf())?;
        writeln!(out, "# Config file: {:?}\n", path)?;
        writeln!(out, "{}", toml::to_string_pretty(&config)?)?;
    } else {
        writeln!(out, "# Config file: {:?} (not created yet)\n", path)?;
        writeln!(out, "# Default configuration:")?;
        writeln!(out, "{}", toml::to_string_pretty(&GlobalConfig::default())?)?;
        writeln!(out, "# Run 'dockman config --write-default' to create it.")?;
    }
    Ok(())
}

/// Resolve `--config` against the default location
pub fn config_path(explicit: Option<&Path>) -> Result<std::path::PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(GlobalConfig::config_path()?),
    }
}
