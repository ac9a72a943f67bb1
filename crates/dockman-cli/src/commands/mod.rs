//! CLI command implementations

mod lifecycle;
mod manage;

use anyhow::{anyhow, Result};
use dockman_core::{bounded, Controller};
use dockman_provider::ContainerSummary;

pub use lifecycle::*;
pub use manage::*;

/// Find a container by id, name, or an unambiguous prefix of either
async fn find_container(controller: &Controller, name_or_id: &str) -> Result<ContainerSummary> {
    let name_or_id = name_or_id.trim_start_matches('/');
    let containers = bounded(controller.call_timeout(), controller.runtime().list(true)).await?;

    // Exact id or name first
    if let Some(found) = containers
        .iter()
        .find(|c| c.id.0 == name_or_id || c.id.short() == name_or_id || c.display_name() == name_or_id)
    {
        return Ok(found.clone());
    }

    let matches: Vec<_> = containers
        .iter()
        .filter(|c| c.id.0.starts_with(name_or_id) || c.display_name().starts_with(name_or_id))
        .collect();

    match matches.len() {
        0 => Err(anyhow!("Container '{}' not found", name_or_id)),
        1 => Ok(matches[0].clone()),
        _ => Err(anyhow!(
            "Ambiguous container reference '{}', matches: {}",
            name_or_id,
            matches
                .iter()
                .map(|c| c.display_name())
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}
