//! Poll-diff-update of the container view
//!
//! The [`Reconciler`] owns every [`ContainerRecord`] in a map keyed by short
//! id. A poll whose id set and (name, image) pairs match the previous one
//! only touches status fields in place. Anything else regroups: removed ids
//! are evicted, new ids get fresh records and survivors are refreshed.

use crate::bounded;
use crate::record::{
    ContainerRecord, ProjectGroup, RecordSerial, Snapshot, ERROR_GROUP, UNCATEGORIZED,
};
use dockman_provider::{ContainerRuntime, ContainerSummary, ProviderError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Result of one list call as the poll task hands it back
pub type PollResult = std::result::Result<Vec<ContainerSummary>, ProviderError>;

/// What a reconciliation pass changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing differed from the previous poll
    Unchanged,
    /// Only status text (or ports) changed; groups were not rebuilt
    StatusOnly { changed: usize },
    /// Membership or identity changed; groups were rebuilt
    Rebuilt { added: usize, removed: usize },
    /// The runtime call failed; the view shows the error group
    Failed(String),
    /// A pass was already in flight
    Skipped,
}

impl ReconcileOutcome {
    /// The view needs a redraw
    pub fn is_visible_change(&self) -> bool {
        !matches!(self, Self::Unchanged | Self::Skipped)
    }
}

/// Owner of the dashboard's container state
#[derive(Debug, Default)]
pub struct Reconciler {
    records: HashMap<String, ContainerRecord>,
    /// Group names and member ids in display order
    groups: Vec<(String, Vec<String>)>,
    error: Option<String>,
    snapshot: Option<Snapshot>,
    next_serial: u64,
    rebuilds: u64,
    passes: u64,
    in_flight: bool,
    dropped_ticks: u64,
    focused: Option<String>,
    active_group: Option<String>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the single in-flight slot. A tick that finds it taken is
    /// dropped, not queued.
    pub fn try_begin_pass(&mut self) -> bool {
        if self.in_flight {
            self.dropped_ticks += 1;
            tracing::trace!("poll still in flight, dropping tick");
            return false;
        }
        self.in_flight = true;
        true
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn dropped_ticks(&self) -> u64 {
        self.dropped_ticks
    }

    /// Apply a poll result. Always releases the in-flight slot.
    pub fn complete_pass(&mut self, result: PollResult) -> ReconcileOutcome {
        self.in_flight = false;
        self.passes += 1;
        match result {
            Ok(summaries) => self.apply(summaries),
            Err(e) => {
                let message = e.to_string();
                tracing::warn!("container poll failed: {}", message);
                self.error = Some(message.clone());
                // the next successful poll must regroup
                self.snapshot = None;
                ReconcileOutcome::Failed(message)
            }
        }
    }

    /// One complete pass against `runtime`, bounded by `timeout`
    pub async fn poll_once(
        &mut self,
        runtime: &dyn ContainerRuntime,
        timeout: Duration,
    ) -> ReconcileOutcome {
        if !self.try_begin_pass() {
            return ReconcileOutcome::Skipped;
        }
        let result = bounded(timeout, runtime.list(true)).await;
        self.complete_pass(result)
    }

    fn apply(&mut self, summaries: Vec<ContainerSummary>) -> ReconcileOutcome {
        let summaries = dedup_by_id(summaries);
        let snapshot = Snapshot::from_summaries(&summaries);
        let recovered = self.error.take().is_some();

        let fast = !recovered
            && self
                .snapshot
                .as_ref()
                .map(|prev| prev.same_identity(&snapshot))
                .unwrap_or(false);

        let outcome = if fast {
            let mut changed = 0;
            for summary in &summaries {
                if let Some(record) = self.records.get_mut(summary.id.short()) {
                    let ports = crate::record::format_ports(&summary.ports);
                    let mut touched = record.set_status(&summary.status);
                    if record.ports != ports {
                        record.ports = ports;
                        touched = true;
                    }
                    if touched {
                        changed += 1;
                    }
                }
            }
            if changed == 0 {
                ReconcileOutcome::Unchanged
            } else {
                ReconcileOutcome::StatusOnly { changed }
            }
        } else {
            let (added, removed) = self.rebuild(&summaries);
            ReconcileOutcome::Rebuilt { added, removed }
        };

        self.snapshot = Some(snapshot);
        outcome
    }

    fn rebuild(&mut self, summaries: &[ContainerSummary]) -> (usize, usize) {
        let live: HashSet<&str> = summaries.iter().map(|s| s.id.short()).collect();
        let before = self.records.len();
        self.records.retain(|id, _| live.contains(id.as_str()));
        let removed = before - self.records.len();

        let mut added = 0;
        for summary in summaries {
            match self.records.get_mut(summary.id.short()) {
                Some(record) => record.refresh(summary),
                None => {
                    self.next_serial += 1;
                    let record = ContainerRecord::from_summary(RecordSerial(self.next_serial), summary);
                    self.records.insert(record.id.clone(), record);
                    added += 1;
                }
            }
        }

        let mut projects: Vec<(String, Vec<String>)> = Vec::new();
        let mut loose = Vec::new();
        for summary in summaries {
            let id = summary.id.short().to_string();
            match summary.compose_project() {
                Some(project) => match projects.iter_mut().find(|(name, _)| name == project) {
                    Some((_, ids)) => ids.push(id),
                    None => projects.push((project.to_string(), vec![id])),
                },
                None => loose.push(id),
            }
        }
        projects.sort_by(|(a, _), (b, _)| a.to_lowercase().cmp(&b.to_lowercase()).then(a.cmp(b)));
        if !loose.is_empty() {
            projects.push((UNCATEGORIZED.to_string(), loose));
        }

        for (_, ids) in &projects {
            for (index, id) in ids.iter().enumerate() {
                if let Some(record) = self.records.get_mut(id) {
                    record.display_index = index + 1;
                }
            }
        }
        self.groups = projects;
        self.rebuilds += 1;

        if let Some(active) = &self.active_group {
            if !self.groups.iter().any(|(name, _)| name == active) {
                self.active_group = None;
            }
        }
        self.fix_focus();

        tracing::debug!(
            "rebuilt {} groups ({} added, {} removed)",
            self.groups.len(),
            added,
            removed
        );
        (added, removed)
    }

    /// Keep the focused id if it survived, else the first visible record
    fn fix_focus(&mut self) {
        if let Some(id) = &self.focused {
            if self.records.contains_key(id) && self.is_visible(id) {
                return;
            }
        }
        self.focused = self.visible_ids().first().cloned();
    }

    fn is_visible(&self, id: &str) -> bool {
        self.visible_ids().iter().any(|v| v == id)
    }

    /// Ids in display order, limited to the active group if one is set
    pub fn visible_ids(&self) -> Vec<String> {
        self.groups
            .iter()
            .filter(|(name, _)| self.active_group.as_ref().map(|a| a == name).unwrap_or(true))
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect()
    }

    /// Groups for rendering. After a failed poll this is a single error group.
    pub fn current_groups(&self) -> Vec<ProjectGroup> {
        if let Some(error) = &self.error {
            return vec![ProjectGroup {
                name: ERROR_GROUP.to_string(),
                containers: Vec::new(),
                error: Some(error.clone()),
            }];
        }
        self.groups
            .iter()
            .map(|(name, ids)| ProjectGroup {
                name: name.clone(),
                containers: ids
                    .iter()
                    .filter_map(|id| self.records.get(id).cloned())
                    .collect(),
                error: None,
            })
            .collect()
    }

    pub fn record(&self, id: &str) -> Option<&ContainerRecord> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    pub fn pass_count(&self) -> u64 {
        self.passes
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Compose project names in display order
    pub fn project_names(&self) -> Vec<String> {
        self.groups
            .iter()
            .map(|(name, _)| name.clone())
            .filter(|name| name != UNCATEGORIZED)
            .collect()
    }

    /// Group names in display order, `Uncategorized` included
    pub fn group_names(&self) -> Vec<String> {
        self.groups.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn focused(&self) -> Option<&ContainerRecord> {
        self.focused.as_ref().and_then(|id| self.records.get(id))
    }

    pub fn focused_id(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    /// Focus a container by id. Unknown ids are ignored.
    pub fn set_focus(&mut self, id: &str) -> bool {
        if self.records.contains_key(id) {
            self.focused = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Move focus through the visible records, clamping at both ends
    pub fn move_focus(&mut self, delta: isize) {
        let ids = self.visible_ids();
        if ids.is_empty() {
            self.focused = None;
            return;
        }
        let current = self
            .focused
            .as_ref()
            .and_then(|f| ids.iter().position(|id| id == f))
            .unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, ids.len() as isize - 1) as usize;
        self.focused = Some(ids[next].clone());
    }

    pub fn active_group(&self) -> Option<&str> {
        self.active_group.as_deref()
    }

    /// Restrict the view to one group, or show all with `None`
    pub fn set_active_group(&mut self, name: Option<&str>) {
        self.active_group = name
            .filter(|n| self.groups.iter().any(|(g, _)| g == n))
            .map(str::to_string);
        self.fix_focus();
    }
}

/// First occurrence wins so ids stay unique within a snapshot
fn dedup_by_id(summaries: Vec<ContainerSummary>) -> Vec<ContainerSummary> {
    let mut seen = HashSet::new();
    summaries
        .into_iter()
        .filter(|s| seen.insert(s.id.short().to_string()))
        .collect()
}

/// Issues list calls off the event loop and reports back over a channel
pub struct Poller {
    runtime: Arc<dyn ContainerRuntime>,
    timeout: Duration,
    tx: mpsc::UnboundedSender<PollResult>,
}

impl Poller {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<PollResult>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                runtime,
                timeout,
                tx,
            },
            rx,
        )
    }

    /// Start a pass unless one is already running. Feed the result that
    /// arrives on the channel to [`Reconciler::complete_pass`]. Exactly one
    /// result is sent per dispatch, even when the list call panics.
    pub fn dispatch(&self, reconciler: &mut Reconciler) -> bool {
        if !reconciler.try_begin_pass() {
            return false;
        }
        let runtime = self.runtime.clone();
        let timeout = self.timeout;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let pass = tokio::spawn(async move { bounded(timeout, runtime.list(true)).await });
            let result = match pass.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("poll task failed: {}", e);
                    Err(ProviderError::Transport(format!("poll task failed: {}", e)))
                }
            };
            let _ = tx.send(result);
        });
        true
    }
}
