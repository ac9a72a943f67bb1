//! Renderable container records, project groups and poll snapshots

use chrono::{DateTime, Local, TimeZone, Utc};
use dockman_provider::{ContainerId, ContainerSummary, PortMapping};
use std::collections::BTreeMap;

/// Group holding containers without a Compose project label
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Placeholder group shown while the runtime cannot be reached
pub const ERROR_GROUP: &str = "Error";

/// Creation serial of a record. Two records with the same container id but
/// different serials are different record instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordSerial(pub(crate) u64);

/// Coarse status derived from the runtime's status text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    Running,
    Exited,
    Restarting,
    Paused,
    Dead,
    Other,
}

impl StatusClass {
    /// Classify status text such as "Up 5 minutes (Paused)" or "Exited (0) 1 hour ago"
    pub fn classify(status_raw: &str) -> Self {
        let status = status_raw.trim().to_lowercase();
        if status.contains("(paused)") {
            Self::Paused
        } else if status.starts_with("up") {
            Self::Running
        } else if status.starts_with("exited") {
            Self::Exited
        } else if status.starts_with("restarting") {
            Self::Restarting
        } else if status.starts_with("paused") {
            Self::Paused
        } else if status.starts_with("dead") {
            Self::Dead
        } else {
            Self::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Exited => "exited",
            Self::Restarting => "restarting",
            Self::Paused => "paused",
            Self::Dead => "dead",
            Self::Other => "other",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// One container as the dashboard shows it
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerRecord {
    serial: RecordSerial,
    /// 1-based position within its group; a render hint only
    pub display_index: usize,
    /// Short runtime id, the record's identity
    pub id: String,
    pub full_id: ContainerId,
    pub name: String,
    pub image: String,
    pub status_raw: String,
    pub status_class: StatusClass,
    pub ports: String,
    pub created_at: String,
    pub project: Option<String>,
}

impl ContainerRecord {
    pub(crate) fn from_summary(serial: RecordSerial, summary: &ContainerSummary) -> Self {
        Self {
            serial,
            display_index: 0,
            id: summary.id.short().to_string(),
            full_id: summary.id.clone(),
            name: summary.display_name(),
            image: shorten_image(&summary.image),
            status_raw: summary.status.clone(),
            status_class: StatusClass::classify(&summary.status),
            ports: format_ports(&summary.ports),
            created_at: format_created(summary.created),
            project: summary.compose_project().map(str::to_string),
        }
    }

    /// Refresh the mutable fields of a surviving record
    pub(crate) fn refresh(&mut self, summary: &ContainerSummary) {
        self.name = summary.display_name();
        self.image = shorten_image(&summary.image);
        self.set_status(&summary.status);
        self.ports = format_ports(&summary.ports);
        self.project = summary.compose_project().map(str::to_string);
    }

    /// Returns true if the status text changed
    pub(crate) fn set_status(&mut self, status_raw: &str) -> bool {
        if self.status_raw == status_raw {
            return false;
        }
        self.status_raw = status_raw.to_string();
        self.status_class = StatusClass::classify(status_raw);
        true
    }

    pub fn serial(&self) -> RecordSerial {
        self.serial
    }

    /// Group this record belongs to
    pub fn group_name(&self) -> &str {
        self.project.as_deref().unwrap_or(UNCATEGORIZED)
    }
}

/// A Compose project (or a reserved group) and its containers in display order
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectGroup {
    pub name: String,
    pub containers: Vec<ContainerRecord>,
    /// Set only on the [`ERROR_GROUP`] placeholder
    pub error: Option<String>,
}

impl ProjectGroup {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_uncategorized(&self) -> bool {
        self.name == UNCATEGORIZED
    }

    pub fn running(&self) -> usize {
        self.containers
            .iter()
            .filter(|c| c.status_class.is_running())
            .count()
    }
}

/// Identity-relevant view of one container in a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub name: String,
    pub image: String,
    pub status_raw: String,
}

/// Flat view of one poll, used only for diffing
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub containers_by_id: BTreeMap<String, SnapshotEntry>,
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn from_summaries(summaries: &[ContainerSummary]) -> Self {
        let containers_by_id = summaries
            .iter()
            .map(|s| {
                (
                    s.id.short().to_string(),
                    SnapshotEntry {
                        name: s.display_name(),
                        image: s.image.clone(),
                        status_raw: s.status.clone(),
                    },
                )
            })
            .collect();
        Self {
            containers_by_id,
            taken_at: Utc::now(),
        }
    }

    /// Same id set and same (name, image) for every id. Status may differ.
    pub fn same_identity(&self, other: &Snapshot) -> bool {
        self.containers_by_id.len() == other.containers_by_id.len()
            && self.containers_by_id.iter().all(|(id, entry)| {
                other
                    .containers_by_id
                    .get(id)
                    .map(|o| o.name == entry.name && o.image == entry.image)
                    .unwrap_or(false)
            })
    }

    pub fn len(&self) -> usize {
        self.containers_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers_by_id.is_empty()
    }
}

/// `public:private/proto` or `private/proto`, de-duplicated, comma separated
pub fn format_ports(ports: &[PortMapping]) -> String {
    let mut parts: Vec<String> = Vec::new();
    for port in ports {
        let part = match port.public_port {
            Some(public) => format!("{}:{}/{}", public, port.private_port, port.protocol),
            None => format!("{}/{}", port.private_port, port.protocol),
        };
        if !parts.contains(&part) {
            parts.push(part);
        }
    }
    parts.join(", ")
}

/// Local `YYYY-MM-DD HH:MM`, empty for a missing timestamp
pub fn format_created(created: i64) -> String {
    if created <= 0 {
        return String::new();
    }
    Local
        .timestamp_opt(created, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

const DIGEST_CHARS: usize = 30;

/// Truncate bare and pinned sha256 digests; tags pass through
pub fn shorten_image(image: &str) -> String {
    if image.is_empty() {
        return "unknown".to_string();
    }
    if let Some(digest) = image.strip_prefix("sha256:") {
        return format!("sha256:{}", truncate_chars(digest, DIGEST_CHARS));
    }
    if let Some((name, digest)) = image.split_once("@sha256:") {
        return format!("{}@sha256:{}", name, truncate_chars(digest, DIGEST_CHARS));
    }
    image.to_string()
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_class() {
        assert_eq!(StatusClass::classify("Up 3 minutes"), StatusClass::Running);
        assert_eq!(StatusClass::classify("Up 3 minutes (healthy)"), StatusClass::Running);
        assert_eq!(StatusClass::classify("Up 2 hours (Paused)"), StatusClass::Paused);
        assert_eq!(StatusClass::classify("Exited (137) 5 seconds ago"), StatusClass::Exited);
        assert_eq!(StatusClass::classify("Restarting (1) 2 seconds ago"), StatusClass::Restarting);
        assert_eq!(StatusClass::classify("Dead"), StatusClass::Dead);
        assert_eq!(StatusClass::classify("Created"), StatusClass::Other);
        assert_eq!(StatusClass::classify(""), StatusClass::Other);
    }

    #[test]
    fn test_format_ports() {
        let ports = vec![
            PortMapping {
                private_port: 80,
                public_port: Some(8080),
                protocol: "tcp".into(),
                ip: Some("0.0.0.0".into()),
            },
            PortMapping {
                private_port: 80,
                public_port: Some(8080),
                protocol: "tcp".into(),
                ip: Some("::".into()),
            },
            PortMapping {
                private_port: 53,
                public_port: None,
                protocol: "udp".into(),
                ip: None,
            },
        ];
        assert_eq!(format_ports(&ports), "8080:80/tcp, 53/udp");
        assert_eq!(format_ports(&[]), "");
    }

    #[test]
    fn test_shorten_image() {
        assert_eq!(shorten_image("mysql:8.0"), "mysql:8.0");
        assert_eq!(shorten_image(""), "unknown");
        let digest = "a".repeat(64);
        assert_eq!(
            shorten_image(&format!("sha256:{}", digest)),
            format!("sha256:{}", "a".repeat(30))
        );
        assert_eq!(
            shorten_image(&format!("nginx@sha256:{}", digest)),
            format!("nginx@sha256:{}", "a".repeat(30))
        );
    }

    #[test]
    fn test_format_created() {
        assert_eq!(format_created(0), "");
        let formatted = format_created(1_700_000_000);
        assert_eq!(formatted.len(), "2023-11-14 22:13".len());
        assert!(formatted.starts_with("2023-11-1"));
    }

    #[test]
    fn test_snapshot_identity() {
        let mut a = Snapshot {
            containers_by_id: BTreeMap::new(),
            taken_at: Utc::now(),
        };
        a.containers_by_id.insert(
            "aaa".into(),
            SnapshotEntry {
                name: "web".into(),
                image: "nginx".into(),
                status_raw: "Up 1 second".into(),
            },
        );
        let mut b = a.clone();
        b.containers_by_id.get_mut("aaa").unwrap().status_raw = "Exited (0)".into();
        assert!(a.same_identity(&b));

        b.containers_by_id.get_mut("aaa").unwrap().image = "nginx:alpine".into();
        assert!(!a.same_identity(&b));

        let mut c = a.clone();
        c.containers_by_id.insert(
            "bbb".into(),
            SnapshotEntry {
                name: "db".into(),
                image: "postgres".into(),
                status_raw: "Up".into(),
            },
        );
        assert!(!a.same_identity(&c));
        assert!(!c.same_identity(&a));
    }
}
