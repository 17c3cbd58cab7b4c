//! Core data model shared across the scoring pipeline.
//!
//! Mirrors the wire shapes and constants from the upstream scheduler
//! extender API and the pod annotation contract, kept deliberately flat:
//! the orchestrator's full `Pod`/`Node` objects carry far more than this
//! service ever reads, so only the fields the scoring pipeline actually
//! consumes are modelled.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Pod annotation key carrying the requested network I/O, in Mbit/s.
pub const NET_IO_NEED_ANNOTATION: &str = "LiangNetIO";

/// CPU/Mem/Disk-IO usage percent above which a node is treated as having
/// unusable headroom for that resource.
pub const USAGE_UPPER_LIMIT: i64 = 80;

pub const MAX_NODE_SCORE: i64 = 100;
pub const MIN_NODE_SCORE: i64 = 0;

/// Mbit/s → Kbit/s conversion factor (decimal, matching the annotation
/// unit conversion in §3 of the scoring contract).
pub const KBIT_PER_MBIT: i64 = 1000;

/// The closed set of resource kinds the refresh loop tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Cpu,
    Mem,
    NetIo,
    DiskIo,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Cpu,
        ResourceKind::Mem,
        ResourceKind::NetIo,
        ResourceKind::DiskIo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Cpu => "cpu",
            ResourceKind::Mem => "mem",
            ResourceKind::NetIo => "net_io",
            ResourceKind::DiskIo => "disk_io",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single node's load/capacity sample: `node name → integer value`.
///
/// Units are carried by the `ResourceKind` the map is stored under, not by
/// the type itself — CPU/Mem are usage-percent × 1, NET_IO is Kbit/s,
/// DISK_IO is bytes/s.
pub type ResourceMap = HashMap<String, i64>;

// ── Scoring request / response wire types ──────────────────────────────────

/// The pod whose placement is being scored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PodSpec {
    #[serde(default, rename = "Annotations")]
    pub annotations: HashMap<String, String>,
}

/// A single candidate node as carried in the `Nodes` object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeItem {
    #[serde(rename = "Name")]
    pub name: String,
}

/// The richer `Nodes` object an orchestrator may send instead of a flat
/// name list.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NodeList {
    #[serde(default, rename = "Items")]
    pub items: Vec<NodeItem>,
}

/// Inbound scoring request body.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtenderArgs {
    #[serde(rename = "Pod")]
    pub pod: PodSpec,
    #[serde(default, rename = "NodeNames")]
    pub node_names: Option<Vec<String>>,
    #[serde(default, rename = "Nodes")]
    pub nodes: Option<NodeList>,
}

impl ExtenderArgs {
    /// Resolves the effective candidate node-name list: the explicit
    /// `NodeNames` list if present, otherwise names extracted from `Nodes`
    /// in iteration order.
    pub fn resolved_node_names(&self) -> Vec<String> {
        if let Some(names) = &self.node_names {
            return names.clone();
        }
        self.nodes
            .as_ref()
            .map(|nodes| nodes.items.iter().map(|item| item.name.clone()).collect())
            .unwrap_or_default()
    }
}

/// One node's priority score in the response list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HostPriority {
    #[serde(rename = "Host")]
    pub host: String,
    #[serde(rename = "Score")]
    pub score: i64,
}

pub type HostPriorityList = Vec<HostPriority>;

/// Reads the pod's network I/O request from its annotations, converting
/// Mbit/s to Kbit/s.
///
/// Absent or unparseable values degrade to zero need — scoring must never
/// panic on a malformed annotation.
pub fn pod_net_io_need(pod: &PodSpec) -> i64 {
    match pod.annotations.get(NET_IO_NEED_ANNOTATION) {
        Some(raw) => raw.parse::<i64>().unwrap_or(0) * KBIT_PER_MBIT,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn need_absent_annotation_is_zero() {
        let pod = PodSpec::default();
        assert_eq!(pod_net_io_need(&pod), 0);
    }

    #[test]
    fn need_parses_and_converts_to_kbit() {
        let mut pod = PodSpec::default();
        pod.annotations
            .insert(NET_IO_NEED_ANNOTATION.to_string(), "2".to_string());
        assert_eq!(pod_net_io_need(&pod), 2000);
    }

    #[test]
    fn need_unparseable_value_degrades_to_zero() {
        let mut pod = PodSpec::default();
        pod.annotations
            .insert(NET_IO_NEED_ANNOTATION.to_string(), "not-a-number".to_string());
        assert_eq!(pod_net_io_need(&pod), 0);
    }

    #[test]
    fn resolved_node_names_prefers_explicit_list() {
        let args = ExtenderArgs {
            pod: PodSpec::default(),
            node_names: Some(vec!["a".into(), "b".into()]),
            nodes: Some(NodeList {
                items: vec![NodeItem { name: "c".into() }],
            }),
        };
        assert_eq!(args.resolved_node_names(), vec!["a", "b"]);
    }

    #[test]
    fn resolved_node_names_falls_back_to_nodes_object() {
        let args = ExtenderArgs {
            pod: PodSpec::default(),
            node_names: None,
            nodes: Some(NodeList {
                items: vec![NodeItem { name: "c".into() }, NodeItem { name: "d".into() }],
            }),
        };
        assert_eq!(args.resolved_node_names(), vec!["c", "d"]);
    }

    #[test]
    fn resolved_node_names_empty_when_neither_present() {
        let args = ExtenderArgs {
            pod: PodSpec::default(),
            node_names: None,
            nodes: None,
        };
        assert!(args.resolved_node_names().is_empty());
    }
}
