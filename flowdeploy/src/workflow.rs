//! Data model for remote workflow entities
//!
//! Mirrors the remote service's JSON representation closely enough to
//! round-trip unknown fields opaquely, while giving the engines typed access
//! to the parts they rewrite: names, nodes, connections and tags.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Node type string for the code capability
pub const CODE_NODE_TYPE: &str = "n8n-nodes-base.code";

/// Node type string for sticky-note annotations
pub const STICKY_NODE_TYPE: &str = "n8n-nodes-base.stickyNote";

/// Reserved node names that carry the injected environment variables
pub const CONFIG_NODE_NAMES: [&str; 2] = ["Configuration", "Variables"];

/// Reserved node name for the version annotation sticky note
pub const VERSION_NODE_NAME: &str = "Version Info";

/// Service-managed bookkeeping fields, stripped before any create/update call
/// and before writing to disk. The remote service rejects or ignores them and
/// round-tripping them causes drift.
pub const BOOKKEEPING_FIELDS: [&str; 7] = [
    "createdAt",
    "updatedAt",
    "versionId",
    "meta",
    "pinData",
    "triggerCount",
    "shared",
];

/// A remote workflow entity.
///
/// `id` is assigned by the remote service and is never persisted to files;
/// `name` (the display name) is the only correlation key this system uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Remote-assigned opaque id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Mutable display name; the correlation key for reconciliation
    pub name: String,
    /// Live activation state, owned by the remote service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Ordered node list; absent on shallow list responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<Node>>,
    /// Adjacency structure keyed by source node name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<Map<String, Value>>,
    /// Tags; entries may be plain strings or `{id, name}` objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Value>>,
    /// Everything else, preserved opaquely
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Workflow {
    /// Remove service-managed bookkeeping fields
    pub fn strip_bookkeeping(&mut self) {
        for field in BOOKKEEPING_FIELDS {
            self.extra.remove(field);
        }
    }

    /// Prepare the entity for writing to disk: bookkeeping and the remote id
    /// are both dropped (files are correlated by name, never by id).
    pub fn sanitize_for_file(&mut self) {
        self.strip_bookkeeping();
        self.id = None;
    }

    /// Prepare the entity for a create/update call: bookkeeping and id are
    /// dropped from the body (update addresses the id in the URL).
    pub fn sanitize_for_push(&mut self) {
        self.strip_bookkeeping();
        self.id = None;
    }

    /// Remove per-node webhook correlation ids so promoted copies never
    /// collide with the source environment's webhooks.
    pub fn strip_webhook_ids(&mut self) {
        if let Some(nodes) = &mut self.nodes {
            for node in nodes {
                node.extra.remove("webhookId");
            }
        }
    }

    /// Number of nodes, zero when the node list is absent
    pub fn node_count(&self) -> usize {
        self.nodes.as_ref().map_or(0, Vec::len)
    }

    /// Find a node by exact name
    pub fn find_node(&self, name: &str) -> Option<&Node> {
        self.nodes.as_ref()?.iter().find(|n| n.name == name)
    }

    /// The set of node type strings present in this workflow
    pub fn node_type_set(&self) -> BTreeSet<String> {
        self.nodes
            .as_ref()
            .map(|nodes| nodes.iter().map(|n| n.kind.clone()).collect())
            .unwrap_or_default()
    }

    /// Tag names, regardless of whether tags are stored as strings or objects
    pub fn tag_names(&self) -> BTreeSet<String> {
        let Some(tags) = &self.tags else {
            return BTreeSet::new();
        };
        tags.iter()
            .filter_map(|tag| match tag {
                Value::String(s) => Some(s.clone()),
                Value::Object(obj) => obj
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            })
            .collect()
    }

    /// Sorted connection source keys, the topology approximation used by
    /// structural diffing
    pub fn connection_sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = self
            .connections
            .as_ref()
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default();
        sources.sort();
        sources
    }
}

/// Capability classification of a node type string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A code node; the configuration node is always one of these
    Code,
    /// A sticky-note annotation
    StickyNote,
    /// Anything else; fields are carried opaquely
    Other,
}

impl NodeKind {
    /// Classify a raw node type string
    pub fn of(type_string: &str) -> Self {
        match type_string.rsplit('.').next() {
            Some("code") => NodeKind::Code,
            Some("stickyNote") => NodeKind::StickyNote,
            _ => NodeKind::Other,
        }
    }
}

/// A single node inside a workflow's graph.
///
/// `name` and `type` are mandatory in the remote representation; their
/// absence fails deserialization, which surfaces as a validation error for
/// the file in question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Node id, unique within the workflow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Node name, unique within the workflow; the lookup key for rewiring
    pub name: String,
    /// Raw node type string
    #[serde(rename = "type")]
    pub kind: String,
    /// Type schema version
    #[serde(
        rename = "typeVersion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub type_version: Option<Value>,
    /// Node parameters; shape depends on the node type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    /// Canvas position `[x, y]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Value>,
    /// Everything else, preserved opaquely
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    /// Capability classification of this node
    pub fn node_kind(&self) -> NodeKind {
        NodeKind::of(&self.kind)
    }

    /// Whether this node looks like a trigger: the entry point whose first
    /// output gets rewired when a configuration node is synthesized.
    pub fn is_trigger(&self) -> bool {
        self.kind.contains("Trigger")
            || self.name.contains("Trigger")
            || self.name.contains("When")
    }

    /// Whether this node is the reserved configuration node
    pub fn is_config_node(&self) -> bool {
        CONFIG_NODE_NAMES.contains(&self.name.as_str())
    }
}
