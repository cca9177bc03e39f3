//! Environment variable injection into a workflow's node graph
//!
//! Promotion rewrites one designated configuration node so the workflow picks
//! up environment-specific values, and maintains a sticky-note annotation
//! describing the deployed version. Every branch here degrades to a no-op or
//! to synthesis; injection never fails on missing data.

use crate::config::{DeployConfig, Environment};
use crate::workflow::{
    Node, NodeKind, Workflow, CODE_NODE_TYPE, STICKY_NODE_TYPE, VERSION_NODE_NAME,
};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Canvas position for a synthesized configuration node
const CONFIG_NODE_POSITION: [i64; 2] = [-400, 200];

/// Canvas position for a synthesized version sticky note
const VERSION_NODE_POSITION: [i64; 2] = [-400, -40];

/// Sticky-note color used for production deployments
const STICKY_COLOR_PROD: u64 = 4;

/// Sticky-note color used outside production
const STICKY_COLOR_DEFAULT: u64 = 5;

/// Inject environment variables and the version annotation into a workflow.
///
/// Looks up the configured variables for `base_name` in `env`; when none are
/// configured the workflow is left untouched. Otherwise the configuration
/// node (named `Configuration` or `Variables`) is found, converted to a code
/// node if needed, or synthesized, and its script parameter is overwritten
/// with a deterministic serialization of the variable map. When `version` is
/// given, a `Version Info` sticky note is upserted as well.
///
/// Idempotent: re-running with the same inputs produces the same
/// configuration payload.
pub fn inject_variables(
    config: &DeployConfig,
    workflow: &mut Workflow,
    base_name: &str,
    env: Environment,
    version: Option<&str>,
) {
    let Some(variables) = config.variables_for(base_name, env) else {
        debug!("No variables configured for '{base_name}' in {env}; skipping injection");
        return;
    };

    let mut variables = variables.clone();
    if let Some(version) = version {
        if env == Environment::Prod {
            variables.insert("version".to_string(), Value::String(version.to_string()));
        }
    }

    // No node array means nothing to inject into
    if workflow.nodes.is_none() {
        debug!("Workflow '{}' has no node array; skipping injection", workflow.name);
        return;
    }

    let script = render_script(&variables);
    upsert_config_node(workflow, &script);

    if let Some(version) = version {
        upsert_version_note(workflow, version, env);
    }
}

/// Deterministic script payload evaluating to exactly the given mapping.
///
/// Pretty-printed with the mapping's insertion order preserved, so repeated
/// injection yields byte-identical payloads.
fn render_script(variables: &Map<String, Value>) -> String {
    let rendered = serde_json::to_string_pretty(&Value::Object(variables.clone()))
        .unwrap_or_else(|_| "{}".to_string());
    format!("return {rendered};")
}

fn upsert_config_node(workflow: &mut Workflow, script: &str) {
    let Some(nodes) = workflow.nodes.as_mut() else {
        return;
    };

    let position = nodes.iter().position(Node::is_config_node);
    match position {
        Some(index) => {
            let existing = &nodes[index];
            let replacement = if existing.node_kind() == NodeKind::Code {
                with_script(existing.clone(), script)
            } else {
                // Convert in place to the code capability, keeping identity
                debug!(
                    "Converting node '{}' ({}) to a code node",
                    existing.name, existing.kind
                );
                let mut converted = code_node(existing.name.clone());
                converted.id = existing.id.clone();
                converted.position = existing.position.clone();
                with_script(converted, script)
            };
            nodes[index] = replacement;
        }
        None => {
            let mut created = code_node("Configuration".to_string());
            created.id = Some(uuid::Uuid::new_v4().to_string());
            created = with_script(created, script);
            let created_name = created.name.clone();
            nodes.push(created);
            rewire_trigger(workflow, &created_name);
        }
    }
}

/// Base shape of a synthesized code node with an empty-mapping script
fn code_node(name: String) -> Node {
    Node {
        id: None,
        name,
        kind: CODE_NODE_TYPE.to_string(),
        type_version: Some(json!(2)),
        parameters: Some(json!({ "jsCode": "return {};" })),
        position: Some(json!(CONFIG_NODE_POSITION)),
        extra: Map::new(),
    }
}

/// Overwrite the node's script parameter, preserving sibling parameters
fn with_script(mut node: Node, script: &str) -> Node {
    if !matches!(node.parameters, Some(Value::Object(_))) {
        node.parameters = Some(json!({}));
    }
    if let Some(Value::Object(params)) = node.parameters.as_mut() {
        params.insert("jsCode".to_string(), Value::String(script.to_string()));
    }
    node
}

/// Point the trigger's first output at a freshly synthesized configuration
/// node and give that node an empty outgoing connection list.
fn rewire_trigger(workflow: &mut Workflow, config_node_name: &str) {
    let Some(trigger_name) = workflow
        .nodes
        .as_ref()
        .and_then(|nodes| nodes.iter().find(|n| n.is_trigger() && !n.is_config_node()))
        .map(|n| n.name.clone())
    else {
        return;
    };
    let Some(connections) = workflow.connections.as_mut() else {
        return;
    };

    let target = json!([{ "node": config_node_name, "type": "main", "index": 0 }]);
    let entry = connections
        .entry(trigger_name.clone())
        .or_insert_with(|| json!({ "main": [] }));
    if matches!(entry.get("main"), Some(Value::Array(_))) {
        if let Some(Value::Array(outputs)) = entry.get_mut("main") {
            if outputs.is_empty() {
                outputs.push(target);
            } else {
                outputs[0] = target;
            }
        }
    } else {
        *entry = json!({ "main": [target] });
    }

    connections.insert(config_node_name.to_string(), json!({ "main": [[]] }));
    debug!("Rewired trigger '{trigger_name}' to '{config_node_name}'");
}

/// Upsert the `Version Info` sticky note
fn upsert_version_note(workflow: &mut Workflow, version: &str, env: Environment) {
    let content = format!(
        "## Version Info\n\n**Version:** {version}\n**Environment:** {env}\n**Deployed:** {}",
        chrono::Utc::now().format("%Y-%m-%d")
    );
    let color = if env == Environment::Prod {
        STICKY_COLOR_PROD
    } else {
        STICKY_COLOR_DEFAULT
    };

    let Some(nodes) = workflow.nodes.as_mut() else {
        return;
    };
    let existing = nodes.iter().position(|node| {
        node.name == VERSION_NODE_NAME
            || node
                .parameters
                .as_ref()
                .and_then(|p| p.get("content"))
                .and_then(Value::as_str)
                .is_some_and(|c| c.contains("Version"))
    });

    match existing {
        Some(index) => {
            let node = &mut nodes[index];
            if !matches!(node.parameters, Some(Value::Object(_))) {
                node.parameters = Some(json!({}));
            }
            if let Some(Value::Object(params)) = node.parameters.as_mut() {
                params.insert("content".to_string(), Value::String(content));
                if env == Environment::Prod {
                    params.insert("color".to_string(), json!(STICKY_COLOR_PROD));
                }
            }
        }
        None => {
            nodes.push(Node {
                id: Some(uuid::Uuid::new_v4().to_string()),
                name: VERSION_NODE_NAME.to_string(),
                kind: STICKY_NODE_TYPE.to_string(),
                type_version: Some(json!(1)),
                parameters: Some(json!({
                    "content": content,
                    "color": color,
                    "width": 240,
                    "height": 120
                })),
                position: Some(json!(VERSION_NODE_POSITION)),
                extra: Map::new(),
            });
        }
    }
}
