//! Client boundary for the remote workflow service
//!
//! The engines only ever talk to the [`WorkflowClient`] trait; the HTTP
//! implementation is a thin contract over the service's REST collection and
//! the in-memory implementation backs tests and dry runs.

use crate::config::DeployConfig;
use crate::error::{FlowDeployError, Result};
use crate::workflow::Workflow;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// The four operations the promotion and backup engines need
#[async_trait]
pub trait WorkflowClient: Send + Sync {
    /// Fetch the full list of workflows (shallow representations are fine)
    async fn list_all(&self) -> Result<Vec<Workflow>>;

    /// Fetch one workflow's full representation by its remote id
    async fn get_by_id(&self, id: &str) -> Result<Workflow>;

    /// Create a workflow; the returned entity carries the assigned id
    async fn create(&self, workflow: &Workflow) -> Result<Workflow>;

    /// Update a workflow addressed by its remote id
    async fn update_by_id(&self, id: &str, workflow: &Workflow) -> Result<Workflow>;
}

/// List responses arrive either as a bare array or wrapped in `{"data": []}`
/// depending on the service version; accept both.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Wrapped { data: Vec<Workflow> },
    Bare(Vec<Workflow>),
}

/// HTTP implementation of [`WorkflowClient`] using bearer-token auth
pub struct HttpWorkflowClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpWorkflowClient {
    /// Build a client from the operator configuration.
    ///
    /// Fails with a configuration error when no API key can be resolved.
    pub fn from_config(config: &DeployConfig) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: config.server.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key()?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check_status(
        response: reqwest::Response,
        operation: &str,
        workflow: &str,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let mut reason = format!("HTTP {status}");
        if !body.is_empty() {
            // Keep error payloads short; the service can echo entire entities
            let snippet: String = body.chars().take(300).collect();
            reason.push_str(&format!(": {snippet}"));
        }
        Err(FlowDeployError::remote(operation, workflow, reason))
    }
}

#[async_trait]
impl WorkflowClient for HttpWorkflowClient {
    async fn list_all(&self) -> Result<Vec<Workflow>> {
        let response = self
            .http
            .get(self.url("/workflows"))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| FlowDeployError::remote("list", "*", e.to_string()))?;

        let response = Self::check_status(response, "list", "*").await?;
        let list: ListResponse = response
            .json()
            .await
            .map_err(|e| FlowDeployError::remote("list", "*", e.to_string()))?;
        Ok(match list {
            ListResponse::Wrapped { data } => data,
            ListResponse::Bare(data) => data,
        })
    }

    async fn get_by_id(&self, id: &str) -> Result<Workflow> {
        let response = self
            .http
            .get(self.url(&format!("/workflows/{id}")))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| FlowDeployError::remote("get", id, e.to_string()))?;

        let response = Self::check_status(response, "get", id).await?;
        response
            .json()
            .await
            .map_err(|e| FlowDeployError::remote("get", id, e.to_string()))
    }

    async fn create(&self, workflow: &Workflow) -> Result<Workflow> {
        let response = self
            .http
            .post(self.url("/workflows"))
            .bearer_auth(&self.api_key)
            .json(workflow)
            .send()
            .await
            .map_err(|e| FlowDeployError::remote("create", &workflow.name, e.to_string()))?;

        let response = Self::check_status(response, "create", &workflow.name).await?;
        response
            .json()
            .await
            .map_err(|e| FlowDeployError::remote("create", &workflow.name, e.to_string()))
    }

    async fn update_by_id(&self, id: &str, workflow: &Workflow) -> Result<Workflow> {
        let response = self
            .http
            .put(self.url(&format!("/workflows/{id}")))
            .bearer_auth(&self.api_key)
            .json(workflow)
            .send()
            .await
            .map_err(|e| FlowDeployError::remote("update", &workflow.name, e.to_string()))?;

        let response = Self::check_status(response, "update", &workflow.name).await?;
        response
            .json()
            .await
            .map_err(|e| FlowDeployError::remote("update", &workflow.name, e.to_string()))
    }
}

/// In-memory implementation of [`WorkflowClient`].
///
/// Backs unit and integration tests; also usable as a dry-run target.
/// Ids are assigned sequentially on create, the way the remote service owns
/// id assignment.
#[derive(Default)]
pub struct MemoryWorkflowClient {
    workflows: Mutex<Vec<Workflow>>,
    next_id: AtomicU64,
}

impl MemoryWorkflowClient {
    /// Create an empty client
    pub fn new() -> Self {
        Self {
            workflows: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a client pre-seeded with workflows; entities without an id get
    /// one assigned.
    pub fn with_workflows(workflows: Vec<Workflow>) -> Self {
        let client = Self::new();
        {
            let mut store = client.workflows.lock().unwrap();
            for mut workflow in workflows {
                if workflow.id.is_none() {
                    let id = client.next_id.fetch_add(1, Ordering::SeqCst);
                    workflow.id = Some(format!("wf-{id}"));
                }
                store.push(workflow);
            }
        }
        client
    }
}

#[async_trait]
impl WorkflowClient for MemoryWorkflowClient {
    async fn list_all(&self) -> Result<Vec<Workflow>> {
        Ok(self.workflows.lock().unwrap().clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Workflow> {
        self.workflows
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.id.as_deref() == Some(id))
            .cloned()
            .ok_or_else(|| FlowDeployError::remote("get", id, "HTTP 404 Not Found"))
    }

    async fn create(&self, workflow: &Workflow) -> Result<Workflow> {
        let mut created = workflow.clone();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        created.id = Some(format!("wf-{id}"));
        // The service decides default activation for new resources
        if created.active.is_none() {
            created.active = Some(false);
        }
        self.workflows.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_by_id(&self, id: &str, workflow: &Workflow) -> Result<Workflow> {
        let mut store = self.workflows.lock().unwrap();
        let existing = store
            .iter_mut()
            .find(|w| w.id.as_deref() == Some(id))
            .ok_or_else(|| FlowDeployError::remote("update", id, "HTTP 404 Not Found"))?;

        let previous_active = existing.active;
        let mut updated = workflow.clone();
        updated.id = Some(id.to_string());
        // Absent active on the body leaves the live state untouched
        if updated.active.is_none() {
            updated.active = previous_active;
        }
        *existing = updated.clone();
        Ok(updated)
    }
}
