//! Executions
//!
//! An execution is one run of a workflow. It is created in `RUNNING` (or
//! `IDLE`) state and moves asynchronously to a terminal state; use
//! [`wait_for_success`] to observe that transition.

use crate::decode::{null_as_default, timestamp};
use crate::error::{Error, Result};
use crate::options::{DateFilter, Field, OptionValue, Options, SortDir};
use crate::pagination::Pager;
use crate::poll::{poll_until, PollConfig};
use crate::resource::{self, Resource};
use crate::transport::ServiceClient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::Mutex;

/// Lifecycle state of an execution
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExecutionState {
    #[default]
    Idle,
    Running,
    Success,
    Error,
    Paused,
    Cancelled,
    /// A state this client does not know about
    Other(String),
}

impl ExecutionState {
    pub fn as_str(&self) -> &str {
        match self {
            ExecutionState::Idle => "IDLE",
            ExecutionState::Running => "RUNNING",
            ExecutionState::Success => "SUCCESS",
            ExecutionState::Error => "ERROR",
            ExecutionState::Paused => "PAUSED",
            ExecutionState::Cancelled => "CANCELLED",
            ExecutionState::Other(s) => s,
        }
    }

    /// No further automatic transition happens from this state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Success | ExecutionState::Error | ExecutionState::Cancelled
        )
    }
}

impl From<String> for ExecutionState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "IDLE" => ExecutionState::Idle,
            "RUNNING" => ExecutionState::Running,
            "SUCCESS" => ExecutionState::Success,
            "ERROR" => ExecutionState::Error,
            "PAUSED" => ExecutionState::Paused,
            "CANCELLED" => ExecutionState::Cancelled,
            _ => ExecutionState::Other(state),
        }
    }
}

impl From<ExecutionState> for String {
    fn from(state: ExecutionState) -> Self {
        match state {
            ExecutionState::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'a> From<&'a ExecutionState> for OptionValue<'a> {
    fn from(state: &'a ExecutionState) -> Self {
        OptionValue::Str(Cow::Borrowed(state.as_str()))
    }
}

/// A workflow execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    /// Workflow input values as a JSON document
    #[serde(default, deserialize_with = "null_as_default")]
    pub input: String,

    /// Workflow output values as a JSON document
    #[serde(default, deserialize_with = "null_as_default")]
    pub output: String,

    /// Workflow type specific parameters as a JSON document
    #[serde(default, deserialize_with = "null_as_default")]
    pub params: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub project_id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub state: ExecutionState,

    /// Reason for the current state, usually set on `ERROR`
    #[serde(default, deserialize_with = "null_as_default")]
    pub state_info: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub workflow_id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub workflow_name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub workflow_namespace: String,

    /// Parent task execution, for sub-workflows
    #[serde(default, deserialize_with = "null_as_default")]
    pub task_execution_id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub root_execution_id: String,

    #[serde(default, with = "timestamp::mistral")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, with = "timestamp::mistral")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Resource for Execution {
    const PATH: &'static str = "executions";
    const ENVELOPE: &'static str = "execution";
    const LIST_KEY: &'static str = "executions";
}

/// Filters for [`list`]
#[derive(Debug, Clone, Default)]
pub struct ListOpts {
    pub workflow_name: Option<String>,
    pub workflow_id: Option<String>,
    pub description: Option<String>,
    pub state: Option<ExecutionState>,
    pub project_id: Option<String>,
    pub root_execution_id: Option<String>,
    pub task_execution_id: Option<String>,
    pub created_at: Option<DateFilter>,
    pub updated_at: Option<DateFilter>,
    /// Include each execution's output in the listing
    pub include_output: bool,
    pub sort_key: Option<String>,
    pub sort_dir: Option<SortDir>,
    /// Resume listing after this execution ID
    pub marker: Option<String>,
    /// Maximum executions per page
    pub limit: Option<u32>,
}

impl Options for ListOpts {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::query("workflow_name", self.workflow_name.as_deref()),
            Field::query("workflow_id", self.workflow_id.as_deref()),
            Field::query("description", self.description.as_deref()),
            Field::query("state", self.state.as_ref()),
            Field::query("project_id", self.project_id.as_deref()),
            Field::query("root_execution_id", self.root_execution_id.as_deref()),
            Field::query("task_execution_id", self.task_execution_id.as_deref()),
            Field::query("created_at", self.created_at.as_ref()),
            Field::query("updated_at", self.updated_at.as_ref()),
            Field::query("include_output", self.include_output),
            Field::query("sort_key", self.sort_key.as_deref()),
            Field::query("sort_dir", self.sort_dir),
            Field::query("marker", self.marker.as_deref()),
            Field::query("limit", self.limit),
        ]
    }
}

/// Options for [`create`]
#[derive(Debug, Clone, Default)]
pub struct CreateOpts {
    /// Workflow to run
    pub workflow_id: String,
    pub workflow_namespace: Option<String>,
    /// Workflow input values as a JSON document
    pub input: Option<String>,
    /// Workflow type specific parameters as a JSON document
    pub params: Option<String>,
    pub description: Option<String>,
}

impl CreateOpts {
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            ..Default::default()
        }
    }
}

impl Options for CreateOpts {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::body("workflow_id", &self.workflow_id).required(),
            Field::body("workflow_namespace", self.workflow_namespace.as_deref()),
            Field::body("input", self.input.as_deref()),
            Field::body("params", self.params.as_deref()),
            Field::body("description", self.description.as_deref()),
        ]
    }
}

pub fn list_url(client: &ServiceClient) -> String {
    resource::collection_url::<Execution>(client)
}

pub fn create_url(client: &ServiceClient) -> String {
    resource::collection_url::<Execution>(client)
}

pub fn get_url(client: &ServiceClient, id: &str) -> String {
    resource::member_url::<Execution>(client, id)
}

pub fn delete_url(client: &ServiceClient, id: &str) -> String {
    resource::member_url::<Execution>(client, id)
}

/// List executions page by page
pub fn list(client: &ServiceClient, opts: &ListOpts) -> Result<Pager<Execution>> {
    resource::list(client, list_url(client), opts)
}

/// Get an execution by ID
pub async fn get(client: &ServiceClient, id: &str) -> Result<Execution> {
    resource::get(client, &get_url(client, id)).await
}

/// Start a new execution
pub async fn create(client: &ServiceClient, opts: &CreateOpts) -> Result<Execution> {
    resource::create(client, &create_url(client), opts, Some(Execution::ENVELOPE)).await
}

/// Delete an execution
pub async fn delete(client: &ServiceClient, id: &str) -> Result<()> {
    resource::delete(client, &delete_url(client, id)).await
}

/// Poll an execution until it reaches `SUCCESS` and return its final form.
///
/// Fails with [`Error::PollFailure`] as soon as the execution is seen in
/// `ERROR` or `CANCELLED`, and with [`Error::PollTimeout`] when
/// `config.timeout` passes first. Errors from the Get request end the wait
/// too; they are not retried.
pub async fn wait_for_success(
    client: &ServiceClient,
    id: &str,
    config: PollConfig,
) -> Result<Execution> {
    let latest: Mutex<Option<Execution>> = Mutex::new(None);
    let slot = &latest;

    poll_until(
        move || async move {
            let execution = get(client, id).await?;
            tracing::debug!("execution {} is {}", id, execution.state);

            match execution.state {
                ExecutionState::Success => {
                    if let Ok(mut guard) = slot.lock() {
                        *guard = Some(execution);
                    }
                    Ok(true)
                }
                ExecutionState::Error | ExecutionState::Cancelled => {
                    Err(Error::PollFailure(failure_message(&execution)))
                }
                _ => Ok(false),
            }
        },
        config,
    )
    .await?;

    latest
        .into_inner()
        .ok()
        .flatten()
        .ok_or_else(|| Error::PollFailure(format!("execution {} result was lost", id)))
}

fn failure_message(execution: &Execution) -> String {
    if execution.state_info.is_empty() {
        format!("execution {} in {} state", execution.id, execution.state)
    } else {
        format!(
            "execution {} in {} state: {}",
            execution.id, execution.state, execution.state_info
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_entity;
    use crate::options::{encode_body, encode_query};
    use serde_json::json;

    #[test]
    fn test_state_round_trips_unknown_values() {
        assert_eq!(ExecutionState::from("SUCCESS".to_string()), ExecutionState::Success);
        let other = ExecutionState::from("PLANNED".to_string());
        assert_eq!(other, ExecutionState::Other("PLANNED".to_string()));
        assert_eq!(String::from(other), "PLANNED");
    }

    #[test]
    fn test_terminal_states() {
        assert!(ExecutionState::Success.is_terminal());
        assert!(ExecutionState::Error.is_terminal());
        assert!(!ExecutionState::Running.is_terminal());
        assert!(!ExecutionState::Other("X".into()).is_terminal());
    }

    #[test]
    fn test_create_body_is_enveloped_and_omits_empty() {
        let opts = CreateOpts {
            workflow_id: "w1".to_string(),
            input: Some("{}".to_string()),
            description: Some(String::new()),
            ..Default::default()
        };
        let body = encode_body(&opts, Some(Execution::ENVELOPE)).unwrap();
        assert_eq!(body, json!({"execution": {"workflow_id": "w1", "input": "{}"}}));
    }

    #[test]
    fn test_create_requires_workflow_id() {
        let opts = CreateOpts {
            description: Some("d".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            encode_body(&opts, Some(Execution::ENVELOPE)),
            Err(Error::Validation { field: "workflow_id" })
        ));
    }

    #[test]
    fn test_list_query_with_state() {
        let opts = ListOpts {
            workflow_id: Some("w1".to_string()),
            state: Some(ExecutionState::Running),
            include_output: true,
            ..Default::default()
        };
        assert_eq!(
            encode_query(&opts).unwrap(),
            "?workflow_id=w1&state=RUNNING&include_output=true"
        );
    }

    #[test]
    fn test_decode_enveloped_execution() {
        let body = r#"{
            "execution": {
                "created_at": "1970-01-01T00:00:00.000000",
                "description": "this is a description",
                "id": "1",
                "input": "{}",
                "output": "{}",
                "params": "{}",
                "project_id": "p1",
                "state": "SUCCESS",
                "state_info": null,
                "updated_at": "1970-01-01T00:00:00.000000",
                "workflow_id": "w1",
                "workflow_name": "flow",
                "workflow_namespace": "some_namespace"
            }
        }"#;
        let execution: Execution = decode_entity(body, Execution::ENVELOPE).unwrap();
        assert_eq!(execution.id, "1");
        assert_eq!(execution.state, ExecutionState::Success);
        assert_eq!(execution.state_info, "");
        assert_eq!(execution.workflow_namespace, "some_namespace");
    }

    #[test]
    fn test_failure_message_includes_state_info() {
        let body = r#"{"id": "9", "state": "ERROR", "state_info": "task failed"}"#;
        let execution: Execution = decode_entity(body, Execution::ENVELOPE).unwrap();
        assert_eq!(
            failure_message(&execution),
            "execution 9 in ERROR state: task failed"
        );
    }
}
