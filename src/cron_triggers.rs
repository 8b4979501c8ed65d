//! Cron Triggers
//!
//! A cron trigger starts executions of a workflow on a Unix crontab pattern,
//! optionally from a first execution time and for a bounded number of runs.

use crate::decode::{null_as_default, timestamp};
use crate::error::Result;
use crate::options::{DateFilter, Field, Options, SortDir};
use crate::pagination::Pager;
use crate::resource::{self, Resource};
use crate::transport::ServiceClient;
use crate::workflows::Scope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format of `first_execution_time` in create requests
const FIRST_EXECUTION_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A scheduled trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CronTrigger {
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    /// Unix crontab pattern
    #[serde(default, deserialize_with = "null_as_default")]
    pub pattern: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub project_id: String,

    /// Runs left before the trigger is removed; 0 when unbounded
    #[serde(default, deserialize_with = "null_as_default")]
    pub remaining_executions: u32,

    #[serde(default, deserialize_with = "null_as_default")]
    pub scope: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub workflow_id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub workflow_name: String,

    /// Workflow input values as a JSON document
    #[serde(default, deserialize_with = "null_as_default")]
    pub workflow_input: String,

    /// Workflow type specific parameters as a JSON document
    #[serde(default, deserialize_with = "null_as_default")]
    pub workflow_params: String,

    #[serde(default, with = "timestamp::plain")]
    pub first_execution_time: Option<DateTime<Utc>>,

    #[serde(default, with = "timestamp::plain")]
    pub next_execution_time: Option<DateTime<Utc>>,

    #[serde(default, with = "timestamp::plain")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, with = "timestamp::plain")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Resource for CronTrigger {
    const PATH: &'static str = "cron_triggers";
    const ENVELOPE: &'static str = "cron_trigger";
    const LIST_KEY: &'static str = "cron_triggers";
}

/// Filters for [`list`]
#[derive(Debug, Clone, Default)]
pub struct ListOpts {
    pub name: Option<String>,
    pub pattern: Option<String>,
    pub scope: Option<Scope>,
    pub workflow_name: Option<String>,
    pub workflow_id: Option<String>,
    pub project_id: Option<String>,
    pub created_at: Option<DateFilter>,
    pub sort_key: Option<String>,
    pub sort_dir: Option<SortDir>,
    /// Resume listing after this trigger ID
    pub marker: Option<String>,
    /// Maximum triggers per page
    pub limit: Option<u32>,
}

impl Options for ListOpts {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::query("name", self.name.as_deref()),
            Field::query("pattern", self.pattern.as_deref()),
            Field::query("scope", self.scope),
            Field::query("workflow_name", self.workflow_name.as_deref()),
            Field::query("workflow_id", self.workflow_id.as_deref()),
            Field::query("project_id", self.project_id.as_deref()),
            Field::query("created_at", self.created_at.as_ref()),
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
    pub name: String,
    /// Workflow to run
    pub workflow_id: String,
    /// Unix crontab pattern
    pub pattern: Option<String>,
    /// Stop after this many runs
    pub remaining_executions: Option<u32>,
    /// Workflow input values as a JSON document
    pub workflow_input: Option<String>,
    /// Workflow type specific parameters as a JSON document
    pub workflow_params: Option<String>,
    /// First run, at minute precision
    pub first_execution_time: Option<DateTime<Utc>>,
}

impl CreateOpts {
    pub fn new(name: impl Into<String>, workflow_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workflow_id: workflow_id.into(),
            ..Default::default()
        }
    }
}

impl Options for CreateOpts {
    fn fields(&self) -> Vec<Field<'_>> {
        let first_execution_time = self
            .first_execution_time
            .map(|t| t.format(FIRST_EXECUTION_FORMAT).to_string());

        vec![
            Field::body("name", &self.name).required(),
            Field::body("pattern", self.pattern.as_deref()),
            Field::body("remaining_executions", self.remaining_executions),
            Field::body("workflow_input", self.workflow_input.as_deref()),
            Field::body("workflow_id", &self.workflow_id).required(),
            Field::body("workflow_params", self.workflow_params.as_deref()),
            Field::body("first_execution_time", first_execution_time),
        ]
    }
}

pub fn list_url(client: &ServiceClient) -> String {
    resource::collection_url::<CronTrigger>(client)
}

pub fn create_url(client: &ServiceClient) -> String {
    resource::collection_url::<CronTrigger>(client)
}

pub fn get_url(client: &ServiceClient, id: &str) -> String {
    resource::member_url::<CronTrigger>(client, id)
}

pub fn delete_url(client: &ServiceClient, id: &str) -> String {
    resource::member_url::<CronTrigger>(client, id)
}

/// List cron triggers page by page
pub fn list(client: &ServiceClient, opts: &ListOpts) -> Result<Pager<CronTrigger>> {
    resource::list(client, list_url(client), opts)
}

/// Get a cron trigger by ID or name
pub async fn get(client: &ServiceClient, id: &str) -> Result<CronTrigger> {
    resource::get(client, &get_url(client, id)).await
}

/// Create a cron trigger
pub async fn create(client: &ServiceClient, opts: &CreateOpts) -> Result<CronTrigger> {
    resource::create(client, &create_url(client), opts, Some(CronTrigger::ENVELOPE)).await
}

/// Delete a cron trigger
pub async fn delete(client: &ServiceClient, id: &str) -> Result<()> {
    resource::delete(client, &delete_url(client, id)).await
}
