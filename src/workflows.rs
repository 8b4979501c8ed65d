//! Workflows
//!
//! A workflow is created from a definition document written in the service's
//! workflow language. The document travels as the raw request body
//! (`text/plain`); namespace and scope travel in the query string. One
//! document may define several workflows, so creation returns a list.

use crate::decode::{decode_many, null_as_default, timestamp};
use crate::error::Result;
use crate::options::{encode_query, validate, DateFilter, Field, Options, SortDir};
use crate::pagination::Pager;
use crate::resource::{self, Resource, CREATE_OK};
use crate::transport::{RequestBody, ServiceClient};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Visibility of a workflow or cron trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Private,
    Public,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Private => "private",
            Scope::Public => "public",
        }
    }
}

impl From<Scope> for crate::options::OptionValue<'_> {
    fn from(scope: Scope) -> Self {
        crate::options::OptionValue::Str(Cow::Borrowed(scope.as_str()))
    }
}

/// A workflow known to the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub namespace: String,

    /// Definition document the workflow was created from
    #[serde(default, deserialize_with = "null_as_default")]
    pub definition: String,

    /// Comma-separated input parameter names
    #[serde(default, deserialize_with = "null_as_default")]
    pub input: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub project_id: String,

    /// `private` or `public`
    #[serde(default, deserialize_with = "null_as_default")]
    pub scope: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,

    #[serde(default, with = "timestamp::mistral")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, with = "timestamp::mistral")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Resource for Workflow {
    const PATH: &'static str = "workflows";
    const ENVELOPE: &'static str = "workflow";
    const LIST_KEY: &'static str = "workflows";
}

/// Filters for [`list`]
#[derive(Debug, Clone, Default)]
pub struct ListOpts {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub scope: Option<Scope>,
    pub project_id: Option<String>,
    pub definition: Option<String>,
    pub input: Option<String>,
    /// Workflows carrying all of these tags
    pub tags: Vec<String>,
    pub created_at: Option<DateFilter>,
    pub updated_at: Option<DateFilter>,
    pub sort_key: Option<String>,
    pub sort_dir: Option<SortDir>,
    /// Resume listing after this workflow ID
    pub marker: Option<String>,
    /// Maximum workflows per page
    pub limit: Option<u32>,
}

impl Options for ListOpts {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::query("name", self.name.as_deref()),
            Field::query("namespace", self.namespace.as_deref()),
            Field::query("scope", self.scope),
            Field::query("project_id", self.project_id.as_deref()),
            Field::query("definition", self.definition.as_deref()),
            Field::query("input", self.input.as_deref()),
            Field::query("tags", &self.tags),
            Field::query("created_at", self.created_at.as_ref()),
            Field::query("updated_at", self.updated_at.as_ref()),
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
    /// Workflow definition document, sent verbatim
    pub definition: String,
    pub namespace: Option<String>,
    pub scope: Option<Scope>,
}

impl CreateOpts {
    pub fn new(definition: impl Into<String>) -> Self {
        Self {
            definition: definition.into(),
            ..Default::default()
        }
    }
}

impl Options for CreateOpts {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::body("definition", &self.definition).required(),
            Field::query("namespace", self.namespace.as_deref()),
            Field::query("scope", self.scope),
        ]
    }
}

pub fn list_url(client: &ServiceClient) -> String {
    resource::collection_url::<Workflow>(client)
}

pub fn create_url(client: &ServiceClient) -> String {
    resource::collection_url::<Workflow>(client)
}

pub fn get_url(client: &ServiceClient, id: &str) -> String {
    resource::member_url::<Workflow>(client, id)
}

pub fn delete_url(client: &ServiceClient, id: &str) -> String {
    resource::member_url::<Workflow>(client, id)
}

/// List workflows page by page
pub fn list(client: &ServiceClient, opts: &ListOpts) -> Result<Pager<Workflow>> {
    resource::list(client, list_url(client), opts)
}

/// Get a workflow by ID or name
pub async fn get(client: &ServiceClient, id: &str) -> Result<Workflow> {
    resource::get(client, &get_url(client, id)).await
}

/// Create the workflows declared in `opts.definition`
pub async fn create(client: &ServiceClient, opts: &CreateOpts) -> Result<Vec<Workflow>> {
    validate(opts)?;
    let url = create_url(client) + &encode_query(opts)?;

    let body = client
        .post(&url, RequestBody::Text(opts.definition.clone()), CREATE_OK)
        .await?;

    let workflows = decode_many(&body, Workflow::LIST_KEY)?;
    tracing::debug!("created {} workflows", workflows.len());
    Ok(workflows)
}

/// Delete a workflow
pub async fn delete(client: &ServiceClient, id: &str) -> Result<()> {
    resource::delete(client, &delete_url(client, id)).await
}
