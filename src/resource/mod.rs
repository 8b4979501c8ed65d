//! Resource Operations
//!
//! Generic Create/Get/Delete/List shared by every resource kind. Each
//! operation validates and encodes its options, issues one request through
//! the [`ServiceClient`], and decodes the answer; listings defer their
//! requests to a [`Pager`].
//!
//! # Resource Kinds
//!
//! - [`crate::workflows`] - workflow definitions
//! - [`crate::executions`] - workflow executions
//! - [`crate::cron_triggers`] - scheduled executions

use crate::decode::decode_entity;
use crate::error::Result;
use crate::options::{encode_body, encode_query, Options};
use crate::pagination::Pager;
use crate::transport::{RequestBody, ServiceClient};
use serde::de::DeserializeOwned;

/// Accepted statuses for Get and List
pub const GET_OK: &[u16] = &[200];
/// Accepted statuses for Create
pub const CREATE_OK: &[u16] = &[200, 201];
/// Accepted statuses for Delete
pub const DELETE_OK: &[u16] = &[202, 204];

/// A remote entity kind and its wire names
pub trait Resource: DeserializeOwned {
    /// Collection path segment, e.g. `executions`
    const PATH: &'static str;
    /// Key wrapping a single entity, e.g. `execution`
    const ENVELOPE: &'static str;
    /// Key holding a page of entities, e.g. `executions`
    const LIST_KEY: &'static str;
}

/// Collection URL of `R`
pub fn collection_url<R: Resource>(client: &ServiceClient) -> String {
    client.service_url(&[R::PATH])
}

/// Member URL of `R` with `id`
pub fn member_url<R: Resource>(client: &ServiceClient, id: &str) -> String {
    client.service_url(&[R::PATH, id])
}

/// Start a listing at `url` filtered by `opts`. Fails only on invalid
/// options; no request is issued until the pager is advanced.
pub fn list<R, O>(client: &ServiceClient, url: String, opts: &O) -> Result<Pager<R>>
where
    R: Resource,
    O: Options + ?Sized,
{
    let query = encode_query(opts)?;
    Ok(Pager::new(client.clone(), url + &query, R::LIST_KEY))
}

/// Fetch one entity
pub async fn get<R: Resource>(client: &ServiceClient, url: &str) -> Result<R> {
    let body = client.get(url, GET_OK).await?;
    decode_entity(&body, R::ENVELOPE)
}

/// Create an entity from a JSON body built from `opts`
pub async fn create<R, O>(
    client: &ServiceClient,
    url: &str,
    opts: &O,
    envelope: Option<&str>,
) -> Result<R>
where
    R: Resource,
    O: Options + ?Sized,
{
    let body = encode_body(opts, envelope)?;
    let response = client.post(url, RequestBody::Json(body), CREATE_OK).await?;
    decode_entity(&response, R::ENVELOPE)
}

/// Delete an entity
pub async fn delete(client: &ServiceClient, url: &str) -> Result<()> {
    client.delete(url, DELETE_OK).await
}
