//! Property-based tests using proptest
//!
//! These tests check option encoding and the paginator's request pattern
//! using randomized inputs.

use async_trait::async_trait;
use mistral_client::options::{encode_body, encode_query};
use mistral_client::transport::Headers;
use mistral_client::{
    cron_triggers, executions, Error, Pager, RawResponse, RequestBody, ServiceClient, Transport,
};
use proptest::prelude::*;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const ENDPOINT: &str = "http://mistral.test/v2";

/// Optional text option, sometimes empty
fn arb_opt_text() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        "[a-zA-Z0-9 _&=/-]{1,20}".prop_map(Some),
    ]
}

fn decode_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .into_owned()
        .collect()
}

/// Transport serving a fixed list of pages, counting GETs
struct ScriptedPages {
    pages: Vec<String>,
    requests: AtomicUsize,
}

impl ScriptedPages {
    /// Pages of `sizes` items, linked in order; the last page has no link
    fn new(sizes: &[usize]) -> Self {
        let pages = sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| {
                let items: Vec<Value> = (0..size)
                    .map(|j| json!({ "id": format!("{}-{}", i, j) }))
                    .collect();
                let mut page = json!({ "items": items });
                if i + 1 < sizes.len() {
                    page["next"] = json!(format!("{}/items?page={}", ENDPOINT, i + 1));
                }
                page.to_string()
            })
            .collect();

        Self {
            pages,
            requests: AtomicUsize::new(0),
        }
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedPages {
    async fn get(&self, url: &str, _headers: &Headers) -> mistral_client::Result<RawResponse> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let index = url
            .rsplit_once("page=")
            .and_then(|(_, n)| n.parse::<usize>().ok())
            .unwrap_or(0);
        match self.pages.get(index) {
            Some(body) => Ok(RawResponse::new(200, body.clone())),
            None => Ok(RawResponse::new(404, "")),
        }
    }

    async fn post(
        &self,
        _url: &str,
        _body: RequestBody,
        _headers: &Headers,
    ) -> mistral_client::Result<RawResponse> {
        Ok(RawResponse::new(405, ""))
    }

    async fn delete(&self, _url: &str, _headers: &Headers) -> mistral_client::Result<RawResponse> {
        Ok(RawResponse::new(405, ""))
    }
}

#[derive(Debug, Deserialize)]
struct Item {
    #[allow(dead_code)]
    id: String,
}

fn pager_over(transport: &Arc<ScriptedPages>) -> Pager<Item> {
    let client = ServiceClient::with_transport(ENDPOINT, transport.clone()).unwrap();
    Pager::new(client, format!("{}/items", ENDPOINT), "items")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// An optional query field is emitted exactly when it is non-empty
    #[test]
    fn test_query_omits_empty_fields(
        workflow_name in arb_opt_text(),
        description in arb_opt_text(),
        limit in prop::option::of(0u32..1000),
    ) {
        let opts = executions::ListOpts {
            workflow_name: workflow_name.clone(),
            description: description.clone(),
            limit,
            ..Default::default()
        };
        let query = encode_query(&opts).unwrap();
        let pairs = decode_query(&query);

        let expected_name = workflow_name.filter(|s| !s.is_empty());
        let expected_description = description.filter(|s| !s.is_empty());
        let expected_limit = limit.filter(|&l| l != 0).map(|l| l.to_string());

        prop_assert_eq!(pairs.get("workflow_name").cloned(), expected_name);
        prop_assert_eq!(pairs.get("description").cloned(), expected_description);
        prop_assert_eq!(pairs.get("limit").cloned(), expected_limit);
        prop_assert_eq!(query.is_empty(), pairs.is_empty());
    }

    /// Encoding the same options twice gives the same output
    #[test]
    fn test_encoding_is_deterministic(
        name in "[a-z]{1,10}",
        workflow_id in "[a-z0-9-]{1,36}",
        pattern in arb_opt_text(),
        count in prop::option::of(0u32..100),
    ) {
        let opts = cron_triggers::CreateOpts {
            pattern,
            remaining_executions: count,
            ..cron_triggers::CreateOpts::new(name, workflow_id)
        };
        let first = encode_body(&opts, Some("cron_trigger")).unwrap();
        let second = encode_body(&opts, Some("cron_trigger")).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Required fields fail validation only when empty
    #[test]
    fn test_required_field_validation(workflow_id in arb_opt_text()) {
        let id = workflow_id.unwrap_or_default();
        let result = encode_body(&executions::CreateOpts::new(id.clone()), Some("execution"));

        if id.is_empty() {
            let is_validation = matches!(result, Err(Error::Validation { field: "workflow_id" }));
            prop_assert!(is_validation);
        } else {
            let body = result.unwrap();
            prop_assert_eq!(&body["execution"]["workflow_id"], &json!(id));
        }
    }

    /// One request per page, plus one for a trailing empty page
    #[test]
    fn test_pager_requests_every_page_once(
        sizes in prop::collection::vec(1usize..5, 1..6),
        trailing_empty in any::<bool>(),
    ) {
        let mut script = sizes.clone();
        if trailing_empty {
            script.push(0);
        }
        let transport = Arc::new(ScriptedPages::new(&script));

        let items = tokio_test::block_on(pager_over(&transport).all_pages()).unwrap();

        prop_assert_eq!(items.len(), sizes.iter().sum::<usize>());
        prop_assert_eq!(transport.requests(), script.len());
    }

    /// Stopping after page k means exactly k requests
    #[test]
    fn test_pager_break_stops_requests(
        sizes in prop::collection::vec(1usize..5, 1..6),
        stop_after in 1usize..6,
    ) {
        let transport = Arc::new(ScriptedPages::new(&sizes));
        let mut visited = 0;

        tokio_test::block_on(pager_over(&transport).each_page(|_| {
            visited += 1;
            if visited == stop_after {
                Ok(ControlFlow::Break(()))
            } else {
                Ok(ControlFlow::Continue(()))
            }
        }))
        .unwrap();

        let expected = stop_after.min(sizes.len());
        prop_assert_eq!(visited, expected);
        prop_assert_eq!(transport.requests(), expected);
    }
}
