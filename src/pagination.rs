//! Paginator
//!
//! List responses are linked pages: `{ "<plural>": [...], "next": "<url>" }`.
//! A [`Pager`] follows the `next` links one GET at a time, and only when the
//! caller asks for the next page.
//!
//! Iteration ends when a page has no `next` link, when the caller stops, or
//! when a page comes back empty. An empty page ends iteration even if it
//! carries a `next` link, and is not handed to the caller.

use crate::decode::decode_list;
use crate::error::{Error, Result};
use crate::transport::ServiceClient;
use futures::stream::{self, Stream};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::marker::PhantomData;
use std::ops::ControlFlow;

/// Accepted status for list requests
const LIST_OK: &[u16] = &[200];

/// One decoded page of a listing
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Entities on this page, in server order
    pub items: Vec<T>,
    /// Link to the following page, if the server sent one
    pub next: Option<String>,
    /// Raw response body
    pub body: String,
}

/// Link fields of a list response
#[derive(Deserialize)]
struct Links {
    #[serde(default)]
    next: Option<String>,
}

impl<T: DeserializeOwned> Page<T> {
    /// Decode a page whose entities live under `key`
    pub fn parse(body: String, key: &str) -> Result<Self> {
        let items = decode_list(&body, key)?;
        let links: Links = serde_json::from_str(&body).map_err(|e| Error::decode(e, &body))?;
        let next = links.next.filter(|s| !s.is_empty());

        Ok(Self { items, next, body })
    }
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    HasNext(String),
    Done,
}

/// Lazy walker over a linked listing
#[derive(Debug)]
pub struct Pager<T> {
    client: ServiceClient,
    key: &'static str,
    state: State,
    pages: usize,
    _item: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Pager<T> {
    /// Start a listing at `url`; entities are read from `key` on each page
    pub fn new(client: ServiceClient, url: String, key: &'static str) -> Self {
        Self {
            client,
            key,
            state: State::HasNext(url),
            pages: 0,
            _item: PhantomData,
        }
    }

    /// True once no further request will be issued
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Fetch the next non-empty page, or `None` when the listing is exhausted.
    ///
    /// Issues at most one request. After an error the pager is done.
    pub async fn next_page(&mut self) -> Result<Option<Page<T>>> {
        let link = match std::mem::replace(&mut self.state, State::Done) {
            State::HasNext(link) => link,
            State::Done => return Ok(None),
        };

        let url = self.client.resolve(&link)?;
        let body = self.client.get(&url, LIST_OK).await?;
        let page = Page::<T>::parse(body, self.key)?;

        if page.is_empty() {
            tracing::debug!("{}: empty page after {} pages, done", self.key, self.pages);
            return Ok(None);
        }

        self.pages += 1;
        tracing::debug!(
            "{}: page {} with {} items, next: {:?}",
            self.key,
            self.pages,
            page.items.len(),
            page.next
        );

        if let Some(next) = &page.next {
            self.state = State::HasNext(next.clone());
        }

        Ok(Some(page))
    }

    /// Hand each page to `visitor` until the listing ends or the visitor
    /// returns `ControlFlow::Break`. No page is requested before the
    /// previous one has been visited.
    pub async fn each_page<F>(mut self, mut visitor: F) -> Result<()>
    where
        F: FnMut(Page<T>) -> Result<ControlFlow<()>>,
    {
        while let Some(page) = self.next_page().await? {
            if visitor(page)?.is_break() {
                tracing::debug!("{}: stopped by caller after {} pages", self.key, self.pages);
                break;
            }
        }
        Ok(())
    }

    /// Collect the items of every page
    pub async fn all_pages(self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        self.each_page(|page| {
            items.extend(page.items);
            Ok(ControlFlow::Continue(()))
        })
        .await?;
        Ok(items)
    }

    /// Expose the listing as a stream of pages
    pub fn into_stream(self) -> impl Stream<Item = Result<Page<T>>> {
        stream::try_unfold(self, |mut pager| async move {
            Ok(pager.next_page().await?.map(|page| (page, pager)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Item {
        id: String,
    }

    #[test]
    fn test_parse_page_with_next() {
        let body = r#"{"items": [{"id": "1"}], "next": "http://h/items?marker=1"}"#;
        let page = Page::<Item>::parse(body.to_string(), "items").unwrap();
        assert_eq!(page.items[0].id, "1");
        assert_eq!(page.next.as_deref(), Some("http://h/items?marker=1"));
        assert!(!page.is_empty());
    }

    #[test]
    fn test_parse_page_without_next() {
        let page = Page::<Item>::parse(r#"{"items": []}"#.to_string(), "items").unwrap();
        assert!(page.is_empty());
        assert!(page.next.is_none());
    }

    #[test]
    fn test_empty_next_link_is_no_link() {
        let page =
            Page::<Item>::parse(r#"{"items": [{"id": "1"}], "next": ""}"#.to_string(), "items")
                .unwrap();
        assert!(page.next.is_none());
    }

    #[test]
    fn test_missing_list_key_is_empty_page() {
        let page = Page::<Item>::parse(r#"{"next": null}"#.to_string(), "items").unwrap();
        assert!(page.is_empty());
        assert!(page.next.is_none());
    }

    #[test]
    fn test_non_object_page_is_decode_error() {
        let result = Page::<Item>::parse("[]".to_string(), "items");
        assert!(matches!(result, Err(Error::Decode { .. })));
    }

    #[test]
    fn test_new_pager_is_not_done() {
        let client = ServiceClient::new("http://localhost:8989/v2").unwrap();
        let pager = Pager::<Item>::new(client, "http://localhost:8989/v2/items".into(), "items");
        assert!(!pager.is_done());
    }
}
