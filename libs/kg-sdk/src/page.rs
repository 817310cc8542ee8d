//! Offset pagination over KG list endpoints.
//!
//! A [`ResultPage`] remembers the request that produced it. Following pages
//! are fetched by re-issuing that request with `from` moved past the current
//! page. [`ResultPage::items`] and [`ResultPage::pages`] turn this into
//! streams.
//!
//! # Example
//!
//! ```rust,ignore
//! use futures_util::StreamExt;
//!
//! let page = client.instances().list(&InstanceListOptions::of_type(PERSON)).await?;
//! let mut people = page.items();
//! while let Some(person) = people.next().await {
//!     let person = person?;
//!     println!("{}", person.id().unwrap_or("unknown"));
//! }
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::future::BoxFuture;
use serde::de::Error as _;
use serde_json::Value;

use crate::context::ResponseContext;
use crate::error::{ClientError, KgError};
use crate::result::{Decoder, ResponseMeta, take_data};
use crate::transport::{RequestArgs, Transport};

/// Whether a page is followed by another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAvailability {
    /// `start_from + size < total`.
    Available,
    /// The known total has been reached.
    Exhausted,
    /// The response did not report a total; only fetching tells.
    Unknown,
}

/// What it takes to fetch another page like this one.
struct PageCursor<T> {
    transport: Transport,
    request: Option<RequestArgs>,
    decoder: Decoder<T>,
}

impl<T> Clone for PageCursor<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            request: self.request.clone(),
            decoder: Arc::clone(&self.decoder),
        }
    }
}

impl<T> PageCursor<T> {
    async fn fetch(self, request: RequestArgs) -> Result<ResultPage<T>, ClientError> {
        let ctx = self.transport.execute(request).await?;
        ResultPage::from_context(ctx, self.decoder)
    }
}

/// One page of a list endpoint.
#[derive(Clone)]
pub struct ResultPage<T> {
    /// Decoded items, `None` when the response carried an error or no data.
    pub data: Option<Vec<T>>,
    pub error: Option<KgError>,
    pub meta: ResponseMeta,
    /// Total number of items, when the server reported it. Negative totals
    /// are read as zero.
    pub total: Option<u64>,
    /// Number of items in this page.
    pub size: u64,
    /// Offset of the first item of this page.
    pub start_from: u64,
    cursor: PageCursor<T>,
}

impl<T: fmt::Debug> fmt::Debug for ResultPage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultPage")
            .field("data", &self.data)
            .field("error", &self.error)
            .field("meta", &self.meta)
            .field("total", &self.total)
            .field("size", &self.size)
            .field("start_from", &self.start_from)
            .finish_non_exhaustive()
    }
}

impl<T> ResultPage<T> {
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] when `data` is not a list or an item
    /// does not decode.
    pub fn from_context(ctx: ResponseContext, decoder: Decoder<T>) -> Result<Self, ClientError> {
        let error = ctx.error();
        let meta = ResponseMeta::from_context(&ctx);
        let total = ctx
            .field("total")
            .and_then(Value::as_i64)
            .map(|t| u64::try_from(t).unwrap_or(0));
        let reported_size = ctx.field("size").and_then(Value::as_u64);
        let start_from = ctx.field("from").and_then(Value::as_u64).unwrap_or(0);
        let id_namespace = ctx.id_namespace().to_owned();

        let (content, request, transport) = ctx.into_parts();
        let data = match take_data(content) {
            Some(Value::Array(items)) if error.is_none() => Some(
                items
                    .into_iter()
                    .map(|item| decoder(item, &id_namespace))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(_) if error.is_none() => {
                return Err(ClientError::Decode(serde_json::Error::custom(
                    "expected a list in response data",
                )));
            }
            _ => None,
        };

        let size = reported_size.unwrap_or_else(|| {
            data.as_ref()
                .map_or(0, |d| u64::try_from(d.len()).unwrap_or(u64::MAX))
        });

        Ok(Self {
            data,
            error,
            meta,
            total,
            size,
            start_from,
            cursor: PageCursor {
                transport,
                request,
                decoder,
            },
        })
    }

    /// Items of this page; empty when there are none.
    #[must_use]
    pub fn items_slice(&self) -> &[T] {
        self.data.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items_slice().is_empty()
    }

    #[must_use]
    pub fn has_next_page(&self) -> PageAvailability {
        match self.total {
            Some(total) if self.start_from.saturating_add(self.size) < total => {
                PageAvailability::Available
            }
            Some(_) => PageAvailability::Exhausted,
            None => PageAvailability::Unknown,
        }
    }

    /// Request for the page after this one, or `None` when there is nothing
    /// left to ask for.
    fn following_request(&self) -> Option<RequestArgs> {
        if self.error.is_some()
            || self.is_empty()
            || self.size == 0
            || self.has_next_page() == PageAvailability::Exhausted
        {
            return None;
        }
        let mut request = self.cursor.request.clone()?;
        request.params.set("from", self.start_from.saturating_add(self.size));
        Some(request)
    }

    /// Fetch the page after this one.
    ///
    /// `Ok(None)` when this page is the last one, including when the
    /// following page turns out to be empty.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent or the page
    /// does not decode. API errors come back as a page with `error` set.
    pub async fn next_page(&self) -> Result<Option<Self>, ClientError> {
        let Some(request) = self.following_request() else {
            return Ok(None);
        };
        let page = self.cursor.clone().fetch(request).await?;
        Ok((page.error.is_some() || !page.is_empty()).then_some(page))
    }

    /// Every item from this page onwards, fetching pages as needed.
    ///
    /// Stops at the reported total, or after the first empty page when no
    /// total was reported. An error page yields one [`ClientError::Api`]
    /// and ends the stream. Each call starts over from this page.
    #[must_use]
    pub fn items(&self) -> Items<T>
    where
        T: Clone,
    {
        let mut items = Items {
            cursor: self.cursor.clone(),
            following: None,
            buffer: VecDeque::new(),
            position: self.start_from,
            total: None,
            pending_error: None,
            current_fetch: None,
            done: false,
        };
        items.absorb(self.clone());
        items
    }

    /// This page followed by every following page.
    ///
    /// Stops after an error page, before an empty page, and once the
    /// reported total is reached. Each call starts over from this page.
    #[must_use]
    pub fn pages(&self) -> Pages<T>
    where
        T: Clone,
    {
        Pages {
            cursor: self.cursor.clone(),
            ready: Some(self.clone()),
            following: None,
            current_fetch: None,
            done: false,
        }
    }
}

type PageFuture<T> = BoxFuture<'static, Result<ResultPage<T>, ClientError>>;

/// Stream returned by [`ResultPage::items`].
#[must_use = "streams do nothing unless polled"]
pub struct Items<T> {
    cursor: PageCursor<T>,
    following: Option<RequestArgs>,
    buffer: VecDeque<T>,
    /// Global index of the next item.
    position: u64,
    total: Option<u64>,
    pending_error: Option<KgError>,
    current_fetch: Option<PageFuture<T>>,
    done: bool,
}

impl<T> Unpin for Items<T> {}

impl<T> Items<T> {
    fn absorb(&mut self, page: ResultPage<T>) {
        if let Some(error) = page.error {
            self.pending_error = Some(error);
            self.following = None;
            return;
        }
        if page.total.is_some() {
            self.total = page.total;
        }
        self.following = page.following_request();
        self.buffer.extend(page.data.unwrap_or_default());
    }

    fn total_reached(&self) -> bool {
        self.total.is_some_and(|total| self.position >= total)
    }
}

impl<T: Send + 'static> Stream for Items<T> {
    type Item = Result<T, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.done {
                return Poll::Ready(None);
            }

            if let Some(error) = this.pending_error.take() {
                this.done = true;
                return Poll::Ready(Some(Err(ClientError::Api(error))));
            }

            if this.total_reached() {
                this.done = true;
                this.buffer.clear();
                return Poll::Ready(None);
            }

            if let Some(item) = this.buffer.pop_front() {
                this.position += 1;
                return Poll::Ready(Some(Ok(item)));
            }

            if let Some(fut) = this.current_fetch.as_mut() {
                match fut.as_mut().poll(cx) {
                    Poll::Ready(Ok(page)) => {
                        this.current_fetch = None;
                        this.absorb(page);
                        continue;
                    }
                    Poll::Ready(Err(e)) => {
                        this.current_fetch = None;
                        this.done = true;
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Pending => return Poll::Pending,
                }
            }

            let Some(request) = this.following.take() else {
                this.done = true;
                return Poll::Ready(None);
            };
            this.current_fetch = Some(Box::pin(this.cursor.clone().fetch(request)));
        }
    }
}

/// Stream returned by [`ResultPage::pages`].
#[must_use = "streams do nothing unless polled"]
pub struct Pages<T> {
    cursor: PageCursor<T>,
    ready: Option<ResultPage<T>>,
    following: Option<RequestArgs>,
    current_fetch: Option<PageFuture<T>>,
    done: bool,
}

impl<T> Unpin for Pages<T> {}

impl<T: Send + 'static> Stream for Pages<T> {
    type Item = Result<ResultPage<T>, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.done {
                return Poll::Ready(None);
            }

            if let Some(page) = this.ready.take() {
                this.following = page.following_request();
                return Poll::Ready(Some(Ok(page)));
            }

            if let Some(fut) = this.current_fetch.as_mut() {
                match fut.as_mut().poll(cx) {
                    Poll::Ready(Ok(page)) => {
                        this.current_fetch = None;
                        if page.error.is_none() && page.is_empty() {
                            this.done = true;
                            return Poll::Ready(None);
                        }
                        this.ready = Some(page);
                        continue;
                    }
                    Poll::Ready(Err(e)) => {
                        this.current_fetch = None;
                        this.done = true;
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Pending => return Poll::Pending,
                }
            }

            let Some(request) = this.following.take() else {
                this.done = true;
                return Poll::Ready(None);
            };
            this.current_fetch = Some(Box::pin(this.cursor.clone().fetch(request)));
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ID_NAMESPACE;
    use crate::result::response_object_decoder;
    use crate::transport::{QueryParams, TransportConfig};
    use http::{Method, StatusCode};
    use kg_auth::TokenHandler;
    use kg_http::{HttpClientBuilder, HttpClientConfig};
    use serde_json::json;
    use url::Url;

    fn page(content: Value) -> Result<ResultPage<u64>, ClientError> {
        let http = HttpClientBuilder::with_config(HttpClientConfig::for_testing())
            .build()
            .unwrap();
        let endpoint = Url::parse("http://localhost:1/v3-beta/").unwrap();
        let transport = Transport::new(
            http,
            TransportConfig {
                endpoint: endpoint.clone(),
                id_namespace: DEFAULT_ID_NAMESPACE.to_owned(),
                profiling: false,
                token_handler: Arc::new(TokenHandler::static_token("abc")),
                client_token_handler: None,
            },
        );
        let request = RequestArgs {
            method: Method::GET,
            url: endpoint.join("numbers").unwrap(),
            params: QueryParams::new().with("from", 0).with("size", 10),
            payload: None,
        };
        let ctx = ResponseContext::new(Some(content), request, StatusCode::OK, transport);
        ResultPage::from_context(ctx, response_object_decoder())
    }

    #[test]
    fn next_page_availability() {
        let exhausted = page(json!({"data": [1], "total": 20, "from": 10, "size": 10})).unwrap();
        assert_eq!(exhausted.has_next_page(), PageAvailability::Exhausted);
        assert!(exhausted.following_request().is_none());

        let available = page(json!({"data": [1], "total": 25, "from": 10, "size": 10})).unwrap();
        assert_eq!(available.has_next_page(), PageAvailability::Available);
        let next = available.following_request().unwrap();
        assert_eq!(next.params.get("from"), Some("20"));
        assert_eq!(next.params.get("size"), Some("10"));

        let unknown = page(json!({"data": [1], "from": 10, "size": 10})).unwrap();
        assert_eq!(unknown.has_next_page(), PageAvailability::Unknown);
        assert!(unknown.following_request().is_some());
    }

    #[test]
    fn huge_offsets_do_not_overflow() {
        let from = u64::MAX - 1;
        let known = page(json!({"data": [1], "total": 5, "from": from, "size": 10})).unwrap();
        assert_eq!(known.has_next_page(), PageAvailability::Exhausted);
        assert!(known.following_request().is_none());

        let unknown = page(json!({"data": [1], "from": from, "size": 10})).unwrap();
        let next = unknown.following_request().unwrap();
        assert_eq!(next.params.get("from"), Some(u64::MAX.to_string().as_str()));
    }

    #[test]
    fn size_falls_back_to_item_count() {
        let page = page(json!({"data": [1, 2, 3], "total": -4})).unwrap();
        assert_eq!(page.size, 3);
        assert_eq!(page.start_from, 0);
        assert_eq!(page.total, Some(0));
        assert_eq!(page.items_slice(), &[1, 2, 3]);
    }

    #[test]
    fn error_page_has_no_following_page() {
        let page = page(json!({
            "data": [1, 2],
            "error": {"code": 500, "message": "boom"},
            "total": 100,
            "size": 2
        }))
        .unwrap();
        assert!(page.data.is_none());
        assert!(page.is_empty());
        assert!(page.following_request().is_none());
    }

    #[test]
    fn non_list_data_is_a_decode_error() {
        let err = page(json!({"data": {"a": 1}})).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)), "got {err:?}");

        let err = page(json!({"data": ["x"]})).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)), "got {err:?}");
    }
}
