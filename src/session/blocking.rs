//! Blocking REST session

use super::{ApiResponse, SessionCore};
use crate::config::SessionConfig;
use crate::error::Result;
use crate::http::{BlockingReqwestTransport, BlockingTransport, Decision, Outcome, RequestDescriptor};
use crate::pagination::{page_items, PageAccumulator, PageRequest, Pager, Pages};
use crate::types::JsonValue;
use std::collections::VecDeque;
use tracing::debug;

/// Blocking Dashboard API session
///
/// Every call runs to completion on the calling thread, retry waits
/// included. There is no concurrency gate: one thread issues one request
/// at a time.
pub struct RestSession<T = BlockingReqwestTransport> {
    core: SessionCore,
    transport: T,
}

impl RestSession<BlockingReqwestTransport> {
    /// Create a session backed by reqwest's blocking client
    pub fn new(config: SessionConfig) -> Result<Self> {
        let core = SessionCore::new(config)?;
        let transport = BlockingReqwestTransport::from_config(core.config())?;
        Ok(Self { core, transport })
    }
}

impl<T: BlockingTransport> RestSession<T> {
    /// Create a session with a custom transport
    pub fn with_transport(config: SessionConfig, transport: T) -> Result<Self> {
        Ok(Self {
            core: SessionCore::new(config)?,
            transport,
        })
    }

    /// Session configuration (after environment fallbacks)
    pub fn config(&self) -> &SessionConfig {
        self.core.config()
    }

    /// Send one logical request, retrying per the session's policy
    pub fn request(&self, request: &RequestDescriptor) -> Result<ApiResponse> {
        if let Some(simulated) = self.core.simulated(request) {
            return Ok(simulated);
        }

        let mut retries = 0;
        let mut hops = 0;
        let mut redirected_to: Option<String> = None;

        loop {
            let attempt = retries + 1;
            if let Some(limiter) = self.core.limiter() {
                limiter.wait_blocking();
            }

            let http = self.core.prepare(request, redirected_to.as_deref());
            let url = http.url.clone();
            debug!(method = %request.method, %url, attempt, "Sending request");
            let result = self.transport.send(http);

            match self.core.policy().decide(request, Outcome::classify(result), attempt) {
                Decision::Accept(response) => return ApiResponse::from_http(response),
                Decision::Redirect { location, .. } => {
                    redirected_to = Some(self.core.follow_redirect(request, &url, &location, &mut hops)?);
                }
                Decision::Retry {
                    wait,
                    reason,
                    status,
                } => {
                    self.core.log_retry(request, attempt, wait, reason, status);
                    retries = attempt;
                    std::thread::sleep(wait);
                }
                Decision::Fail(err) => {
                    self.core.log_failure(request, &err);
                    return Err(err);
                }
            }
        }
    }

    /// Send a request and return its body
    pub fn send(&self, request: &RequestDescriptor) -> Result<Option<JsonValue>> {
        Ok(self.request(request)?.into_body())
    }

    /// GET a resource
    pub fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Option<JsonValue>> {
        let request = query
            .iter()
            .fold(RequestDescriptor::get(path), |request, (key, value)| request.query(*key, value));
        self.send(&request)
    }

    /// POST a JSON body
    pub fn post(&self, path: &str, body: Option<JsonValue>) -> Result<Option<JsonValue>> {
        let request = RequestDescriptor::post(path);
        self.send(&match body {
            Some(body) => request.json(body),
            None => request,
        })
    }

    /// PUT a JSON body
    pub fn put(&self, path: &str, body: Option<JsonValue>) -> Result<Option<JsonValue>> {
        let request = RequestDescriptor::put(path);
        self.send(&match body {
            Some(body) => request.json(body),
            None => request,
        })
    }

    /// DELETE a resource
    pub fn delete(&self, path: &str) -> Result<Option<JsonValue>> {
        self.send(&RequestDescriptor::delete(path))
    }

    /// Fetch every page within budget and merge them
    pub fn get_pages(&self, request: PageRequest) -> Result<JsonValue> {
        let mut pager = Pager::new(request);
        let mut merged = PageAccumulator::new(pager.direction());

        while let Some(next) = pager.next_request() {
            let response = self.request(&next)?;
            merged.push(pager.record_page(&response.headers, response.body))?;
        }

        Ok(merged.finish())
    }

    /// Lazily iterate over the items of every page within budget
    pub fn iter_pages(&self, request: PageRequest) -> PageIter<'_, T> {
        PageIter {
            session: self,
            pager: Pager::new(request),
            buffer: VecDeque::new(),
            failed: false,
        }
    }

    /// Paginate in the mode selected by `use_iterator_for_get_pages`
    pub fn pages(&self, request: PageRequest) -> Result<Pages<PageIter<'_, T>>> {
        if self.config().use_iterator_for_get_pages {
            Ok(Pages::Lazy(self.iter_pages(request)))
        } else {
            self.get_pages(request).map(Pages::Collected)
        }
    }

    /// Close the session, releasing its connection pool
    pub fn close(self) {
        debug!("Closing Dashboard API session");
    }
}

impl<T> std::fmt::Debug for RestSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestSession")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

/// Lazy, single-pass iterator over page items
///
/// Yields `Err` at most once; iteration ends after an error.
pub struct PageIter<'a, T> {
    session: &'a RestSession<T>,
    pager: Pager,
    buffer: VecDeque<JsonValue>,
    failed: bool,
}

impl<T> PageIter<'_, T> {
    /// Pages fetched so far
    pub fn pages_fetched(&self) -> u32 {
        self.pager.pages_fetched()
    }
}

impl<T: BlockingTransport> Iterator for PageIter<'_, T> {
    type Item = Result<JsonValue>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.failed {
                return None;
            }
            let request = self.pager.next_request()?;

            match self.session.request(&request) {
                Ok(response) => {
                    let page = self.pager.record_page(&response.headers, response.body);
                    self.buffer.extend(page_items(page));
                }
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
