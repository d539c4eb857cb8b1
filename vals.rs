use crate::*;

/// Request dispatch mode. `NoCors` forces cross-origin responses to come back
/// opaque, which is the only way to prefetch assets from hosts without CORS
/// support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    #[default]
    Cors,
    NoCors,
}

/// Normalized request identity used as the cache key: method + URL string.
/// URLs are kept as strings because manifest entries may be relative (`./`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub method: Method,
    pub url: String,
}

/// An outgoing request. Deliberately not `Clone`: a request passed to a
/// network or storage call is consumed, and a second consumer needs a fresh
/// [`Request::duplicate`] first.
#[derive(Debug)]
pub struct Request {
    method: Method,
    url: String,
    mode: FetchMode,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            mode: FetchMode::default(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn no_cors(mut self) -> Self {
        self.mode = FetchMode::NoCors;
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mode(&self) -> FetchMode {
        self.mode
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn key(&self) -> CacheKey {
        CacheKey {
            method: self.method.clone(),
            url: self.url.clone(),
        }
    }

    /// Fresh copy for a second consumer. `Bytes` makes the body snapshot cheap.
    pub fn duplicate(&self) -> Self {
        Self {
            method: self.method.clone(),
            url: self.url.clone(),
            mode: self.mode,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

/// A response snapshot: status, headers and body bytes. Like [`Request`] it is
/// single-use; storing it and returning it to the page are two consumers and
/// require a [`Response::duplicate`].
///
/// An opaque response is a cross-origin `no-cors` result whose status and body
/// cannot be inspected, only stored and replayed whole.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    opaque: bool,
    // An opaque browser response cannot be rebuilt from its snapshot (the
    // body is unreadable), so the original handle rides along on wasm32.
    #[cfg(target_arch = "wasm32")]
    raw: Option<web_sys::Response>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            opaque: false,
            #[cfg(target_arch = "wasm32")]
            raw: None,
        }
    }

    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK).with_body(body)
    }

    /// Cross-origin `no-cors` result: no inspectable status, headers or body.
    pub fn opaque() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            opaque: true,
            #[cfg(target_arch = "wasm32")]
            raw: None,
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub(crate) fn with_raw(mut self, raw: web_sys::Response) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Alias of the underlying browser response, if this value wraps one.
    #[cfg(target_arch = "wasm32")]
    pub(crate) fn raw_handle(&self) -> Option<web_sys::Response> {
        self.raw.clone()
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn is_opaque(&self) -> bool {
        self.opaque
    }

    pub fn duplicate(&self) -> Self {
        Self {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
            opaque: self.opaque,
            // Response.clone() fails once the body has been consumed; the
            // duplicate then degrades to its snapshot
            #[cfg(target_arch = "wasm32")]
            raw: self.raw.as_ref().and_then(|raw| match raw.clone() {
                Ok(copy) => Some(copy),
                Err(e) => {
                    warn!("failed to duplicate browser response: {e:?}");
                    None
                }
            }),
        }
    }
}

/// Outcome of fetch interception, consumed by the host shim.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The URL is excluded: let the request pass through to the network
    /// untouched and uncached.
    Bypass,
    /// Serve this response to the page (cache hit or freshly fetched).
    Respond(Response),
}
