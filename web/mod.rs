use crate::*;

mod convert;
pub use convert::*;

pub use console_error_panic_hook::set_once as set_panic_hook;
pub use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
pub use web_sys::{console, FetchEvent, ServiceWorkerGlobalScope};

pub(crate) fn js_err(e: JsValue) -> Error {
    Error::Storage(format!("{e:?}"))
}

fn to_js(e: Error) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

/// Browser `CacheStorage` behind the [`Caches`] seam.
pub struct WebCaches {
    inner: web_sys::CacheStorage,
}

pub struct WebCache {
    inner: web_sys::Cache,
}

/// The worker-global `fetch` behind the [`Network`] seam.
pub struct WebNetwork {
    scope: ServiceWorkerGlobalScope,
}

#[async_trait(?Send)]
impl Caches for WebCaches {
    type Cache = WebCache;

    async fn open(&self, name: &str) -> Result<WebCache> {
        let cache = JsFuture::from(self.inner.open(name)).await.map_err(js_err)?;
        Ok(WebCache {
            inner: cache.unchecked_into(),
        })
    }

    async fn list(&self) -> Result<Vec<String>> {
        let names = JsFuture::from(self.inner.keys()).await.map_err(js_err)?;
        Ok(names
            .unchecked_into::<js_sys::Array>()
            .iter()
            .filter_map(|name| name.as_string())
            .collect())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let deleted = JsFuture::from(self.inner.delete(name))
            .await
            .map_err(js_err)?;
        Ok(deleted.is_truthy())
    }
}

#[async_trait(?Send)]
impl Cache for WebCache {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<Response>> {
        let request = websys_request_for_key(key)?;
        let matched = JsFuture::from(self.inner.match_with_request(&request))
            .await
            .map_err(js_err)?;
        if matched.is_undefined() {
            return Ok(None);
        }
        Ok(Some(
            response_from_websys(matched.unchecked_into::<web_sys::Response>()).await?,
        ))
    }

    async fn put(&self, request: Request, response: Response) -> Result<()> {
        let request = websys_request(&request)?;
        let response = websys_response(response)?;
        JsFuture::from(self.inner.put_with_request(&request, &response))
            .await
            .map_err(js_err)?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl Network for WebNetwork {
    async fn fetch(&self, request: Request) -> Result<Response> {
        let url = request.url().to_owned();
        let request = websys_request(&request)?;
        let fetched = JsFuture::from(self.scope.fetch_with_request(&request))
            .await
            .map_err(|e| Error::network(&url, format!("{e:?}")))?;
        response_from_websys(fetched.unchecked_into::<web_sys::Response>()).await
    }
}

// Service workers are single-threaded and this module state is only touched
// from the event loop, between awaits of the handlers below.
static mut WORKER: Option<ServiceWorker<WebCaches, WebNetwork>> = None;

#[allow(static_mut_refs)]
fn worker() -> Option<&'static ServiceWorker<WebCaches, WebNetwork>> {
    unsafe { WORKER.as_ref() }
}

#[allow(static_mut_refs)]
fn worker_mut() -> Option<&'static mut ServiceWorker<WebCaches, WebNetwork>> {
    unsafe { WORKER.as_mut() }
}

/// Build the cache controller over the browser storage and network and stash
/// it for the exported lifecycle handlers. Call once from the wasm entry point
/// of the service worker module, then wire the events up with
/// [`LIFECYCLE_GLUE_SNIPPET`](crate::LIFECYCLE_GLUE_SNIPPET).
#[allow(static_mut_refs)]
pub fn serve(config: CacheConfig, scope: ServiceWorkerGlobalScope) -> Result {
    set_panic_hook();
    init_tracing();
    let caches = WebCaches {
        inner: scope.caches().map_err(js_err)?,
    };
    let network = WebNetwork { scope };
    unsafe { WORKER = Some(ServiceWorker::new(config, caches, network)) }
    Ok(())
}

/// Prefetch the manifest. The returned promise goes into
/// `ExtendableEvent.waitUntil` so the runtime keeps the worker alive until the
/// whole batch settles.
#[wasm_bindgen]
pub async fn handle_install() -> std::result::Result<(), JsValue> {
    let Some(worker) = worker_mut() else {
        return Err(JsValue::from_str("serve() was not called"));
    };
    worker.install().await.map_err(to_js)
}

/// Evict caches from older versions; same `waitUntil` contract as install.
#[wasm_bindgen]
pub async fn handle_activate() -> std::result::Result<(), JsValue> {
    let Some(worker) = worker_mut() else {
        return Err(JsValue::from_str("serve() was not called"));
    };
    worker.activate().await.map_err(to_js)?;
    Ok(())
}

/// Decide synchronously whether to take the request over; excluded URLs never
/// get a `respondWith` and fall through to the browser's default handling.
#[wasm_bindgen]
pub fn handle_fetch(event: FetchEvent) {
    let Some(worker) = worker() else { return };
    if worker.is_excluded(&event.request().url()) {
        debug!("{} is excluded, passing through", event.request().url());
        return;
    }
    let promise = wasm_bindgen_futures::future_to_promise(respond(worker, event.clone()));
    if let Err(e) = event.respond_with(&promise) {
        error!("failed to take over fetch event: {e:?}");
    }
}

async fn respond(
    worker: &'static ServiceWorker<WebCaches, WebNetwork>,
    event: FetchEvent,
) -> std::result::Result<JsValue, JsValue> {
    let request = request_from_websys(event.request()).await.map_err(to_js)?;
    match worker.handle_fetch(request).await.map_err(to_js)? {
        FetchOutcome::Respond(response) => Ok(websys_response(response).map_err(to_js)?.into()),
        // the sync exclusion check already let these through
        FetchOutcome::Bypass => Err(JsValue::from_str("request is excluded from interception")),
    }
}

fn init_tracing() {
    #[cfg(feature = "traces")]
    {
        use tracing_subscriber::fmt::format::Pretty;
        use tracing_subscriber::fmt::time::UtcTime;
        use tracing_subscriber::prelude::*;
        use tracing_web::{performance_layer, MakeWebConsoleWriter};

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false) // Only partially supported across browsers
            .with_timer(UtcTime::rfc_3339())
            .with_writer(MakeWebConsoleWriter::new().with_pretty_level())
            .with_level(false);
        let perf_layer = performance_layer().with_details_from_fields(Pretty::default());

        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(perf_layer)
            .init();
    }
}
