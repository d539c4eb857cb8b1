//! Versioned offline cache lifecycle for service workers: prefetch a manifest
//! on install, evict stale versioned caches on activate and serve cache-first
//! responses on fetch. Core logic is platform-neutral; the wasm32 target adds
//! the browser shim.
#![allow(dead_code, unused_imports)]

mod config;
mod result;
mod storage;
mod vals;
mod worker;

pub use config::*;
pub use result::*;
pub use storage::*;
pub use vals::*;
pub use worker::*;

#[cfg(target_arch = "wasm32")]
mod web;
#[cfg(target_arch = "wasm32")]
pub use web::*;

pub use anyhow::{anyhow, bail};
pub use async_trait::async_trait;
pub use bytes::Bytes;
pub use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
pub use tracing::{debug, error, info, trace, warn};

/// Javascript glue that forwards service worker lifecycle events into the
/// exported wasm handlers. Inline it into the `sw.js` module that loads the
/// wasm bundle.
pub const LIFECYCLE_GLUE_SNIPPET: &str = r#"
self.addEventListener('install', event => event.waitUntil(handle_install()));
self.addEventListener('activate', event => event.waitUntil(handle_activate()));
self.addEventListener('fetch', event => handle_fetch(event));
"#;
