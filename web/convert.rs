use crate::*;

use http::header::HeaderName;
use js_sys::{Array, Reflect, Set, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::RequestMode;

use super::js_err;

/// Collect a `web_sys::Headers` into an [`HeaderMap`]. Iteration goes through
/// the entries iterator via `Set`, same trick as for any js iterable.
fn headers_from_websys(headers: &web_sys::Headers) -> HeaderMap {
    let mut map = HeaderMap::new();
    let entries = Set::new(headers).entries();
    while let Ok(item) = entries.next() {
        if Reflect::get(&item, &JsValue::from("done"))
            .unwrap()
            .is_truthy()
        {
            break;
        }
        let pair = Reflect::get(&item, &JsValue::from("value"))
            .unwrap()
            .unchecked_into::<Array>()
            .at(0)
            .unchecked_into::<Array>();
        let (Some(name), Some(value)) = (pair.at(0).as_string(), pair.at(1).as_string()) else {
            continue;
        };
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) else {
            continue;
        };
        map.insert(name, value);
    }
    map
}

fn websys_headers(map: &HeaderMap) -> Result<web_sys::Headers> {
    let headers = web_sys::Headers::new().map_err(js_err)?;
    for (name, value) in map {
        let Ok(value) = std::str::from_utf8(value.as_bytes()) else {
            continue;
        };
        headers.append(name.as_str(), value).map_err(js_err)?;
    }
    Ok(headers)
}

/// Convert an intercepted `web_sys::Request` into the crate's request value,
/// buffering the body stream.
pub async fn request_from_websys(fetch_request: web_sys::Request) -> Result<Request> {
    let method = Method::from_bytes(fetch_request.method().as_bytes())?;
    let mut request = Request::get(fetch_request.url())
        .with_headers(headers_from_websys(&fetch_request.headers()));
    if method != Method::GET {
        request = request.with_method(method);
    }

    let Some(stream) = fetch_request.body() else {
        return Ok(request);
    };
    let stream = stream
        .get_reader()
        .unchecked_into::<web_sys::ReadableStreamDefaultReader>();
    let mut buf = vec![];
    // collect the js body stream into a buffer
    while let Ok(item) = JsFuture::from(stream.read()).await {
        let done = Reflect::get(&item, &JsValue::from("done"))
            .unwrap()
            .is_truthy();
        if done {
            break;
        }
        let mut data = Reflect::get(&item, &JsValue::from("value"))
            .unwrap()
            .unchecked_into::<Uint8Array>()
            .to_vec();
        buf.append(&mut data);
    }
    Ok(request.with_body(buf))
}

fn request_mode(mode: FetchMode) -> RequestMode {
    match mode {
        FetchMode::Cors => RequestMode::Cors,
        FetchMode::NoCors => RequestMode::NoCors,
    }
}

/// Build a `web_sys::Request` for a network fetch or a cache write.
pub fn websys_request(request: &Request) -> Result<web_sys::Request> {
    let mut init = web_sys::RequestInit::new();
    init.set_method(request.method().as_str());
    init.set_mode(request_mode(request.mode()));
    init.set_headers(&websys_headers(request.headers())?);
    if !request.body().is_empty() {
        init.set_body(&Uint8Array::from(request.body().as_ref()).into());
    }
    web_sys::Request::new_with_str_and_init(request.url(), &init).map_err(js_err)
}

/// Cache lookups only need the request identity, not a body.
pub fn websys_request_for_key(key: &CacheKey) -> Result<web_sys::Request> {
    let mut init = web_sys::RequestInit::new();
    init.set_method(key.method.as_str());
    web_sys::Request::new_with_str_and_init(&key.url, &init).map_err(js_err)
}

/// Snapshot a browser response. Opaque responses keep only the original
/// handle; anything else gets status, headers and a buffered body.
pub async fn response_from_websys(response: web_sys::Response) -> Result<Response> {
    if response.type_() == web_sys::ResponseType::Opaque {
        return Ok(Response::opaque().with_raw(response));
    }
    let status =
        StatusCode::from_u16(response.status()).map_err(|e| e!("bad response status: {e}"))?;
    let headers = headers_from_websys(&response.headers());
    let buf = JsFuture::from(response.array_buffer().map_err(js_err)?)
        .await
        .map_err(js_err)?;
    let body = Uint8Array::new(&buf).to_vec();
    Ok(Response::new(status).with_headers(headers).with_body(body))
}

/// Rebuild a `web_sys::Response`, reusing the original browser handle when
/// one rides along (the only way to replay an opaque response).
pub fn websys_response(response: Response) -> Result<web_sys::Response> {
    if let Some(raw) = response.raw_handle() {
        return Ok(raw);
    }
    let mut parts = web_sys::ResponseInit::new();
    parts.set_status(response.status().as_u16());
    parts.set_headers(&websys_headers(response.headers())?);
    let mut body = response.body().to_vec();
    let body = (!body.is_empty()).then_some(body.as_mut_slice());
    web_sys::Response::new_with_opt_u8_array_and_init(body, &parts).map_err(js_err)
}
