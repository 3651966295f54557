use flowmap_core::{LoadError, ViewerConfig};
use js_sys::Array;
use tracing::warn;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Blob, Document, Element, HtmlElement, Url, Window};

/// Build an absolute URL for an asset, taking into account the optional
/// `window.__BASE_URL` which is set by the host page.
pub fn asset_url(path: &str) -> String {
    let p = path.trim();
    if p.starts_with("http://") || p.starts_with("https://") || p.starts_with("data:") {
        return p.to_string();
    }
    let base = window_string("__BASE_URL").unwrap_or_else(|| "/".to_string());
    let base = if base.ends_with('/') {
        base
    } else {
        format!("{}/", base)
    };
    let p = p.trim_start_matches('/');
    format!("{}{}", base, p)
}

fn window_string(key: &str) -> Option<String> {
    let w = web_sys::window()?;
    js_sys::Reflect::get(&w, &JsValue::from_str(key))
        .ok()?
        .as_string()
}

/// Viewer settings from `window.__FLOWMAP_CONFIG` (a plain object) with
/// `window.__SCRIPT_ROOT` taking precedence for the endpoint prefix. Bad
/// overrides are logged and ignored.
pub fn read_viewer_config(window: &Window) -> ViewerConfig {
    let mut config = js_sys::Reflect::get(window, &JsValue::from_str("__FLOWMAP_CONFIG"))
        .ok()
        .filter(|v| v.is_object())
        .and_then(|v| js_sys::JSON::stringify(&v).ok())
        .and_then(|s| s.as_string())
        .map(|text| match ViewerConfig::from_json(&text) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(error = %e, "ignoring window.__FLOWMAP_CONFIG");
                ViewerConfig::default()
            }
        })
        .unwrap_or_default();
    if let Some(root) = window_string("__SCRIPT_ROOT") {
        config.script_root = root;
    }
    config
}

/// GET a text resource. Network failures and non-2xx answers are transport
/// errors; the body itself is not inspected here.
pub async fn fetch_text(window: &Window, url: &str) -> Result<String, LoadError> {
    let js_err = |e: JsValue| LoadError::Transport(e.as_string().unwrap_or_else(|| format!("{e:?}")));
    let resp_value = wasm_bindgen_futures::JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(js_err)?;
    let resp: web_sys::Response = resp_value.dyn_into().map_err(js_err)?;
    if !resp.ok() {
        return Err(LoadError::Transport(format!(
            "HTTP {} {}",
            resp.status(),
            resp.status_text()
        )));
    }
    let text_js = wasm_bindgen_futures::JsFuture::from(resp.text().map_err(js_err)?)
        .await
        .map_err(js_err)?;
    text_js
        .as_string()
        .ok_or_else(|| LoadError::Transport("response body is not text".into()))
}

pub fn save_text_as_file(document: &Document, filename: &str, text: &str) -> Result<(), JsValue> {
    let array = Array::new();
    array.push(&JsValue::from_str(text));
    let blob = Blob::new_with_str_sequence(&array)?;
    let url = Url::create_object_url_with_blob(&blob)?;
    let a = document.create_element("a")?.dyn_into::<HtmlElement>()?;
    a.set_attribute("href", &url)?;
    a.set_attribute("download", filename)?;
    a.click();
    Url::revoke_object_url(&url)?;
    Ok(())
}

pub fn now_ms(window: &Window) -> f64 {
    window
        .performance()
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

pub fn html_element(document: &Document, id: &str) -> Option<HtmlElement> {
    document.get_element_by_id(id)?.dyn_into().ok()
}

pub fn set_style(el: &HtmlElement, prop: &str, value: &str) {
    if let Err(e) = el.style().set_property(prop, value) {
        warn!(?e, prop, "could not set style");
    }
}

/// Replace the text of every element carrying `class`.
pub fn set_text_by_class(document: &Document, class: &str, text: &str) {
    let els = document.get_elements_by_class_name(class);
    for i in 0..els.length() {
        if let Some(el) = els.item(i) {
            el.set_text_content(Some(text));
        }
    }
}

/// Nearest ancestor (or self) of an event target matching `selector`.
pub fn closest(target: Option<web_sys::EventTarget>, selector: &str) -> Option<Element> {
    let el: Element = target?.dyn_into().ok()?;
    el.closest(selector).ok()?
}

/// True when the pointer moved between children of `el` rather than in or
/// out of it.
pub fn moved_within(el: &Element, related: Option<web_sys::EventTarget>) -> bool {
    related
        .and_then(|t| t.dyn_into::<web_sys::Node>().ok())
        .is_some_and(|n| el.contains(Some(&n)))
}

/// Edge index from a `data-edge` attribute.
pub fn edge_index(el: &Element) -> Option<usize> {
    el.get_attribute("data-edge")?.parse().ok()
}
