use js_sys::{Array, Function, Object, Promise};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlImageElement;

use crate::images::{
    build_image_url, optimized_image_url, ImageSearch, ImageSize, Orientation, SearchRequest,
};

fn to_js<T: Serialize>(value: &T) -> Option<JsValue> {
    serde_json::to_string(value)
        .ok()
        .and_then(|json| js_sys::JSON::parse(&json).ok())
}

fn request(
    query: Option<String>,
    count: Option<u32>,
    orientation: Option<String>,
    size: Option<String>,
) -> SearchRequest {
    let defaults = SearchRequest::default();
    SearchRequest {
        query: query.unwrap_or(defaults.query),
        count: count.map_or(defaults.count, |count| count as usize),
        orientation: orientation
            .as_deref()
            .map_or(defaults.orientation, Orientation::from_name),
        size: size.as_deref().map_or(defaults.size, ImageSize::from_name),
    }
}

/// Resolves to an array of `{ id, url, alt, author, authorUrl, downloadUrl }`.
/// Never rejects: failures resolve to the fallback images.
#[wasm_bindgen(js_name = searchImages)]
pub async fn search_images(
    query: Option<String>,
    count: Option<u32>,
    orientation: Option<String>,
    size: Option<String>,
) -> JsValue {
    let images = ImageSearch::from_build_env()
        .search(&request(query, count, orientation, size))
        .await;
    to_js(&images).unwrap_or_else(|| Array::new().into())
}

/// Resolves to one image record, or `undefined`.
#[wasm_bindgen(js_name = fetchSingleImage)]
pub async fn fetch_single_image(
    query: Option<String>,
    orientation: Option<String>,
    size: Option<String>,
) -> JsValue {
    let request = request(query, Some(1), orientation, size);
    ImageSearch::from_build_env()
        .search_one(&request)
        .await
        .and_then(|image| to_js(&image))
        .unwrap_or(JsValue::UNDEFINED)
}

/// CDN URL for a photo id. `params` is a plain object whose entries override
/// the default rendition params in insertion order.
#[wasm_bindgen(js_name = buildImageUrl)]
pub fn build_image_url_for_page(image_id: &str, params: Option<Object>) -> Option<String> {
    let entries: Vec<(String, String)> = params
        .map(|params| Object::entries(&params))
        .into_iter()
        .flat_map(|entries| entries.to_vec())
        .filter_map(|entry| {
            let pair = Array::from(&entry);
            let key = pair.get(0).as_string()?;
            let value = pair.get(1);
            let value = value
                .as_string()
                .or_else(|| value.as_f64().map(|n| n.to_string()))?;
            Some((key, value))
        })
        .collect();
    let borrowed: Vec<(&str, &str)> = entries
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    build_image_url(image_id, &borrowed)
}

/// Rewrites CDN image URLs for the current device pixel ratio.
#[wasm_bindgen(js_name = optimizedImageUrl)]
pub fn optimized_image_url_for_window(base: &str, width: u32, height: u32) -> String {
    let dpr = web_sys::window().map_or(1.0, |w| w.device_pixel_ratio());
    optimized_image_url(base, width, height, dpr)
}

fn preload(url: String) -> Result<Promise, JsValue> {
    let image = HtmlImageElement::new()?;
    let promise = Promise::new(&mut |resolve: Function, reject: Function| {
        let error = js_sys::Error::new(&format!("Failed to load image: {url}"));
        image.set_onload(Some(&resolve.bind1(&JsValue::NULL, &JsValue::from_str(&url))));
        image.set_onerror(Some(&reject.bind1(&JsValue::NULL, &error)));
    });
    image.set_src(&url);
    Ok(promise)
}

/// Resolves to `urls` once every image has loaded; rejects on the first
/// failure.
#[wasm_bindgen(js_name = preloadImages)]
pub async fn preload_images(urls: Vec<String>) -> Result<JsValue, JsValue> {
    let pending = Array::new();
    for url in urls {
        pending.push(&preload(url)?);
    }
    JsFuture::from(Promise::all(&pending)).await
}
