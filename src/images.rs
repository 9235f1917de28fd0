//! Image search with a built-in fallback list, plus URL helpers for the
//! Unsplash image CDN.
//!
//! Search is best effort: without an access key, or when the request fails
//! for any reason, callers get a shuffled slice of a fixed local pool picked
//! by keywords in the query. It never returns an error.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::SearchError;

pub const API_BASE: &str = "https://api.unsplash.com";
pub const CDN_BASE: &str = "https://images.unsplash.com";
const KEY_PLACEHOLDER: &str = "YOUR_UNSPLASH_ACCESS_KEY";

const DEFAULT_URL_PARAMS: [(&str, &str); 4] =
    [("ixlib", "rb-4.0.3"), ("auto", "format"), ("fit", "crop"), ("q", "80")];

const HERO_POOL: &[&str] = &[
    "https://images.unsplash.com/photo-1518709268805-4e9042af2176?ixlib=rb-4.0.3&auto=format&fit=crop&w=1920&q=80",
    "https://images.unsplash.com/photo-1555066931-4365d14bab8c?ixlib=rb-4.0.3&auto=format&fit=crop&w=1920&q=80",
    "https://images.unsplash.com/photo-1504639725590-34d0984388bd?ixlib=rb-4.0.3&auto=format&fit=crop&w=1920&q=80",
    "https://images.unsplash.com/photo-1461749280684-dccba630e2f6?ixlib=rb-4.0.3&auto=format&fit=crop&w=1920&q=80",
    "https://images.unsplash.com/photo-1557804506-669a67965ba0?ixlib=rb-4.0.3&auto=format&fit=crop&w=1920&q=80",
];

const PROJECT_POOL: &[&str] = &[
    "https://images.unsplash.com/photo-1556742049-0cfed4f6a45d?ixlib=rb-4.0.3&auto=format&fit=crop&w=800&q=80",
    "https://images.unsplash.com/photo-1611224923853-80b023f02d71?ixlib=rb-4.0.3&auto=format&fit=crop&w=800&q=80",
    "https://images.unsplash.com/photo-1467232004584-a241de8bcf5d?ixlib=rb-4.0.3&auto=format&fit=crop&w=800&q=80",
    "https://images.unsplash.com/photo-1558494949-ef010cbdcc31?ixlib=rb-4.0.3&auto=format&fit=crop&w=800&q=80",
    "https://images.unsplash.com/photo-1460925895917-afdab827c52f?ixlib=rb-4.0.3&auto=format&fit=crop&w=800&q=80",
    "https://images.unsplash.com/photo-1571019613454-1cb2f99b2d8b?ixlib=rb-4.0.3&auto=format&fit=crop&w=800&q=80",
];

const PROFILE_POOL: &[&str] = &[
    "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?ixlib=rb-4.0.3&auto=format&fit=crop&w=500&q=80",
    "https://images.unsplash.com/photo-1472099645785-5658abf4ff4e?ixlib=rb-4.0.3&auto=format&fit=crop&w=500&q=80",
    "https://images.unsplash.com/photo-1438761681033-6461ffad8d80?ixlib=rb-4.0.3&auto=format&fit=crop&w=500&q=80",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
    Squarish,
}

impl Orientation {
    pub fn from_name(name: &str) -> Self {
        match name {
            "portrait" => Orientation::Portrait,
            "squarish" => Orientation::Squarish,
            _ => Orientation::Landscape,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
            Orientation::Squarish => "squarish",
        }
    }
}

/// Which rendition of a photo to link to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    Small,
    #[default]
    Regular,
    Full,
}

impl ImageSize {
    pub fn from_name(name: &str) -> Self {
        match name {
            "small" => ImageSize::Small,
            "full" => ImageSize::Full,
            _ => ImageSize::Regular,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub count: usize,
    pub orientation: Orientation,
    pub size: ImageSize,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: "technology".to_owned(),
            count: 5,
            orientation: Orientation::default(),
            size: ImageSize::default(),
        }
    }
}

impl SearchRequest {
    /// A one-photo request, as used by [`ImageSearch::search_one`].
    pub fn single(query: impl Into<String>, orientation: Orientation, size: ImageSize) -> Self {
        Self {
            query: query.into(),
            count: 1,
            orientation,
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    pub url: String,
    pub alt: String,
    pub author: String,
    pub author_url: String,
    pub download_url: Option<String>,
}

/// Local image pools, keyed by loose keyword matching on the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPool {
    Hero,
    Projects,
    Profile,
}

impl FallbackPool {
    pub fn for_query(query: &str) -> Self {
        if mentions(query, &["project", "work", "portfolio"]) {
            FallbackPool::Projects
        } else if mentions(query, &["profile", "person", "portrait"]) {
            FallbackPool::Profile
        } else {
            FallbackPool::Hero
        }
    }

    pub fn urls(self) -> &'static [&'static str] {
        match self {
            FallbackPool::Hero => HERO_POOL,
            FallbackPool::Projects => PROJECT_POOL,
            FallbackPool::Profile => PROFILE_POOL,
        }
    }
}

fn mentions(query: &str, words: &[&str]) -> bool {
    words.iter().any(|word| query.contains(word))
}

pub fn fallback_images<R: Rng + ?Sized>(
    query: &str,
    count: usize,
    rng: &mut R,
) -> Vec<ImageRecord> {
    let mut pool = FallbackPool::for_query(query).urls().to_vec();
    pool.shuffle(rng);
    pool.into_iter()
        .take(count)
        .enumerate()
        .map(|(index, url)| ImageRecord {
            id: format!("fallback-{index}"),
            url: url.to_owned(),
            alt: format!("{query} image {}", index + 1),
            author: "Unsplash".to_owned(),
            author_url: "https://unsplash.com".to_owned(),
            download_url: None,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct Photo {
    id: String,
    urls: PhotoUrls,
    alt_description: Option<String>,
    description: Option<String>,
    user: PhotoUser,
    links: PhotoLinks,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    small: String,
    regular: String,
    full: String,
}

#[derive(Debug, Deserialize)]
struct PhotoUser {
    name: String,
    links: UserLinks,
}

#[derive(Debug, Deserialize)]
struct UserLinks {
    html: String,
}

#[derive(Debug, Deserialize)]
struct PhotoLinks {
    download_location: Option<String>,
}

// `/photos/random` answers with a bare object when `count` is absent.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PhotoPayload {
    Many(Vec<Photo>),
    One(Box<Photo>),
}

impl Photo {
    fn into_record(self, size: ImageSize) -> ImageRecord {
        let url = match size {
            ImageSize::Small => self.urls.small,
            ImageSize::Regular => self.urls.regular,
            ImageSize::Full => self.urls.full,
        };
        let alt = self
            .alt_description
            .filter(|s| !s.is_empty())
            .or(self.description.filter(|s| !s.is_empty()))
            .unwrap_or_else(|| "Unsplash image".to_owned());
        ImageRecord {
            id: self.id,
            url,
            alt,
            author: self.user.name,
            author_url: self.user.links.html,
            download_url: self.links.download_location,
        }
    }
}

pub fn parse_photos(body: &str, size: ImageSize) -> Result<Vec<ImageRecord>, SearchError> {
    let photos = match serde_json::from_str::<PhotoPayload>(body)? {
        PhotoPayload::Many(photos) => photos,
        PhotoPayload::One(photo) => vec![*photo],
    };
    if photos.is_empty() {
        return Err(SearchError::Empty);
    }
    Ok(photos.into_iter().map(|p| p.into_record(size)).collect())
}

#[derive(Debug, Clone)]
pub struct ImageSearch {
    http: reqwest::Client,
    api_base: String,
    access_key: Option<String>,
}

impl ImageSearch {
    pub fn new(access_key: Option<String>) -> Self {
        let access_key = access_key
            .map(|key| key.trim().to_owned())
            .filter(|key| !key.is_empty() && key != KEY_PLACEHOLDER);
        Self {
            http: reqwest::Client::new(),
            api_base: API_BASE.to_owned(),
            access_key,
        }
    }

    /// Uses the key baked in at build time through `UNSPLASH_ACCESS_KEY`.
    pub fn from_build_env() -> Self {
        Self::new(option_env!("UNSPLASH_ACCESS_KEY").map(str::to_owned))
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn has_key(&self) -> bool {
        self.access_key.is_some()
    }

    pub async fn search(&self, request: &SearchRequest) -> Vec<ImageRecord> {
        match self.try_search(request).await {
            Ok(images) => images,
            Err(SearchError::MissingKey) => {
                warn!(query = %request.query, "no image search key, using fallback images");
                self.fallback(request)
            }
            Err(error) => {
                error!(
                    %error,
                    query = %request.query,
                    "image search failed, using fallback images"
                );
                self.fallback(request)
            }
        }
    }

    /// First result of a one-photo search. Only `None` if even the fallback
    /// pool came back empty.
    pub async fn search_one(&self, request: &SearchRequest) -> Option<ImageRecord> {
        let request = SearchRequest {
            count: 1,
            ..request.clone()
        };
        self.search(&request).await.into_iter().next()
    }

    pub fn fallback(&self, request: &SearchRequest) -> Vec<ImageRecord> {
        let mut rng = SmallRng::seed_from_u64(entropy_seed());
        fallback_images(&request.query, request.count, &mut rng)
    }

    pub fn request_url(&self, request: &SearchRequest) -> Result<Url, SearchError> {
        let key = self.access_key.as_deref().ok_or(SearchError::MissingKey)?;
        let count = request.count.to_string();
        Url::parse_with_params(
            &format!("{}/photos/random", self.api_base.trim_end_matches('/')),
            [
                ("query", request.query.as_str()),
                ("count", count.as_str()),
                ("orientation", request.orientation.as_str()),
                ("client_id", key),
            ],
        )
        .map_err(|error| SearchError::InvalidUrl(error.to_string()))
    }

    async fn try_search(&self, request: &SearchRequest) -> Result<Vec<ImageRecord>, SearchError> {
        let url = self.request_url(request)?;
        debug!(query = %request.query, count = request.count, "searching images");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        parse_photos(&body, request.size)
    }
}

#[cfg(target_arch = "wasm32")]
fn entropy_seed() -> u64 {
    (js_sys::Math::random() * u64::MAX as f64) as u64
}

#[cfg(not(target_arch = "wasm32"))]
fn entropy_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// CDN URL for a photo id, with the default rendition params merged with
/// `params` (later values win, first-seen order kept).
pub fn build_image_url(image_id: &str, params: &[(&str, &str)]) -> Option<String> {
    let mut merged: Vec<(&str, &str)> = DEFAULT_URL_PARAMS.to_vec();
    for &(key, value) in params {
        match merged.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => merged.push((key, value)),
        }
    }
    Url::parse_with_params(&format!("{CDN_BASE}/{image_id}"), merged)
        .ok()
        .map(String::from)
}

/// Rewrites CDN URLs to request exactly `width x height` device pixels.
/// Non-CDN URLs come back unchanged.
pub fn optimized_image_url(base: &str, width: u32, height: u32, device_pixel_ratio: f64) -> String {
    if !base.contains("images.unsplash.com") {
        return base.to_owned();
    }
    let Ok(mut url) = Url::parse(base) else {
        return base.to_owned();
    };
    let dpr = if device_pixel_ratio > 0.0 { device_pixel_ratio } else { 1.0 };
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !matches!(key.as_ref(), "w" | "h" | "dpr"))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("w", &(f64::from(width) * dpr).round().to_string())
        .append_pair("h", &(f64::from(height) * dpr).round().to_string())
        .append_pair("dpr", &dpr.to_string());
    url.into()
}
