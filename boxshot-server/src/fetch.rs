//! Image Fetch Gate
//!
//! [`FetchGate::fetch`] races an image download against a timer and
//! reports exactly one outcome. Whichever side finishes first claims a
//! shared latch; the loser's result is dropped. A download that loses the
//! race keeps running in its own task and its result is discarded.

use base64::Engine;
use boxshot_core::{Error, FetchedImage, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Future returned by an [`ImageSource`]
pub type FetchFuture = BoxFuture<'static, Result<FetchedImage>>;

/// Anything that can turn a url into decoded RGBA pixels
pub trait ImageSource: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> FetchFuture;
}

/// Fetches over http(s) and from base64 `data:` urls
#[derive(Debug, Clone)]
pub struct HttpImageSource {
    client: reqwest::Client,
    max_bytes: u64,
}

impl HttpImageSource {
    pub fn new(max_bytes: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("boxshot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Fetch(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, max_bytes })
    }

    async fn load(client: reqwest::Client, max_bytes: u64, raw_url: String) -> Result<FetchedImage> {
        let url = url::Url::parse(&raw_url).map_err(|e| Error::Fetch(format!("invalid url {:?}: {}", raw_url, e)))?;

        let bytes = match url.scheme() {
            "http" | "https" => download(&client, url, max_bytes).await?,
            "data" => decode_data_url(&url, max_bytes)?,
            other => return Err(Error::Fetch(format!("unsupported url scheme `{}`", other))),
        };

        tokio::task::spawn_blocking(move || decode_image(&bytes))
            .await
            .map_err(|e| Error::Fetch(format!("image decode task failed: {}", e)))?
    }
}

impl ImageSource for HttpImageSource {
    fn fetch(&self, url: &str) -> FetchFuture {
        Self::load(self.client.clone(), self.max_bytes, url.to_string()).boxed()
    }
}

async fn download(client: &reqwest::Client, url: url::Url, max_bytes: u64) -> Result<Vec<u8>> {
    let mut response = client
        .get(url.clone())
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| Error::Fetch(format!("GET {} failed: {}", url, e)))?;

    if let Some(length) = response.content_length() {
        if length > max_bytes {
            return Err(too_large(max_bytes));
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| Error::Fetch(format!("reading {} failed: {}", url, e)))?
    {
        if (body.len() + chunk.len()) as u64 > max_bytes {
            return Err(too_large(max_bytes));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Payload of a `data:<mime>;base64,<payload>` url
fn decode_data_url(url: &url::Url, max_bytes: u64) -> Result<Vec<u8>> {
    let (meta, payload) = url
        .path()
        .split_once(',')
        .ok_or_else(|| Error::Fetch("data url without a payload".to_string()))?;
    if !meta.ends_with(";base64") {
        return Err(Error::Fetch("only base64 data urls are supported".to_string()));
    }

    // Query decoding turns an unescaped '+' into a space
    let payload: String = payload
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('+'),
            c if c.is_ascii_whitespace() => None,
            c => Some(c),
        })
        .collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| Error::Fetch(format!("invalid base64 payload: {}", e)))?;
    if bytes.len() as u64 > max_bytes {
        return Err(too_large(max_bytes));
    }
    Ok(bytes)
}

fn too_large(max_bytes: u64) -> Error {
    Error::Fetch(format!("image exceeds the {} byte limit", max_bytes))
}

/// Longest url echoed into log lines
const MAX_LOGGED_URL: usize = 96;

/// Short form of an image url for logging.
///
/// `data:` urls keep only their media type and payload size; other urls
/// are cut after [`MAX_LOGGED_URL`] characters.
pub fn log_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("data:") {
        let (meta, payload) = rest.split_once(',').unwrap_or((rest, ""));
        return format!("data:{},<{} bytes>", meta, payload.len());
    }
    match url.char_indices().nth(MAX_LOGGED_URL) {
        Some((cut, _)) => format!("{}...", &url[..cut]),
        None => url.to_string(),
    }
}

/// Decode an encoded image into top-down RGBA8 pixels
pub fn decode_image(bytes: &[u8]) -> Result<FetchedImage> {
    let decoded = image::load_from_memory(bytes).map_err(|e| Error::Fetch(format!("cannot decode image: {}", e)))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    FetchedImage::new(width, height, rgba.into_raw())
}

/// Single-use flag; only the first claim succeeds
#[derive(Debug, Default)]
struct Latch(AtomicBool);

impl Latch {
    fn claim(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Time-bounded access to an [`ImageSource`]
#[derive(Clone)]
pub struct FetchGate {
    source: Arc<dyn ImageSource>,
    timeout: Duration,
}

impl FetchGate {
    pub fn new(source: Arc<dyn ImageSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch `url`, failing with [`Error::Timeout`] once the timeout elapses.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        let latch = Arc::new(Latch::default());
        let (sender, mut receiver) = oneshot::channel();

        let download = self.source.fetch(url);
        let task_latch = latch.clone();
        let task_url = log_url(url);
        tokio::spawn(async move {
            let result = download.await;
            if task_latch.claim() {
                let _ = sender.send(result);
            } else {
                match result {
                    Ok(image) => log::debug!(
                        "discarding late {}x{} image from {}",
                        image.width(),
                        image.height(),
                        task_url
                    ),
                    Err(err) => log::debug!("discarding late fetch error from {}: {}", task_url, err),
                }
            }
        });

        tokio::select! {
            biased;
            received = &mut receiver => settle(received),
            _ = tokio::time::sleep(self.timeout) => {
                if latch.claim() {
                    Err(Error::Timeout(self.timeout.as_millis() as u64))
                } else {
                    // The download claimed the latch first; its result is on the way
                    settle(receiver.await)
                }
            }
        }
    }
}

fn settle(received: std::result::Result<Result<FetchedImage>, oneshot::error::RecvError>) -> Result<FetchedImage> {
    received.map_err(|_| Error::Fetch("fetch task ended without a result".to_string()))?
}
