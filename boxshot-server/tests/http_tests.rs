//! HTTP transport tests on an ephemeral local port

use boxshot_core::{Error, OffscreenSurface, RendererFactory, Resolution, Result};
use boxshot_server::{http, FetchFuture, FetchGate, GenerateHandler, ImageSource, Service};
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;

struct UnreachableSource;

impl ImageSource for UnreachableSource {
    fn fetch(&self, url: &str) -> FetchFuture {
        let message = format!("connection refused: {}", url);
        async move { Err(Error::Fetch(message)) }.boxed()
    }
}

struct NoContextFactory;

impl RendererFactory for NoContextFactory {
    fn create(&self, _resolution: Resolution) -> Result<Box<dyn OffscreenSurface>> {
        Err(Error::ContextCreation("no adapter".into()))
    }
}

/// Start a server on a free port and return its base url
fn start_test_server(source: Arc<dyn ImageSource>) -> String {
    let server = http::bind("127.0.0.1:0").unwrap();
    let addr = http::local_addr(&server).unwrap();

    let gate = FetchGate::new(source, Duration::from_secs(10));
    let handler = GenerateHandler::new(gate, Arc::new(NoContextFactory), 10, 1);
    let service = Arc::new(Service::new(Arc::new(handler)));

    let runtime = tokio::runtime::Handle::current();
    std::thread::spawn(move || http::serve(Arc::new(server), service, runtime));

    format!("http://{}", addr)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_health_check() {
    let base = start_test_server(Arc::new(UnreachableSource));

    let response = reqwest::get(format!("{}/test", base)).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"));
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_path_is_not_found() {
    let base = start_test_server(Arc::new(UnreachableSource));

    let response = reqwest::get(format!("{}/render", base)).await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(response.text().await.unwrap(), "Not Found");

    let response = reqwest::Client::new()
        .post(format!("{}/generate", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_fetch_answers_error() {
    let base = start_test_server(Arc::new(UnreachableSource));

    let response = reqwest::get(format!(
        "{}/generate?img=http://unreachable.invalid/a.png&w=1&h=1&x=0&y=0&z=5",
        base
    ))
    .await
    .unwrap();

    assert_eq!(response.status().as_u16(), 500);
    assert_eq!(response.text().await.unwrap(), "ERROR");
}

struct RedSource;

impl ImageSource for RedSource {
    fn fetch(&self, _url: &str) -> FetchFuture {
        async { boxshot_core::FetchedImage::solid(2, 2, [255, 0, 0, 255]) }.boxed()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_context_failure_answers_error_and_server_survives() {
    let base = start_test_server(Arc::new(RedSource));
    let url = format!("{}/generate?img=http://example.com/a.png&w=1&h=1&x=0&y=0&z=5", base);

    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status().as_u16(), 500);
    assert_eq!(response.text().await.unwrap(), "ERROR");

    let response = reqwest::get(format!("{}/test", base)).await.unwrap();
    assert_eq!(response.text().await.unwrap(), "OK");
}
