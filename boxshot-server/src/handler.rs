//! The `/generate` request handler
//!
//! A request walks through the stages of [`Stage`] in order. Any failure
//! jumps to [`Stage::Failed`] and produces the fixed `500 ERROR` reply;
//! a partial frame is never sent.

use crate::config::ServerConfig;
use crate::fetch::{log_url, FetchGate, HttpImageSource};
use boxshot_core::{ppm, Error, FetchedImage, RenderRequest, RendererFactory, Resolution, Result, Scene};
use boxshot_gpu::WgpuRendererFactory;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::Semaphore;

/// States of one `/generate` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ParsingParams,
    FetchingImage,
    BuildingScene,
    Rendering,
    ReadingFrame,
    Encoding,
    Responding,
    Failed,
}

/// Ordered record of the stages a request went through
#[derive(Debug, Clone, Default)]
pub struct StageTrace {
    stages: Arc<Mutex<Vec<Stage>>>,
}

impl StageTrace {
    pub fn enter(&self, stage: Stage) {
        log::debug!("stage -> {:?}", stage);
        if let Ok(mut stages) = self.stages.lock() {
            stages.push(stage);
        }
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.stages.lock().map(|stages| stages.clone()).unwrap_or_default()
    }
}

/// Status and body of an HTTP answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// The single failure answer, whatever went wrong
    pub fn failure() -> Self {
        Self {
            status: 500,
            body: "ERROR".to_string(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            body: "Not Found".to_string(),
        }
    }
}

/// Runs the fetch, render and encode pipeline for `/generate`
pub struct GenerateHandler {
    gate: FetchGate,
    factory: Arc<dyn RendererFactory>,
    render_height: u32,
    permits: Arc<Semaphore>,
}

impl GenerateHandler {
    pub fn new(gate: FetchGate, factory: Arc<dyn RendererFactory>, render_height: u32, max_concurrent_renders: usize) -> Self {
        Self {
            gate,
            factory,
            render_height,
            permits: Arc::new(Semaphore::new(max_concurrent_renders.max(1))),
        }
    }

    /// Handler backed by http(s) fetching and the wgpu renderer
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let source = HttpImageSource::new(config.max_image_bytes)?;
        let gate = FetchGate::new(Arc::new(source), config.fetch_timeout());
        Ok(Self::new(
            gate,
            Arc::new(WgpuRendererFactory::default()),
            config.render_height,
            config.max_concurrent_renders,
        ))
    }

    /// Answer a raw `/generate` query string
    pub async fn handle(&self, query: &str) -> Reply {
        self.handle_traced(query).await.0
    }

    /// Like [`GenerateHandler::handle`], also returning the visited stages
    pub async fn handle_traced(&self, query: &str) -> (Reply, Vec<Stage>) {
        let trace = StageTrace::default();
        let reply = match self.generate_query(query, &trace).await {
            Ok(body) => {
                trace.enter(Stage::Responding);
                Reply::ok(body)
            }
            Err(err) => {
                trace.enter(Stage::Failed);
                log::error!("generate failed ({}): {}", err.kind(), err);
                Reply::failure()
            }
        };
        (reply, trace.stages())
    }

    async fn generate_query(&self, query: &str, trace: &StageTrace) -> Result<String> {
        trace.enter(Stage::ParsingParams);
        let request = RenderRequest::from_query(url::form_urlencoded::parse(query.as_bytes()))?;
        self.generate(request, trace).await
    }

    /// Fetch, render and encode one validated request as P3 text
    pub async fn generate(&self, request: RenderRequest, trace: &StageTrace) -> Result<String> {
        let started = Instant::now();
        let resolution = request.resolution(self.render_height)?;
        log::info!(
            "generate img={} w={} h={} camera=({}, {}, {}) target={}x{}",
            log_url(&request.image_url),
            request.width,
            request.height,
            request.camera.x,
            request.camera.y,
            request.camera.z,
            resolution.width,
            resolution.height
        );

        trace.enter(Stage::FetchingImage);
        let image = self.gate.fetch(&request.image_url).await?;

        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Render("render permits closed".to_string()))?;
        let factory = self.factory.clone();
        let render_trace = trace.clone();
        let body = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            render_p3(factory.as_ref(), image, &request, resolution, &render_trace)
        })
        .await
        .map_err(|e| Error::Render(format!("render task failed: {}", e)))??;

        log::info!(
            "rendered {}x{} frame ({} bytes) in {:?}",
            resolution.width,
            resolution.height,
            body.len(),
            started.elapsed()
        );
        Ok(body)
    }
}

/// The synchronous part of the pipeline, run on the blocking pool
fn render_p3(
    factory: &dyn RendererFactory,
    image: FetchedImage,
    request: &RenderRequest,
    resolution: Resolution,
    trace: &StageTrace,
) -> Result<String> {
    trace.enter(Stage::BuildingScene);
    let scene = Scene::build(image, request.width, request.height, request.camera);

    trace.enter(Stage::Rendering);
    let mut surface = factory.create(resolution)?;
    surface.render(&scene)?;

    trace.enter(Stage::ReadingFrame);
    let frame = surface.read_frame()?;

    trace.enter(Stage::Encoding);
    Ok(ppm::encode_p3(&frame))
}
