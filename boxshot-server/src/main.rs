use anyhow::{Context, Result};
use boxshot_core::{Point3, RenderRequest};
use boxshot_server::{http, Cli, Command, GenerateHandler, LoggingConfig, RenderArgs, ServerConfig, Service, StageTrace};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve().context("invalid configuration")?;

    boxshot_server::init_logging(LoggingConfig {
        env_filter: config.log_filter.clone(),
        ..Default::default()
    });
    boxshot_server::install_panic_hook();

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(threads) = config.worker_threads {
        builder.worker_threads(threads);
    }
    let runtime = builder.build().context("failed to start the async runtime")?;

    match cli.command() {
        Command::Serve => run_server(&runtime, &config),
        Command::Render(args) => runtime.block_on(run_render(&config, args)),
    }
}

fn run_server(runtime: &tokio::runtime::Runtime, config: &ServerConfig) -> Result<()> {
    let handler = GenerateHandler::from_config(config).context("failed to set up the request handler")?;
    let server = http::bind(&config.listen_addr()).with_context(|| format!("failed to bind {}", config.listen_addr()))?;

    match http::local_addr(&server) {
        Some(addr) => log::info!("boxshot live on port {}", addr.port()),
        None => log::info!("boxshot live on {}", config.listen_addr()),
    }

    let service = Arc::new(Service::new(Arc::new(handler)));
    http::serve(Arc::new(server), service, runtime.handle().clone());
    Ok(())
}

async fn run_render(config: &ServerConfig, args: RenderArgs) -> Result<()> {
    let handler = GenerateHandler::from_config(config).context("failed to set up the request handler")?;
    let request = RenderRequest::new(args.img, args.w, args.h, Point3::new(args.x, args.y, args.z))?;

    let body = handler.generate(request, &StageTrace::default()).await?;

    match args.output {
        Some(path) => std::fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            out.write_all(body.as_bytes())?;
            out.flush()?;
        }
    }
    Ok(())
}
