//! HTTP transport on top of `tiny_http`

use crate::handler::{GenerateHandler, Reply};
use boxshot_core::{Error, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tiny_http::{Method, Request, Response, Server};

/// Endpoints served by boxshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Health,
    Generate,
    NotFound,
}

impl Route {
    /// Match a request line, returning the route and the raw query string
    pub fn resolve<'a>(method: &Method, url: &'a str) -> (Route, &'a str) {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let path = match path.strip_suffix('/') {
            Some(stripped) if !stripped.is_empty() => stripped,
            _ => path,
        };

        let route = match (method, path) {
            (Method::Get, "/test") => Route::Health,
            (Method::Get, "/generate") => Route::Generate,
            _ => Route::NotFound,
        };
        (route, query)
    }
}

/// Maps requests to replies
pub struct Service {
    handler: Arc<GenerateHandler>,
}

impl Service {
    pub fn new(handler: Arc<GenerateHandler>) -> Self {
        Self { handler }
    }

    pub async fn dispatch(&self, method: &Method, url: &str) -> Reply {
        match Route::resolve(method, url) {
            (Route::Health, _) => Reply::ok("OK"),
            (Route::Generate, query) => self.handler.handle(query).await,
            (Route::NotFound, _) => {
                log::debug!("no route for {} {}", method, url);
                Reply::not_found()
            }
        }
    }
}

/// Bind the listener; `port` 0 picks a free port
pub fn bind(addr: &str) -> Result<Server> {
    Server::http(addr).map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, e)))
}

/// Address the server actually listens on
pub fn local_addr(server: &Server) -> Option<SocketAddr> {
    server.server_addr().to_ip()
}

/// Accept requests until the listener closes.
///
/// Each request becomes a task on `runtime`; its reply is written from the
/// blocking pool. `Request::respond` consumes the request, so every request
/// is answered at most once.
pub fn serve(server: Arc<Server>, service: Arc<Service>, runtime: tokio::runtime::Handle) {
    for request in server.incoming_requests() {
        let service = service.clone();
        runtime.spawn(async move {
            let method = request.method().clone();
            let url = request.url().to_string();
            let reply = service.dispatch(&method, &url).await;
            log::debug!("{} {} -> {}", method, url, reply.status);

            if let Err(e) = tokio::task::spawn_blocking(move || respond(request, reply)).await {
                log::error!("response task failed: {}", e);
            }
        });
    }
}

fn respond(request: Request, reply: Reply) {
    // from_string already sets `Content-Type: text/plain; charset=UTF-8`
    let response = Response::from_string(reply.body).with_status_code(reply.status);
    if let Err(e) = request.respond(response) {
        log::warn!("failed to write response: {}", e);
    }
}
