//! HTTP layer for the test responder.
//!
//! Binds a TCP listener, serves every connection with hyper's HTTP/1 server
//! and hands each request to [`handler::handle`]. Paths are not routed: every
//! path gets the same response shape.

use bytes::Bytes;
use chrono::Local;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderName, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioIo, TokioTimer};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::access_log::{self, AccessRecord};
use crate::config::{ServerConfig, Variant};
use crate::error::{Result, ServerError};
use crate::handler::{self, Exchange, Reply};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Pause after a failed accept so a persistent error (e.g. fd exhaustion)
/// does not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

fn full<T: Into<Bytes>>(chunk: T) -> BoxBody {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Bind a listener on `addr`.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::from_bind(addr, e))
}

/// Bind `addr` and serve until `shutdown` flips to true.
pub async fn run_server(
    addr: SocketAddr,
    config: &ServerConfig,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let listener = bind(addr).await?;
    serve(listener, config.clone(), shutdown).await;
    Ok(())
}

/// Accept loop for one listener. Returns (dropping the listener) once
/// `shutdown` is set or its sender goes away.
pub async fn serve(listener: TcpListener, config: ServerConfig, mut shutdown: watch::Receiver<bool>) {
    let local_addr = listener.local_addr().ok();
    match local_addr {
        Some(addr) => tracing::info!(
            "test server ({} variant) listening on http://{}",
            config.variant.as_str(),
            addr
        ),
        None => tracing::info!("test server ({} variant) listening", config.variant.as_str()),
    }

    if *shutdown.borrow() {
        return;
    }

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(serve_connection(stream, peer, config.variant, config.header_timeout));
                }
                Err(e) => {
                    tracing::warn!("accept error: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    if let Some(addr) = local_addr {
        tracing::info!("stopped listening on {}", addr);
    }
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, variant: Variant, header_timeout: Duration) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req| handle_request(req, peer, variant));

    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .header_read_timeout(header_timeout)
        .title_case_headers(true);

    if let Err(err) = builder.serve_connection(io, service).await {
        tracing::debug!("error serving connection from {}: {:?}", peer, err);
    }
}

/// Adapt a hyper request into an [`Exchange`], log it and answer it.
async fn handle_request(
    req: Request<Incoming>,
    peer: SocketAddr,
    variant: Variant,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let received_at = Local::now();
    let (parts, body) = req.into_parts();
    let body = body.collect().await?.to_bytes();
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let exchange = Exchange {
        method: &parts.method,
        path,
        headers: &parts.headers,
        body: &body,
        peer,
        variant,
        received_at,
    };

    if handler::is_logged(exchange.method) {
        access_log::emit(AccessRecord::from_exchange(&exchange));
    }

    Ok(into_response(handler::handle(&exchange)))
}

fn into_response(reply: Reply) -> Response<BoxBody> {
    let mut response = Response::new(full(reply.body));
    *response.status_mut() = reply.status;
    let headers = response.headers_mut();
    for (name, value) in reply.headers {
        if let Ok(name) = HeaderName::from_bytes(name.as_bytes()) {
            headers.insert(name, HeaderValue::from_static(value));
        }
    }
    response
}
