//! Dashboard HTTP server.
//!
//! One connection at a time: read the request line, drain the headers,
//! render the page against the gateway, write the response, close.
//!
//! Endpoints:
//!   GET /                  - overview page
//!   GET /<slug>            - any other page
//!   GET /api/pages/<slug>  - a page's blocks and outcomes as JSON
//!   GET /api/health        - health check

use std::future::Future;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

use crate::gateway::Gateway;
use crate::logging::{self, obj, v_num, v_str, Domain, ProfileScope};
use crate::pages::{self, PageId};
use crate::render::{page_html, LinkStyle};

const READ_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_HEADER_LINES: usize = 100;
const MAX_REQUEST_BYTES: u64 = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Page(PageId),
    PageJson(PageId),
    Health,
    NotFound,
    MethodNotAllowed,
}

impl Route {
    /// Resolves a request line such as `GET /reviews?x=1 HTTP/1.1`.
    pub fn parse(request_line: &str) -> Route {
        let mut parts = request_line.split_whitespace();
        let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
            return Route::NotFound;
        };
        let path = match Url::parse("http://dashboard.local").and_then(|base| base.join(target)) {
            Ok(url) => url.path().trim_end_matches('/').to_string(),
            Err(_) => return Route::NotFound,
        };

        let route = if path == "/api/health" {
            Route::Health
        } else if let Some(slug) = path.strip_prefix("/api/pages/") {
            PageId::from_slug(slug).map(Route::PageJson).unwrap_or(Route::NotFound)
        } else {
            let slug = path.trim_start_matches('/');
            PageId::from_slug(slug).map(Route::Page).unwrap_or(Route::NotFound)
        };

        match (method, route) {
            (_, Route::NotFound) => Route::NotFound,
            ("GET", route) => route,
            _ => Route::MethodNotAllowed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    fn new(status: &'static str, content_type: &'static str, body: String) -> Self {
        Self { status, content_type, body }
    }

    pub fn status_code(&self) -> u16 {
        self.status
            .split_whitespace()
            .next()
            .and_then(|c| c.parse().ok())
            .unwrap_or(500)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let allow = if self.status_code() == 405 { "Allow: GET\r\n" } else { "" };
        format!(
            "HTTP/1.1 {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             {}\
             Connection: close\r\n\r\n{}",
            self.status,
            self.content_type,
            self.body.len(),
            allow,
            self.body
        )
        .into_bytes()
    }
}

pub async fn handle(route: Route, gateway: &dyn Gateway) -> Response {
    match route {
        Route::Page(id) => {
            let page = pages::render(id, gateway).await;
            Response::new("200 OK", "text/html; charset=utf-8", page_html(&page, LinkStyle::Server))
        }
        Route::PageJson(id) => {
            let page = pages::render(id, gateway).await;
            match serde_json::to_string(&page) {
                Ok(body) => Response::new("200 OK", "application/json", body),
                Err(e) => Response::new(
                    "500 Internal Server Error",
                    "text/plain; charset=utf-8",
                    format!("failed to encode page: {}", e),
                ),
            }
        }
        Route::Health => Response::new("200 OK", "application/json", r#"{"status":"ok"}"#.to_string()),
        Route::NotFound => Response::new("404 Not Found", "text/plain; charset=utf-8", "Not Found".to_string()),
        Route::MethodNotAllowed => Response::new(
            "405 Method Not Allowed",
            "text/plain; charset=utf-8",
            "Method Not Allowed".to_string(),
        ),
    }
}

/// Reads the request line and discards the headers. At most
/// `MAX_REQUEST_BYTES` are read from the client.
async fn read_request_line<R>(stream: R) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream.take(MAX_REQUEST_BYTES));
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    if !request_line.is_empty() && !request_line.ends_with('\n') {
        bail!("request line exceeds {} bytes", MAX_REQUEST_BYTES);
    }
    for _ in 0..MAX_HEADER_LINES {
        let mut header = String::new();
        if reader.read_line(&mut header).await? == 0 || header.trim().is_empty() {
            break;
        }
    }
    Ok(request_line.trim_end().to_string())
}

async fn serve_connection(mut stream: TcpStream, gateway: &dyn Gateway) -> Result<()> {
    let scope = ProfileScope::new("request");
    let request_line = tokio::time::timeout(READ_TIMEOUT, read_request_line(&mut stream))
        .await
        .context("request read timed out")??;
    if request_line.is_empty() {
        return Ok(());
    }

    let route = Route::parse(&request_line);
    let response = handle(route, gateway).await;
    stream.write_all(&response.to_bytes()).await?;
    stream.shutdown().await?;

    logging::info(
        Domain::Server,
        "server.request",
        obj(&[
            ("request", v_str(&request_line)),
            ("status", v_num(response.status_code() as f64)),
            ("bytes", v_num(response.body.len() as f64)),
            ("elapsed_ms", v_num(scope.elapsed_ms())),
        ]),
    );
    Ok(())
}

/// Serves until `shutdown` resolves. A failed connection is logged and
/// the loop moves on to the next one.
pub async fn serve_until<S>(listener: TcpListener, gateway: &dyn Gateway, shutdown: S) -> Result<()>
where
    S: Future<Output = ()>,
{
    let addr = listener.local_addr()?;
    logging::info(
        Domain::System,
        "server.listening",
        obj(&[("addr", v_str(&addr.to_string())), ("backend", v_str(gateway.name()))]),
    );

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        logging::warn(Domain::Server, "server.accept_failed", obj(&[("msg", v_str(&e.to_string()))]));
                        continue;
                    }
                };
                if let Err(e) = serve_connection(stream, gateway).await {
                    logging::warn(
                        Domain::Server,
                        "server.connection_failed",
                        obj(&[("peer", v_str(&peer.to_string())), ("msg", v_str(&format!("{:#}", e)))]),
                    );
                }
            }
        }
    }

    logging::info(Domain::System, "server.stopped", obj(&[("addr", v_str(&addr.to_string()))]));
    Ok(())
}

/// Serves until Ctrl-C.
pub async fn serve(listener: TcpListener, gateway: &dyn Gateway) -> Result<()> {
    serve_until(listener, gateway, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}
