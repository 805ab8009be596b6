//! Upload interface.
//!
//! A small blocking HTTP server: `GET /` serves an upload page, `POST /scan`
//! accepts a raw video body, runs a scan and answers with the HTML report.
//! Requests are handled one at a time on a single worker thread.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::AppConfig;
use crate::detect::build_backend;
use crate::ingest::file::check_extension;
use crate::ingest::{FileConfig, FileSource, FrameSource};
use crate::pipeline::scan;
use crate::report::{escape_html, render_html};
use crate::store::FrameStore;

const MAX_HEADER_BYTES: usize = 8192;
/// Upper bound on bytes discarded from a rejected oversized upload.
const MAX_DRAIN_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug)]
pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("upload server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct UploadServer {
    cfg: AppConfig,
}

impl UploadServer {
    pub fn new(cfg: AppConfig) -> Self {
        Self { cfg }
    }

    pub fn spawn(self) -> Result<ServerHandle> {
        let configured_addr: SocketAddr = self
            .cfg
            .server_addr
            .parse()
            .with_context(|| format!("invalid server address '{}'", self.cfg.server_addr))?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let cfg = self.cfg;
        let join = std::thread::spawn(move || {
            if let Err(err) = run_server(listener, &cfg, shutdown_thread) {
                log::error!("upload server stopped: {}", err);
            }
        });

        Ok(ServerHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_server(listener: TcpListener, cfg: &AppConfig, shutdown: Arc<AtomicBool>) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(err) = handle_connection(stream, cfg) {
                    log::warn!("request from {} failed: {}", peer, err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(mut stream: TcpStream, cfg: &AppConfig) -> Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(Duration::from_secs(30)))?;

    let request = match read_request(&mut stream, cfg.upload.max_bytes) {
        Ok(request) => request,
        Err(RequestError::TooLarge { unread }) => {
            write_text_response(&mut stream, 413, "upload too large")?;
            discard_body(&mut stream, unread);
            return Ok(());
        }
        Err(RequestError::Malformed(err)) => {
            write_text_response(&mut stream, 400, "bad request")?;
            return Err(err);
        }
    };

    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/") => {
            let page = upload_page(cfg);
            write_response(&mut stream, 200, "text/html; charset=utf-8", page.as_bytes())
        }
        ("GET", "/health") => {
            write_response(&mut stream, 200, "application/json", br#"{"status":"ok"}"#)
        }
        ("POST", "/scan") => handle_scan(&mut stream, &request, cfg),
        (_, "/" | "/health" | "/scan") => write_text_response(&mut stream, 405, "method not allowed"),
        _ => write_text_response(&mut stream, 404, "not found"),
    }
}

fn handle_scan(stream: &mut TcpStream, request: &HttpRequest, cfg: &AppConfig) -> Result<()> {
    let name = match request.query.get("name") {
        Some(name) if !name.is_empty() => name.clone(),
        _ => return write_text_response(stream, 400, "missing ?name= of the uploaded file"),
    };
    if let Err(err) = check_extension(&name, &cfg.upload.allowed_extensions) {
        return write_text_response(stream, 415, &err.to_string());
    }
    if request.body.is_empty() {
        return write_text_response(stream, 400, "empty upload");
    }

    log::info!("scanning upload '{}' ({} bytes)", name, request.body.len());
    match scan_upload(&name, &request.body, cfg) {
        Ok(html) => write_response(stream, 200, "text/html; charset=utf-8", html.as_bytes()),
        Err(err) => {
            log::error!("scan of '{}' failed: {:#}", name, err);
            write_text_response(stream, 500, "processing failed")
        }
    }
}

/// Persist the upload to a temp file, scan it, and render the report.
pub fn scan_upload(name: &str, body: &[u8], cfg: &AppConfig) -> Result<String> {
    let ext = std::path::Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mut upload = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&format!(".{ext}"))
        .tempfile()
        .context("create upload temp file")?;
    upload.write_all(body).context("write upload temp file")?;
    upload.flush()?;

    let path = upload.path().to_string_lossy().to_string();
    let mut source = FileSource::open(FileConfig {
        path,
        allowed_extensions: cfg.upload.allowed_extensions.clone(),
        ..FileConfig::default()
    })?;
    scan_source(&mut source, cfg)
}

/// Scan an already opened source with the configured detector and render the
/// HTML report served back to the browser.
pub fn scan_source(source: &mut dyn FrameSource, cfg: &AppConfig) -> Result<String> {
    let mut detector = build_backend(&cfg.detector)?;
    let store = FrameStore::open(&cfg.output_dir)?;
    let report = scan(source, &mut detector, &store, cfg.scan, None)?;
    render_html(&report, &cfg.report)
}

fn upload_page(cfg: &AppConfig) -> String {
    let label = escape_html(&cfg.report.target_label);
    let accept = cfg
        .upload
        .allowed_extensions
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{label} detection in video</title></head>
<body style="font-family: sans-serif; margin: 2rem;">
<h1>{label} detection in video</h1>
<p>Upload a video to detect {label} and extract grouped detection intervals.</p>
<input type="file" id="video" accept="{accept}">
<button id="scan">Scan</button>
<p id="status"></p>
<video id="preview" controls style="max-width: 640px; display: none;"></video>
<script>
const input = document.getElementById("video");
const status = document.getElementById("status");
input.addEventListener("change", () => {{
  const file = input.files[0];
  if (!file) return;
  const preview = document.getElementById("preview");
  preview.src = URL.createObjectURL(file);
  preview.style.display = "block";
}});
document.getElementById("scan").addEventListener("click", async () => {{
  const file = input.files[0];
  if (!file) return;
  status.textContent = "Processing... Please wait.";
  const response = await fetch("/scan?name=" + encodeURIComponent(file.name), {{ method: "POST", body: file }});
  const html = await response.text();
  if (!response.ok) {{ status.textContent = "Error: " + html; return; }}
  document.open(); document.write(html); document.close();
}});
</script>
</body>
</html>
"#
    )
}

enum RequestError {
    TooLarge { unread: u64 },
    Malformed(anyhow::Error),
}

impl<E: Into<anyhow::Error>> From<E> for RequestError {
    fn from(err: E) -> Self {
        RequestError::Malformed(err.into())
    }
}

fn read_request(stream: &mut TcpStream, max_body: u64) -> Result<HttpRequest, RequestError> {
    let mut buf = [0u8; 8192];
    let mut data = Vec::new();
    let header_end = loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("connection closed before headers").into());
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        if data.len() > MAX_HEADER_BYTES {
            return Err(anyhow!("request headers too large").into());
        }
    };

    let text = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = text.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let mut headers = HashMap::new();
    for line in lines {
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }

    let content_length: u64 = match headers.get("content-length") {
        Some(value) => value
            .parse()
            .map_err(|_| anyhow!("invalid content-length '{}'", value))?,
        None => 0,
    };
    let mut body = data[header_end + 4..].to_vec();
    if content_length > max_body {
        let unread = content_length.saturating_sub(body.len() as u64);
        return Err(RequestError::TooLarge { unread });
    }

    while (body.len() as u64) < content_length {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("connection closed mid-body").into());
        }
        body.extend_from_slice(&buf[..n]);
    }
    body.truncate(content_length as usize);

    let (path, query) = match raw_path.split_once('?') {
        Some((path, query)) => (path.to_string(), parse_query(query)),
        None => (raw_path.to_string(), HashMap::new()),
    };

    Ok(HttpRequest {
        method: method.to_string(),
        path,
        query,
        body,
    })
}

/// Read and drop the rest of a rejected body so closing the socket does not
/// reset the connection before the client has seen the response.
fn discard_body(stream: &mut TcpStream, unread: u64) {
    if stream.shutdown(Shutdown::Write).is_err() {
        return;
    }
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let limit = unread.min(MAX_DRAIN_BYTES);
    match std::io::copy(&mut std::io::Read::by_ref(stream).take(limit), &mut std::io::sink()) {
        Ok(n) if n < unread => log::debug!("dropped {} of {} rejected upload bytes", n, unread),
        Ok(_) => {}
        Err(err) => log::debug!("draining rejected upload: {}", err),
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

fn write_text_response(stream: &mut TcpStream, status: u16, body: &str) -> Result<()> {
    write_response(stream, status, "text/plain; charset=utf-8", body.as_bytes())
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        400 => "HTTP/1.1 400 Bad Request",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        413 => "HTTP/1.1 413 Payload Too Large",
        415 => "HTTP/1.1 415 Unsupported Media Type",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    query: HashMap<String, String>,
    body: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_values_are_percent_decoded() {
        let query = parse_query("name=my%20herd.MP4&x=1&label=two+cows");
        assert_eq!(query.get("name").map(String::as_str), Some("my herd.MP4"));
        assert_eq!(query.get("x").map(String::as_str), Some("1"));
        assert_eq!(query.get("label").map(String::as_str), Some("two cows"));
    }

    #[test]
    fn truncated_escape_is_kept_literal() {
        let query = parse_query("a=a%2&b=100%");
        assert_eq!(query.get("a").map(String::as_str), Some("a%2"));
        assert_eq!(query.get("b").map(String::as_str), Some("100%"));
    }

    #[test]
    fn key_without_value_is_empty() {
        let query = parse_query("name&x=");
        assert_eq!(query.get("name").map(String::as_str), Some(""));
        assert_eq!(query.get("x").map(String::as_str), Some(""));
    }

    #[test]
    fn upload_page_accepts_configured_extensions() {
        let page = upload_page(&AppConfig::default());
        assert!(page.contains(r#"accept=".mp4,.avi,.mov""#));
        assert!(page.contains("fetch(\"/scan?name=\""));
    }
}
