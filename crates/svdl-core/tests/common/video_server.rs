//! Minimal HTTP/1.1 server for integration tests: JSON documents, segment
//! bodies with open-ended Range support, failure injection, and per-path
//! request counters.
//!
//! Serves a fixed route table. Responds to `GET` only; each connection
//! handles one request and closes.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

/// Behavior of one served path.
#[derive(Debug, Clone)]
pub enum Route {
    /// Segment body; honors `Range: bytes=K-` and `bytes=K-L`, answers 416
    /// when the start is at or past the end.
    Body(Vec<u8>),
    /// JSON document served whole with 200.
    Json(String),
    /// Always respond with this status code and an empty body.
    Fail(u32),
    /// Body served whole with 200, any Range header ignored (misbehaving server).
    NoRange(Vec<u8>),
}

#[derive(Default)]
struct Stats {
    hits: HashMap<String, u32>,
    last_range: HashMap<String, String>,
}

pub struct TestServer {
    base_url: String,
    stats: Arc<Mutex<Stats>>,
}

impl TestServer {
    /// Full URL for a path (e.g. `url("/manifest.json")`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Number of requests seen for a path.
    pub fn hits(&self, path: &str) -> u32 {
        self.stats
            .lock()
            .unwrap()
            .hits
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    /// Raw value of the last `Range` header seen for a path.
    pub fn last_range(&self, path: &str) -> Option<String> {
        self.stats.lock().unwrap().last_range.get(path).cloned()
    }
}

/// Starts the server in background threads. Runs until the process exits.
pub fn start(routes: HashMap<String, Route>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let stats = Arc::new(Mutex::new(Stats::default()));
    let routes = Arc::new(routes);
    let stats_bg = Arc::clone(&stats);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let stats = Arc::clone(&stats_bg);
            thread::spawn(move || handle(stream, &routes, &stats));
        }
    });
    TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        stats,
    }
}

fn handle(mut stream: TcpStream, routes: &HashMap<String, Route>, stats: &Arc<Mutex<Stats>>) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let Some((method, path, range)) = parse_request(request) else {
        return;
    };
    {
        let mut st = stats.lock().unwrap();
        *st.hits.entry(path.to_string()).or_insert(0) += 1;
        if let Some(r) = &range {
            st.last_range.insert(path.to_string(), r.clone());
        }
    }
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nConnection: close\r\n\r\n");
        return;
    }
    let Some(route) = routes.get(path) else {
        let _ = stream
            .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    };

    match route {
        Route::Json(doc) => {
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                doc.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.write_all(doc.as_bytes());
        }
        Route::Fail(code) => {
            let response = format!(
                "HTTP/1.1 {} Injected Failure\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                code
            );
            let _ = stream.write_all(response.as_bytes());
        }
        Route::NoRange(body) => {
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.write_all(body);
        }
        Route::Body(body) => serve_body(&mut stream, body, range.as_deref()),
    }
}

fn serve_body(stream: &mut TcpStream, body: &[u8], range: Option<&str>) {
    let total = body.len() as u64;
    let parsed = range.and_then(parse_byte_range);
    match parsed {
        Some((start, end_incl)) => {
            if start >= total {
                let response = format!(
                    "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Range: bytes */{}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    total
                );
                let _ = stream.write_all(response.as_bytes());
                return;
            }
            let end_incl = end_incl.min(total - 1);
            let slice = &body[start as usize..=end_incl as usize];
            let response = format!(
                "HTTP/1.1 206 Partial Content\r\nContent-Length: {}\r\nContent-Range: bytes {}-{}/{}\r\nAccept-Ranges: bytes\r\nConnection: close\r\n\r\n",
                slice.len(),
                start,
                end_incl,
                total
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.write_all(slice);
        }
        None => {
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nAccept-Ranges: bytes\r\nConnection: close\r\n\r\n",
                total
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.write_all(body);
        }
    }
}

/// Returns (method, path, raw Range header value).
fn parse_request(request: &str) -> Option<(&str, &str, Option<String>)> {
    let mut lines = request.lines();
    let first = lines.next()?;
    let mut parts = first.split_whitespace();
    let method = parts.next()?;
    let path = parts.next()?;
    let mut range = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                range = Some(value.trim().to_string());
            }
        }
    }
    Some((method, path, range))
}

/// Parses `bytes=K-` and `bytes=K-L` (inclusive end).
fn parse_byte_range(value: &str) -> Option<(u64, u64)> {
    let spec = value.strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    let start: u64 = start.trim().parse().ok()?;
    let end: u64 = match end.trim() {
        "" => u64::MAX,
        e => e.parse().ok()?,
    };
    Some((start, end))
}
