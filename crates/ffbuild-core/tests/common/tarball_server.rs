//! Minimal HTTP/1.1 server serving static files for integration tests.
//!
//! Responds to GET of a known path with 200 and the body, to unknown paths
//! with 404. Can be told to answer the first N requests with 503 to exercise
//! retry, to redirect one path to another, and to delay successful bodies.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct TarballServerOptions {
    /// Number of initial requests answered with 503 Service Unavailable.
    pub fail_first: usize,
    /// `from -> to` paths answered with 302 Found.
    pub redirects: HashMap<String, String>,
    /// Pause before sending a 200 body.
    pub body_delay: Duration,
}

/// Handle to a running server. Requests are counted for assertions.
#[derive(Clone)]
pub struct TarballServer {
    pub base_url: String,
    requests: Arc<AtomicUsize>,
}

impl TarballServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread serving `files` (path -> body).
/// The server runs until the process exits.
pub fn start(files: Vec<(&str, Vec<u8>)>) -> TarballServer {
    start_with_options(files, TarballServerOptions::default())
}

pub fn start_with_options(files: Vec<(&str, Vec<u8>)>, opts: TarballServerOptions) -> TarballServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let files: Arc<HashMap<String, Vec<u8>>> = Arc::new(
        files
            .into_iter()
            .map(|(p, b)| (format!("/{}", p.trim_start_matches('/')), b))
            .collect(),
    );
    let requests = Arc::new(AtomicUsize::new(0));
    let opts = Arc::new(opts);
    let counter = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let files = Arc::clone(&files);
            let opts = Arc::clone(&opts);
            let counter = Arc::clone(&counter);
            thread::spawn(move || handle(stream, &files, &opts, &counter));
        }
    });
    TarballServer {
        base_url: format!("http://127.0.0.1:{}/", port),
        requests,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    files: &HashMap<String, Vec<u8>>,
    opts: &TarballServerOptions,
    counter: &AtomicUsize,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let mut first = request.lines().next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("");
    let path = first.next().unwrap_or("/");
    let seen = counter.fetch_add(1, Ordering::SeqCst);

    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }
    if seen < opts.fail_first {
        let _ = stream
            .write_all(b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    }
    if let Some(to) = opts.redirects.get(path) {
        let response = format!(
            "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            to
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }
    match files.get(path) {
        Some(body) => {
            thread::sleep(opts.body_delay);
            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(header.as_bytes());
            let _ = stream.write_all(body);
        }
        None => {
            let _ = stream
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        }
    }
}
