//! Minimal HTTP/1.1 server that answers with a scripted sequence of statuses.
//!
//! Each connection serves one request and is closed. The n-th request gets the
//! n-th scripted status; once the script runs out the last entry repeats. A
//! status of 0 closes the connection without writing anything. Request methods,
//! headers and bodies are recorded for assertions.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// One request as the server saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seen {
    pub method: String,
    /// Header names lowercased, values as sent, in arrival order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Seen {
    /// First value of header `name` (lowercase).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

pub struct FlakyServer {
    pub url: String,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl FlakyServer {
    pub fn requests(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start(script: &[u16]) -> FlakyServer {
    assert!(!script.is_empty(), "script needs at least one status");
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let script = script.to_vec();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_srv = Arc::clone(&seen);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let Some(req) = read_request(&stream) else {
                continue;
            };
            let n = {
                let mut seen = seen_srv.lock().unwrap();
                seen.push(req.clone());
                seen.len()
            };
            let status = script[(n - 1).min(script.len() - 1)];
            respond(stream, status, &req);
        }
    });
    FlakyServer {
        url: format!("http://127.0.0.1:{}/", port),
        seen,
    }
}

fn read_request(stream: &TcpStream) -> Option<Seen> {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let mut reader = BufReader::new(stream);
    let mut method = String::new();
    let mut headers = Vec::new();
    let mut content_length = 0usize;
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).ok()? == 0 {
            return None;
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if method.is_empty() {
            method = trimmed.split_whitespace().next().unwrap_or("").to_string();
            continue;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim().to_string();
            if name == "content-length" {
                content_length = value.parse().unwrap_or(0);
            }
            headers.push((name, value));
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).ok()?;
    Some(Seen {
        method,
        headers,
        body,
    })
}

fn respond(mut stream: TcpStream, status: u16, req: &Seen) {
    if status == 0 {
        return;
    }
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let body = if status == 200 {
        let mut echo = format!("{} ", req.method).into_bytes();
        echo.extend_from_slice(&req.body);
        echo
    } else {
        format!("status {}", status).into_bytes()
    };
    let head = format!(
        "HTTP/1.1 {} Scripted\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&body);
}
