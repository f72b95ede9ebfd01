/*!
 * Common test utilities for the pagetran test suite
 */

use anyhow::Result;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use pagetran::translation::PageRecord;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a text document with `count` form-feed separated pages
pub fn create_test_document(dir: &Path, filename: &str, count: u32) -> Result<PathBuf> {
    let pages: Vec<String> = (1..=count).map(page_text).collect();
    create_test_file(dir, filename, &format!("{}\u{000C}", pages.join("\u{000C}")))
}

/// Text of page `n` in generated documents
pub fn page_text(n: u32) -> String {
    format!("Page {} says \"hello\".\nSecond line of page {}.", n, n)
}

/// `count` pages of equal serialized size
pub fn uniform_pages(count: u32) -> Vec<PageRecord> {
    (1..=count).map(|n| PageRecord::new(n, format!("page text {:03}", n))).collect()
}

/// A local HTTP endpoint that answers every request with a fixed response
pub struct StubServer {
    /// Full chat completions URL of the server
    pub url: String,
    /// Raw requests received so far
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    /// Start a server replying with `status_line` (e.g. "200 OK") and `body`
    pub async fn start(status_line: &'static str, body: impl Into<String>) -> Self {
        let body = body.into();
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub server");
        let addr = listener.local_addr().expect("stub server address");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let received = requests.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let body = body.clone();
                let received = received.clone();
                tokio::spawn(async move {
                    let request = read_request(&mut socket).await;
                    received.lock().push(request);
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status_line,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            url: format!("http://{}/v1/chat/completions", addr),
            requests,
        }
    }

    /// Start a server that accepts connections but never answers
    pub async fn silent() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub server");
        let addr = listener.local_addr().expect("stub server address");

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let _ = read_request(&mut socket).await;
                    tokio::time::sleep(Duration::from_secs(30)).await;
                });
            }
        });

        Self {
            url: format!("http://{}/v1/chat/completions", addr),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// URL on the loopback interface with nothing listening
pub fn unused_local_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe");
    let port = listener.local_addr().expect("probe address").port();
    drop(listener);
    format!("http://127.0.0.1:{}/v1/chat/completions", port)
}

/// Chat completions response body with `content` as the first choice
pub fn chat_body(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buffer.extend_from_slice(&chunk[..n]);

        let Some(header_end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buffer[..header_end]).to_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buffer.len() >= header_end + 4 + content_length {
            break;
        }
    }

    String::from_utf8_lossy(&buffer).to_string()
}
