use std::{
    sync::{
        atomic::{AtomicI64, Ordering},
        Mutex, MutexGuard,
    },
    time::Duration,
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

use crate::infra::contracts::Clock;

static ENV_LOCK: Mutex<()> = Mutex::new(());

pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn advance_ms(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Local HTTP endpoint that answers exactly one request.
pub struct OneShotServer {
    pub base_url: String,
    handle: JoinHandle<String>,
}

impl OneShotServer {
    /// Raw text of the request the server received.
    pub async fn request(self) -> String {
        self.handle.await.expect("one-shot server task should finish")
    }
}

pub async fn serve_once(status: u16, body: &'static str) -> OneShotServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("test listener should bind");
    let base_url = format!(
        "http://{}/api",
        listener.local_addr().expect("listener address")
    );

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("connection accepted");
        let request = read_request(&mut stream).await;
        let response = format!(
            "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            reason(status),
            body.len()
        );
        stream
            .write_all(response.as_bytes())
            .await
            .expect("response written");
        let _ = stream.shutdown().await;
        request
    });

    OneShotServer { base_url, handle }
}

/// Accepts one connection and never answers it.
pub async fn serve_silently() -> OneShotServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("test listener should bind");
    let base_url = format!(
        "http://{}/api",
        listener.local_addr().expect("listener address")
    );

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("connection accepted");
        let request = read_request(&mut stream).await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        request
    });

    OneShotServer { base_url, handle }
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 4096];

    loop {
        let read = stream.read(&mut chunk).await.unwrap_or(0);
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);

        let text = String::from_utf8_lossy(&buffer);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let expected_body = content_length(&text[..header_end]);
            if buffer.len() >= header_end + 4 + expected_body {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buffer).into_owned()
}

fn content_length(headers: &str) -> usize {
    headers
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}
