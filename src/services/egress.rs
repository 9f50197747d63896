//! Outbound proxy selection.
//!
//! A proxy is picked uniformly at random per fetch. Chromium's
//! `--proxy-server` flag cannot carry credentials, so an upstream with
//! credentials is fronted by a local forwarder on `127.0.0.1` that injects
//! `Proxy-Authorization` into each tunnel request. Failing to prepare a proxy
//! is an error; it never silently falls back to a direct connection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::seq::SliceRandom;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::EgressConfig;

/// Largest request head the forwarder will buffer.
const MAX_HEAD_BYTES: usize = 16 * 1024;

/// A prepared outbound path, owned by exactly one fetch.
#[derive(Debug)]
pub struct EgressHandle {
    /// Upstream proxy with credentials stripped, for logs
    upstream: String,
    /// Address handed to the browser
    endpoint: String,
    forwarder: Option<JoinHandle<()>>,
}

impl EgressHandle {
    /// Handle that routes straight to `endpoint` with nothing to tear down.
    pub fn passthrough(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            upstream: endpoint.clone(),
            endpoint,
            forwarder: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn upstream(&self) -> &str {
        &self.upstream
    }
}

/// Source of egress handles.
#[async_trait]
pub trait EgressProvider: Send + Sync {
    /// Prepare an outbound path; `None` means connect directly.
    async fn acquire(&self) -> Result<Option<EgressHandle>>;

    /// Tear a handle down. Called exactly once per handle `acquire` returned.
    async fn release(&self, handle: EgressHandle);
}

/// Uniform random choice over the configured proxies.
#[derive(Debug, Clone)]
pub struct ProxyPool {
    proxies: Vec<String>,
    connect_timeout: Duration,
}

impl ProxyPool {
    pub fn new(config: &EgressConfig) -> Self {
        Self {
            proxies: config.proxies.clone(),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    fn pick(&self) -> Option<&str> {
        self.proxies
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }

    async fn prepare(&self, raw: &str) -> Result<EgressHandle> {
        let proxy = Url::parse(raw).map_err(|e| AppError::egress(raw, e))?;
        let host = proxy
            .host_str()
            .ok_or_else(|| AppError::egress(raw, "missing host"))?;
        let port = proxy
            .port_or_known_default()
            .ok_or_else(|| AppError::egress(raw, "missing port"))?;
        let upstream_addr = format!("{host}:{port}");
        let redacted = format!("{}://{upstream_addr}", proxy.scheme());

        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(&upstream_addr)).await
        {
            Ok(Ok(_probe)) => {}
            Ok(Err(e)) => return Err(AppError::egress(&redacted, e)),
            Err(_) => {
                return Err(AppError::egress(
                    &redacted,
                    format!("unreachable within {}ms", self.connect_timeout.as_millis()),
                ));
            }
        }

        if proxy.username().is_empty() {
            return Ok(EgressHandle {
                upstream: redacted.clone(),
                endpoint: redacted,
                forwarder: None,
            });
        }

        if !matches!(proxy.scheme(), "http" | "https") {
            return Err(AppError::egress(
                &redacted,
                format!("credentials unsupported for scheme '{}'", proxy.scheme()),
            ));
        }

        let credentials = format!(
            "{}:{}",
            proxy.username(),
            proxy.password().unwrap_or_default()
        );
        let auth_header: Arc<str> =
            format!("Proxy-Authorization: Basic {}\r\n", STANDARD.encode(credentials)).into();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| AppError::egress(&redacted, e))?;
        let local = listener
            .local_addr()
            .map_err(|e| AppError::egress(&redacted, e))?;

        let forwarder = tokio::spawn(forward(listener, upstream_addr, auth_header));
        log::debug!("Forwarding 127.0.0.1:{} -> {}", local.port(), redacted);

        Ok(EgressHandle {
            upstream: redacted,
            endpoint: format!("http://{local}"),
            forwarder: Some(forwarder),
        })
    }
}

impl Drop for EgressHandle {
    fn drop(&mut self) {
        // A handle dropped mid-acquire must not leave its forwarder running.
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

#[async_trait]
impl EgressProvider for ProxyPool {
    async fn acquire(&self) -> Result<Option<EgressHandle>> {
        let Some(raw) = self.pick() else {
            return Ok(None);
        };
        let handle = self.prepare(raw).await?;
        log::info!("Using egress {}", handle.upstream);
        Ok(Some(handle))
    }

    async fn release(&self, mut handle: EgressHandle) {
        if let Some(forwarder) = handle.forwarder.take() {
            forwarder.abort();
        }
        log::debug!("Released egress {}", handle.upstream);
    }
}

/// Accept loop of the local forwarder; runs until aborted.
async fn forward(listener: TcpListener, upstream: String, auth_header: Arc<str>) {
    loop {
        let inbound = match listener.accept().await {
            Ok((stream, _)) => stream,
            Err(e) => {
                log::warn!("Egress forwarder accept failed: {}", e);
                continue;
            }
        };
        let upstream = upstream.clone();
        let auth_header = Arc::clone(&auth_header);
        tokio::spawn(async move {
            if let Err(e) = relay(inbound, &upstream, &auth_header).await {
                log::debug!("Egress relay to {} ended: {}", upstream, e);
            }
        });
    }
}

/// Rewrite the first request head of a connection, then pipe bytes both ways.
///
/// Only the first head is rewritten, which covers `CONNECT` tunnels.
async fn relay(mut inbound: TcpStream, upstream: &str, auth_header: &str) -> std::io::Result<()> {
    let mut buffer = Vec::with_capacity(1024);
    let head_end = loop {
        let mut chunk = [0u8; 4096];
        let n = inbound.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(end) = find_head_end(&buffer) {
            break end;
        }
        if buffer.len() > MAX_HEAD_BYTES {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "request head too large",
            ));
        }
    };

    let mut outbound = TcpStream::connect(upstream).await?;
    outbound
        .write_all(&inject_header(&buffer[..head_end], auth_header))
        .await?;
    outbound.write_all(&buffer[head_end..]).await?;
    tokio::io::copy_bidirectional(&mut inbound, &mut outbound).await?;
    Ok(())
}

/// Index just past the blank line ending an HTTP head.
fn find_head_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// Insert `header` (including its CRLF) right after the request line.
fn inject_header(head: &[u8], header: &str) -> Vec<u8> {
    let line_end = head
        .windows(2)
        .position(|w| w == b"\r\n")
        .map_or(head.len(), |pos| pos + 2);

    let mut out = Vec::with_capacity(head.len() + header.len());
    out.extend_from_slice(&head[..line_end]);
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(&head[line_end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(proxies: Vec<String>) -> ProxyPool {
        ProxyPool::new(&EgressConfig {
            proxies,
            connect_timeout_ms: 2_000,
        })
    }

    #[test]
    fn test_find_head_end() {
        assert_eq!(find_head_end(b"GET / HTTP/1.1\r\nHost: a\r\n\r\nbody"), Some(27));
        assert_eq!(find_head_end(b"GET / HTTP/1.1\r\nHost: a\r\n"), None);
    }

    #[test]
    fn test_inject_header_after_request_line() {
        let head = b"CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\n\r\n";
        let out = inject_header(head, "Proxy-Authorization: Basic abc\r\n");
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "CONNECT example.com:443 HTTP/1.1\r\nProxy-Authorization: Basic abc\r\nHost: example.com:443\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn test_empty_pool_is_direct() {
        let pool = pool(Vec::new());
        assert!(pool.is_empty());
        assert!(pool.acquire().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_proxy_is_egress_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let pool = pool(vec![format!("http://{addr}")]);
        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, AppError::Egress { .. }));
    }

    #[tokio::test]
    async fn test_proxy_without_credentials_passes_through() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let pool = pool(vec![format!("http://{addr}")]);
        let handle = pool.acquire().await.unwrap().unwrap();
        assert_eq!(handle.endpoint(), format!("http://{addr}"));
        pool.release(handle).await;
    }

    #[tokio::test]
    async fn test_forwarder_injects_credentials() {
        let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let upstream_addr = upstream.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            loop {
                let (mut stream, _) = upstream.accept().await.unwrap();
                let mut received = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    let n = stream.read(&mut chunk).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    received.extend_from_slice(&chunk[..n]);
                    if find_head_end(&received).is_some() {
                        break;
                    }
                }
                // The reachability probe connects and sends nothing.
                if !received.is_empty() {
                    let _ = tx.send(String::from_utf8(received).unwrap());
                    return;
                }
            }
        });

        let pool = pool(vec![format!("http://alice:secret@{upstream_addr}")]);
        let handle = pool.acquire().await.unwrap().unwrap();
        assert!(handle.endpoint().starts_with("http://127.0.0.1:"));
        assert!(!handle.upstream().contains("secret"));

        let local = handle.endpoint().trim_start_matches("http://").to_string();
        let mut client = TcpStream::connect(local).await.unwrap();
        client
            .write_all(b"CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\n\r\n")
            .await
            .unwrap();

        let head = rx.await.unwrap();
        let expected = format!("Proxy-Authorization: Basic {}", STANDARD.encode("alice:secret"));
        assert!(head.contains(&expected), "head was: {head}");

        pool.release(handle).await;
    }
}
