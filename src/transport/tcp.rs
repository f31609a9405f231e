//! TCP and TLS line transport.

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::SinkExt;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use tokio_rustls::rustls::{ClientConfig as TlsConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, info, warn};

use super::{Transport, MAX_IRC_LINE_LEN};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::message::Message;

/// Any byte stream the transport can run over.
pub trait IrcStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> IrcStream for T {}

type BoxedStream = Box<dyn IrcStream>;

/// Inbound half: a stream of decoded lines for [`Client::run`](crate::Client::run).
pub type LineReader = FramedRead<ReadHalf<BoxedStream>, LinesCodec>;

#[derive(Debug, Default)]
struct Queue {
    priority: VecDeque<String>,
    normal: VecDeque<String>,
}

impl Queue {
    fn pop(&mut self) -> Option<String> {
        self.priority.pop_front().or_else(|| self.normal.pop_front())
    }
}

#[derive(Debug)]
struct Shared {
    queue: Mutex<Queue>,
    wake: Notify,
    connected: AtomicBool,
}

/// Line transport over TCP, optionally wrapped in TLS.
///
/// A writer task drains the send queue, priority lines first, waiting
/// `flood_delay_ms` between lines.
#[derive(Debug)]
pub struct TcpTransport {
    shared: Arc<Shared>,
}

impl TcpTransport {
    /// Connect to `config.hostname:config.port`.
    ///
    /// Must be called inside a tokio runtime; the writer task is spawned on it.
    pub async fn connect(config: &ClientConfig) -> Result<(Arc<Self>, LineReader)> {
        let tcp = TcpStream::connect((config.hostname.as_str(), config.port)).await?;
        if let Err(e) = enable_keepalive(&tcp) {
            warn!("failed to enable TCP keepalive: {}", e);
        }
        info!(host = %config.hostname, port = config.port, tls = config.tls, "connected");

        let stream: BoxedStream = if config.tls {
            let connector = TlsConnector::from(Arc::new(tls_config(config)?));
            let server_name = ServerName::try_from(config.hostname.clone())
                .map_err(|e| ClientError::Tls(e.to_string()))?;
            let tls = connector
                .connect(server_name, tcp)
                .await
                .map_err(|e| ClientError::Tls(e.to_string()))?;
            debug!("TLS handshake complete");
            Box::new(tls)
        } else {
            Box::new(tcp)
        };

        let (read, write) = tokio::io::split(stream);
        let reader = FramedRead::new(read, LinesCodec::new_with_max_length(MAX_IRC_LINE_LEN));
        let writer = FramedWrite::new(write, LinesCodec::new());

        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue::default()),
            wake: Notify::new(),
            connected: AtomicBool::new(true),
        });
        tokio::spawn(write_loop(
            Arc::clone(&shared),
            writer,
            Duration::from_millis(config.flood_delay_ms),
        ));

        Ok((Arc::new(Self { shared }), reader))
    }

    fn enqueue(&self, msg: &Message, priority: bool) {
        if !self.is_connected() {
            debug!(command = %msg.command, "dropping line, transport closed");
            return;
        }
        let line = msg.to_string();
        {
            let mut queue = self.shared.queue.lock();
            if priority {
                queue.priority.push_back(line);
            } else {
                queue.normal.push_back(line);
            }
        }
        self.shared.wake.notify_one();
    }
}

impl Transport for TcpTransport {
    fn send(&self, msg: &Message) {
        self.enqueue(msg, false);
    }

    fn priority_send(&self, msg: &Message) {
        self.enqueue(msg, true);
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    fn disconnect(&self) {
        if self.shared.connected.swap(false, Ordering::SeqCst) {
            debug!("transport closing");
        }
        self.shared.wake.notify_one();
    }
}

async fn write_loop(
    shared: Arc<Shared>,
    mut sink: FramedWrite<WriteHalf<BoxedStream>, LinesCodec>,
    flood_delay: Duration,
) {
    loop {
        let next = shared.queue.lock().pop();
        match next {
            Some(line) => {
                debug!(line = %line, "send");
                if let Err(e) = sink.send(format!("{}\r", line)).await {
                    warn!("write failed: {}", e);
                    break;
                }
                if !flood_delay.is_zero() {
                    tokio::time::sleep(flood_delay).await;
                }
            }
            None if !shared.connected.load(Ordering::SeqCst) => break,
            None => shared.wake.notified().await,
        }
    }
    shared.connected.store(false, Ordering::SeqCst);
    if let Err(e) = SinkExt::<String>::close(&mut sink).await {
        debug!("close failed: {}", e);
    }
}

fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    use socket2::{SockRef, TcpKeepalive};

    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));
    sock.set_tcp_keepalive(&keepalive)
}

fn tls_config(config: &ClientConfig) -> Result<TlsConfig> {
    let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let builder = TlsConfig::builder().with_root_certificates(roots);

    match &config.services_certificate {
        Some(cert_path) => {
            let key_path = config.services_key.as_ref().unwrap_or(cert_path);
            let certs = load_certs(cert_path)?;
            let key = load_key(key_path)?;
            builder
                .with_client_auth_cert(certs, key)
                .map_err(|e| ClientError::Tls(e.to_string()))
        }
        None => Ok(builder.with_no_client_auth()),
    }
}

fn load_certs(path: &std::path::Path) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = BufReader::new(File::open(path)?);
    let certs = rustls_pemfile::certs(&mut reader).collect::<std::io::Result<Vec<_>>>()?;
    if certs.is_empty() {
        return Err(ClientError::Tls(format!("no certificate in {}", path.display())));
    }
    Ok(certs)
}

fn load_key(path: &std::path::Path) -> Result<PrivateKeyDer<'static>> {
    let mut reader = BufReader::new(File::open(path)?);
    rustls_pemfile::private_key(&mut reader)?
        .ok_or_else(|| ClientError::Tls(format!("no private key in {}", path.display())))
}
