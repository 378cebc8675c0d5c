//! Per-source pull connection task
//!
//! Connects to the source's MJPEG endpoint on localhost, sends a minimal
//! HTTP/1.0 request, and loops read → parse → cache for as long as the
//! stream keeps flowing. The task runs autonomously; consumers never await
//! it. Any transport or protocol failure ends the task: it logs, removes its
//! own registry entry, and is never restarted in place — the next
//! `get_frame` call creates a replacement.

use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::protocol::FrameParser;
use crate::registry::FrameRegistry;
use crate::source::SourceId;

/// The entire request; the daemon streams on any path and needs no headers
const REQUEST: &[u8] = b"GET / HTTP/1.0\r\n\r\n";

/// Spawn the pull task for one source.
///
/// The caller registers the returned handle before the connect completes,
/// so the registry sees the connection as in flight immediately.
pub(crate) fn spawn(
    registry: Arc<FrameRegistry>,
    id: SourceId,
    port: u16,
    conn_id: u64,
    read_buffer_size: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = run(&registry, id, port, read_buffer_size).await {
            tracing::error!(source = %id, port, error = %e, "mjpeg client error");
        }
        registry.deregister(id, conn_id).await;
    })
}

async fn run(
    registry: &FrameRegistry,
    id: SourceId,
    port: u16,
    read_buffer_size: usize,
) -> Result<()> {
    tracing::debug!(source = %id, port, "mjpeg client connecting");
    let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await?;
    tracing::debug!(source = %id, port, "mjpeg client connected");

    drive(&mut stream, registry, id, read_buffer_size).await
}

/// Request the stream and pump frames into the registry until it fails.
///
/// Generic over the transport so the loop is testable against I/O mocks.
async fn drive<S>(
    stream: &mut S,
    registry: &FrameRegistry,
    id: SourceId,
    read_buffer_size: usize,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(REQUEST).await?;

    let mut parser = FrameParser::new();
    let mut buf = vec![0u8; read_buffer_size];

    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Err(Error::Transport(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stream closed by peer",
            )));
        }

        for frame in parser.feed(&buf[..n])? {
            tracing::trace!(source = %id, len = frame.len(), "frame received");
            registry.store_frame(id, frame).await;
        }
    }
}
