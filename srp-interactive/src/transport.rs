use crate::framing::{check_outbound, encode_frame, FrameDecoder, FramingError};
use crate::wire::Envelope;
use crate::{InteractiveError, MessageChannel, Result};
use async_trait::async_trait;
use prost::Message;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Completed frames buffered ahead of the session.
const DEFAULT_QUEUE_DEPTH: usize = 32;

/// Socket read size.
const READ_CHUNK: usize = 8 * 1024;

/// What a receive resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// One complete frame payload.
    Frame(Vec<u8>),
    /// The reader has stopped; no more frames will arrive.
    EndOfStream,
}

enum Inbound {
    Frame(Vec<u8>),
    Framing(FramingError),
    Io(std::io::Error),
}

/// Length-framed channel over a byte stream.
///
/// The read half is owned by a spawned task that feeds a [`FrameDecoder`]
/// and queues complete frames in arrival order. The first framing or I/O
/// error is queued after any frames decoded before it and ends the reader.
pub struct FramedChannel<S> {
    writer: WriteHalf<S>,
    inbound: mpsc::Receiver<Inbound>,
    reader: JoinHandle<()>,
}

impl<S> FramedChannel<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(stream: S) -> Self {
        Self::with_queue_depth(stream, DEFAULT_QUEUE_DEPTH)
    }

    /// Create a channel whose inbound queue holds at most `depth` frames.
    pub fn with_queue_depth(stream: S, depth: usize) -> Self {
        let (read_half, writer) = tokio::io::split(stream);
        let (tx, inbound) = mpsc::channel(depth.max(1));
        let reader = tokio::spawn(read_loop(read_half, tx));
        Self {
            writer,
            inbound,
            reader,
        }
    }

    /// Frame and write one payload.
    pub async fn send_frame(&mut self, payload: &[u8]) -> Result<()> {
        check_outbound(payload)?;
        self.writer
            .write_all(&encode_frame(payload))
            .await
            .map_err(|e| InteractiveError::Transport(format!("Failed to send frame: {}", e)))?;
        self.writer
            .flush()
            .await
            .map_err(|e| InteractiveError::Transport(format!("Failed to flush: {}", e)))
    }

    /// Wait for the next frame, or the end-of-stream marker.
    pub async fn recv_frame(&mut self) -> Result<Delivery> {
        match self.inbound.recv().await {
            Some(Inbound::Frame(frame)) => Ok(Delivery::Frame(frame)),
            Some(Inbound::Framing(e)) => Err(e.into()),
            Some(Inbound::Io(e)) => Err(InteractiveError::Transport(format!(
                "Failed to read from stream: {}",
                e
            ))),
            None => Ok(Delivery::EndOfStream),
        }
    }

    /// Shut down the write half. Frames already queued stay readable.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer
            .shutdown()
            .await
            .map_err(|e| InteractiveError::Transport(format!("Failed to shut down: {}", e)))
    }
}

impl<S> Drop for FramedChannel<S> {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop<S: AsyncRead>(mut reader: ReadHalf<S>, tx: mpsc::Sender<Inbound>) {
    let mut decoder = FrameDecoder::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                tracing::trace!(leftover = decoder.buffered(), "stream closed by peer");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                let _ = tx.send(Inbound::Io(e)).await;
                return;
            }
        };
        match decoder.push(&buf[..n]) {
            Ok(frames) => {
                for frame in frames {
                    if tx.send(Inbound::Frame(frame)).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping corrupted stream");
                let _ = tx.send(Inbound::Framing(e)).await;
                return;
            }
        }
    }
}

#[async_trait]
impl<S> MessageChannel for FramedChannel<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn send(&mut self, envelope: Envelope) -> Result<()> {
        self.send_frame(&envelope.encode_to_vec()).await
    }

    async fn recv(&mut self) -> Result<Envelope> {
        match self.recv_frame().await? {
            Delivery::Frame(frame) => Envelope::from_frame(&frame),
            Delivery::EndOfStream => Err(InteractiveError::Disconnected),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.shutdown().await
    }
}

/// Open a TCP connection and wrap it in a [`FramedChannel`].
pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<FramedChannel<TcpStream>> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| InteractiveError::Transport(format!("Failed to connect: {}", e)))?;
    stream
        .set_nodelay(true)
        .map_err(|e| InteractiveError::Transport(format!("Failed to set TCP_NODELAY: {}", e)))?;
    Ok(FramedChannel::new(stream))
}
