//! Length-prefixed framing.
//!
//! Every frame is a 4-byte big-endian payload length followed by the
//! payload. Lengths of 0 or above [`MAX_FRAME_LEN`] mean the stream is
//! corrupted; the decoder refuses to resynchronize after seeing one.

/// Size of the length prefix.
pub const HEADER_LEN: usize = 4;

/// Largest accepted payload (1 MiB).
pub const MAX_FRAME_LEN: usize = 1_048_576;

/// Errors raised while framing or deframing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    /// A received header declared an impossible length.
    #[error("invalid frame length: {0} (must be 1..=1048576)")]
    InvalidLength(u32),
    /// An outbound payload does not fit in one frame.
    #[error("payload of {0} bytes cannot be framed (must be 1..=1048576)")]
    Unframeable(usize),
}

/// Prefix `payload` with its length.
///
/// Callers sending on a live connection should go through
/// [`check_outbound`] first; this function never fails.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Reject payloads the peer would treat as a corrupt frame.
pub fn check_outbound(payload: &[u8]) -> Result<(), FramingError> {
    if payload.is_empty() || payload.len() > MAX_FRAME_LEN {
        return Err(FramingError::Unframeable(payload.len()));
    }
    Ok(())
}

/// Incremental frame extractor.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    poisoned: Option<FramingError>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes received but not yet part of a complete frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Whether a framing error has already been seen.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// Append `chunk` and return every frame it completes, oldest first.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Vec<u8>>, FramingError> {
        if let Some(err) = &self.poisoned {
            return Err(err.clone());
        }
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut offset = 0;
        while self.buf.len() - offset >= HEADER_LEN {
            let mut header = [0u8; HEADER_LEN];
            header.copy_from_slice(&self.buf[offset..offset + HEADER_LEN]);
            let declared = u32::from_be_bytes(header);
            let len = declared as usize;

            if len == 0 || len > MAX_FRAME_LEN {
                let err = FramingError::InvalidLength(declared);
                self.poisoned = Some(err.clone());
                self.buf.clear();
                return Err(err);
            }

            let start = offset + HEADER_LEN;
            if self.buf.len() < start + len {
                break;
            }
            frames.push(self.buf[start..start + len].to_vec());
            offset = start + len;
        }

        self.buf.drain(..offset);
        Ok(frames)
    }
}
