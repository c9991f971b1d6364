//! Native messaging framing: a `u32` little-endian length prefix followed by
//! that many bytes of UTF-8 JSON, one frame per call.

use std::io::{self, Read, Write};

use ontop_domain::NativeMessage;

const PREFIX_LEN: usize = 4;

/// Largest frame a host may send to the browser (1 MiB).
pub const MAX_OUTGOING_FRAME: usize = 1024 * 1024;

#[derive(thiserror::Error, Debug)]
pub enum FramingError {
    #[error("stream closed after {received} of 4 length-prefix bytes")]
    TruncatedPrefix { received: usize },
    #[error("stream closed after {received} of {declared} payload bytes")]
    TruncatedPayload { declared: u32, received: usize },
    #[error("frame payload is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("frame of {len} bytes exceeds the {limit}-byte limit")]
    Oversized { len: usize, limit: usize },
    #[error("i/o error on the native messaging stream: {0}")]
    Io(#[from] io::Error),
}

/// Reads exactly one frame.
///
/// Returns `Ok(None)` when the stream is already closed before the first
/// prefix byte; that is an orderly shutdown, not an empty message.
///
/// # Errors
/// Returns [`FramingError`] when the stream ends mid-frame or the payload is
/// not JSON.
pub fn read_message<R: Read>(reader: &mut R) -> Result<Option<NativeMessage>, FramingError> {
    let mut prefix = [0u8; PREFIX_LEN];
    let received = fill(reader, &mut prefix)?;
    if received == 0 {
        return Ok(None);
    }
    if received < PREFIX_LEN {
        return Err(FramingError::TruncatedPrefix { received });
    }
    let declared = u32::from_le_bytes(prefix);

    // Grow with the data actually sent instead of trusting the prefix for
    // the allocation size.
    let mut payload = Vec::new();
    reader
        .take(u64::from(declared))
        .read_to_end(&mut payload)?;
    if payload.len() < usize::try_from(declared).unwrap_or(usize::MAX) {
        return Err(FramingError::TruncatedPayload {
            declared,
            received: payload.len(),
        });
    }
    decode_frame(&payload).map(Some)
}

/// Writes one frame and flushes so the peer sees it immediately.
///
/// # Errors
/// Returns [`FramingError`] if the message is too large or the stream is closed.
pub fn write_message<W: Write>(writer: &mut W, message: &NativeMessage) -> Result<(), FramingError> {
    let frame = encode_frame(message)?;
    writer.write_all(&frame[..PREFIX_LEN])?;
    writer.write_all(&frame[PREFIX_LEN..])?;
    writer.flush()?;
    Ok(())
}

/// Encodes `message` as prefix + compact JSON.
///
/// # Errors
/// Returns [`FramingError::Oversized`] for payloads above [`MAX_OUTGOING_FRAME`].
pub fn encode_frame(message: &NativeMessage) -> Result<Vec<u8>, FramingError> {
    let payload = serde_json::to_vec(message).map_err(FramingError::Malformed)?;
    let oversized = || FramingError::Oversized {
        len: payload.len(),
        limit: MAX_OUTGOING_FRAME,
    };
    if payload.len() > MAX_OUTGOING_FRAME {
        return Err(oversized());
    }
    let len = u32::try_from(payload.len()).map_err(|_| oversized())?;
    let mut frame = Vec::with_capacity(PREFIX_LEN + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decodes a payload (without its length prefix).
///
/// # Errors
/// Returns [`FramingError::Malformed`] for invalid UTF-8 or JSON.
pub fn decode_frame(payload: &[u8]) -> Result<NativeMessage, FramingError> {
    serde_json::from_slice(payload).map_err(FramingError::Malformed)
}

fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
