//! NULL-terminated frame codec (spec.md §4.1).
//!
//! Every request and response on the wire is a finite byte sequence
//! terminated by a single `0x00` byte. The terminator is never part of
//! the payload.

use kvd_domain::error::{Error, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const CHUNK: usize = 4096;

/// Read one frame from `reader`. Fails with [`Error::Frame`] if the peer
/// closes before a NULL byte is seen, or if the accumulated payload
/// exceeds `ceiling` bytes.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R, ceiling: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; CHUNK];
    loop {
        let n = reader.read(&mut chunk).await.map_err(Error::Io)?;
        if n == 0 {
            return Err(Error::Frame(
                "peer closed connection before NULL terminator".into(),
            ));
        }
        if let Some(pos) = chunk[..n].iter().position(|&b| b == 0) {
            buf.extend_from_slice(&chunk[..pos]);
            // Some clients double-terminate; strip a trailing NULL if present.
            if buf.last() == Some(&0) {
                buf.pop();
            }
            return Ok(buf);
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > ceiling {
            return Err(Error::Frame(format!(
                "frame exceeds ceiling of {ceiling} bytes"
            )));
        }
    }
}

/// Write one frame: `payload` followed by a single NULL byte.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    writer.write_all(payload).await.map_err(Error::Io)?;
    writer.write_all(&[0u8]).await.map_err(Error::Io)?;
    writer.flush().await.map_err(Error::Io)?;
    Ok(())
}
