//! Async frame I/O over any byte stream.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::codec::{Request, Response, HEADER_SIZE, OP_WRITE, RESPONSE_HEADER_SIZE};
use crate::error::{ProtoError, Result};

/// Read one request. Returns `Ok(None)` when the peer closed the stream
/// before starting a new frame.
///
/// A write whose payload exceeds the size limit is skipped on the stream
/// and returned with an empty payload, which the device rejects as an
/// invalid argument. The connection stays usable.
pub async fn read_request<R>(reader: &mut R) -> Result<Option<Request>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_SIZE];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let (opcode, len) = match Request::parse_header(&header) {
        Ok(parsed) => parsed,
        Err(ProtoError::PayloadTooLarge { len, .. }) if header[1] == OP_WRITE => {
            skip_payload(reader, len).await?;
            return Ok(Some(Request::Write { payload: Vec::new() }));
        }
        Err(e) => return Err(e),
    };
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Request::from_parts(opcode, payload).map(Some)
}

/// Discard exactly `len` bytes so the next frame starts where expected.
async fn skip_payload<R>(reader: &mut R, len: usize) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut limited = (&mut *reader).take(len as u64);
    let skipped = tokio::io::copy(&mut limited, &mut tokio::io::sink()).await?;
    if skipped < len as u64 {
        return Err(ProtoError::Truncated {
            needed: len,
            available: skipped as usize,
        });
    }
    debug!(len, "oversized write payload discarded");
    Ok(())
}

pub async fn write_request<W>(writer: &mut W, request: &Request) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&request.encode()).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_response<R>(reader: &mut R) -> Result<Response>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; RESPONSE_HEADER_SIZE];
    reader.read_exact(&mut header).await?;
    let (status, len) = Response::parse_header(&header)?;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Response::from_parts(status, payload)
}

pub async fn write_response<W>(writer: &mut W, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&response.encode()).await?;
    writer.flush().await?;
    Ok(())
}
