use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::protocol::{PacketId, ReceivedMessage, WriteMessage};
use crate::{OpenRgbError, OpenRgbResult};

/// Magic bytes opening every frame on the wire.
pub(crate) const MAGIC: [u8; 4] = *b"ORGB";

/// Frame header length: magic + device id + packet id + data size.
const HEADER_LEN: usize = 16;

/// One framed message received from a client.
///
/// `packet_id` is kept raw: unknown ids are dispatched (and skipped) by the
/// session rather than rejected at the framing layer.
#[derive(Debug)]
pub(crate) struct Frame {
    pub device_id: u32,
    pub packet_id: u32,
    pub data: Vec<u8>,
}

/// Reads one frame, enforcing the magic, a per-recv timeout and a payload
/// size ceiling.
///
/// Returns `Ok(None)` when the peer went away: clean EOF, a short read or a
/// recv timeout all end the session without an error. A magic mismatch or an
/// oversize frame is a protocol violation and terminates the connection.
pub(crate) async fn read_frame<R>(
    stream: &mut R,
    recv_timeout: Duration,
    max_data_size: u32,
) -> OpenRgbResult<Option<Frame>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    match timeout(recv_timeout, stream.read_exact(&mut header)).await {
        Err(_elapsed) => return Ok(None),
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Ok(Err(e)) => return Err(e.into()),
        Ok(Ok(_)) => {}
    }

    // header layout is constant across protocol versions
    let mut msg = ReceivedMessage::new(&header, 0);
    let magic: [u8; 4] = msg.read_value()?;
    if magic != MAGIC {
        return Err(OpenRgbError::Protocol(format!(
            "expected OpenRGB magic value, got {magic:?}"
        )));
    }
    let device_id = msg.read_u32()?;
    let packet_id = msg.read_u32()?;
    let data_size = msg.read_u32()?;
    if data_size > max_data_size {
        return Err(OpenRgbError::Protocol(format!(
            "frame data size {data_size} exceeds ceiling {max_data_size}"
        )));
    }

    let mut data = vec![0u8; data_size as usize];
    if data_size > 0 {
        match timeout(recv_timeout, stream.read_exact(&mut data)).await {
            Err(_elapsed) => return Ok(None),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(_)) => {}
        }
    }

    Ok(Some(Frame {
        device_id,
        packet_id,
        data,
    }))
}

/// Writes one frame. The header and payload go out as a single buffer, so a
/// frame's bytes are never interleaved with another frame on the same socket
/// as long as the caller holds the per-client writer lock.
pub(crate) async fn write_frame<W>(
    stream: &mut W,
    device_id: u32,
    packet_id: PacketId,
    data: &[u8],
) -> OpenRgbResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = WriteMessage::with_capacity(0, HEADER_LEN + data.len());
    buf.write_slice(&MAGIC);
    buf.write_u32(device_id);
    buf.write_value(&packet_id)?;
    buf.write_u32(data.len() as u32);
    buf.write_slice(data);

    tracing::trace!("Writing frame: {}", buf);
    stream.write_all(buf.bytes()).await?;
    Ok(())
}
