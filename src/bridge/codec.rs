use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest message the browser accepts from a native host.
pub const MAX_OUTBOUND_FRAME: usize = 1024 * 1024;
/// Largest message the browser will send to a native host.
pub const MAX_INBOUND_FRAME: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reads one length-prefixed frame; `Ok(None)` once the peer has closed the stream.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }

    let size = u32::from_ne_bytes(header) as usize;
    if size > MAX_INBOUND_FRAME {
        return Err(FrameError::TooLarge {
            size,
            limit: MAX_INBOUND_FRAME,
        });
    }

    let mut payload = vec![0u8; size];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(message)?;
    if payload.len() > MAX_OUTBOUND_FRAME {
        return Err(FrameError::TooLarge {
            size: payload.len(),
            limit: MAX_OUTBOUND_FRAME,
        });
    }

    writer
        .write_all(&(payload.len() as u32).to_ne_bytes())
        .await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OutgoingMessage;

    #[tokio::test]
    async fn frames_round_trip_through_a_pipe() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        write_message(&mut client, &OutgoingMessage::Ack { success: true })
            .await
            .unwrap();
        drop(client);

        let frame = read_frame(&mut server).await.unwrap().unwrap();
        assert_eq!(frame, br#"{"success":true}"#);
        assert!(read_frame(&mut server).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversized_header_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client
            .write_all(&(MAX_INBOUND_FRAME as u32 + 1).to_ne_bytes())
            .await
            .unwrap();

        let err = read_frame(&mut server).await.unwrap_err();
        assert!(matches!(err, FrameError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn oversized_message_is_not_written() {
        let (mut client, _server) = tokio::io::duplex(64);
        let huge = "x".repeat(MAX_OUTBOUND_FRAME);
        let err = write_message(&mut client, &huge).await.unwrap_err();
        assert!(matches!(err, FrameError::TooLarge { .. }));
    }
}
