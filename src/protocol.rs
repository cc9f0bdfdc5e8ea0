use crate::config::MAX_FRAME_BYTES;
use crate::errors::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Reads one newline-terminated JSON frame. `Ok(None)` means the peer closed
/// the stream cleanly between frames.
pub async fn read_frame<T, R>(reader: &mut R) -> AppResult<Option<T>>
where
    T: DeserializeOwned,
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = reader
        .take(MAX_FRAME_BYTES as u64 + 1)
        .read_line(&mut line)
        .await?;
    if read == 0 {
        return Ok(None);
    }
    if line.len() > MAX_FRAME_BYTES {
        return Err(AppError::Protocol(format!(
            "frame exceeds {} bytes",
            MAX_FRAME_BYTES
        )));
    }
    if !line.ends_with('\n') {
        return Err(AppError::SessionEnded("stream closed mid-frame".to_string()));
    }

    let frame = serde_json::from_str(line.trim_end())?;
    Ok(Some(frame))
}

pub async fn write_frame<T, W>(writer: &mut W, frame: &T) -> AppResult<()>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let mut bytes = serde_json::to_vec(frame)?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{read_frame, write_frame};
    use crate::errors::AppError;
    use crate::models::Request;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn frames_are_newline_delimited() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &Request::List).await.expect("write list");
        write_frame(
            &mut buffer,
            &Request::Pin {
                selector: "last".to_string(),
            },
        )
        .await
        .expect("write pin");
        assert_eq!(buffer.iter().filter(|byte| **byte == b'\n').count(), 2);

        let mut reader = BufReader::new(buffer.as_slice());
        let first: Option<Request> = read_frame(&mut reader).await.expect("first frame");
        let second: Option<Request> = read_frame(&mut reader).await.expect("second frame");
        let end: Option<Request> = read_frame(&mut reader).await.expect("eof");
        assert_eq!(first, Some(Request::List));
        assert!(matches!(second, Some(Request::Pin { ref selector }) if selector == "last"));
        assert!(end.is_none());
    }

    #[tokio::test]
    async fn truncated_frame_means_session_ended() {
        let mut reader = BufReader::new(&b"{\"op\":\"li"[..]);
        let result: Result<Option<Request>, _> = read_frame(&mut reader).await;
        assert!(matches!(result, Err(AppError::SessionEnded(_))));
    }

    #[tokio::test]
    async fn garbage_frame_is_protocol_error() {
        let mut reader = BufReader::new(&b"not json\n"[..]);
        let result: Result<Option<Request>, _> = read_frame(&mut reader).await;
        assert!(matches!(result, Err(AppError::Protocol(_))));
    }
}
