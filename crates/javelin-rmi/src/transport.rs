//! Synchronous call/return exchange over an open byte stream.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::constants::RETURN_DATA;
use crate::message::{CallMessage, ReturnMessage};
use crate::{Result, RmiError, SerialError};

/// Send a call and block until the peer's return message decodes, or until
/// the stream ends.
///
/// `Ok(None)` means no return message arrived — the stream closed, or the
/// peer answered with something other than RMI return data. That is a
/// statement about the connection, never about the remote method; a remote
/// exception still decodes as `Ok(Some(..))` with the exception code set.
///
/// One exchange per call; retries, timeouts, and cancellation belong to the
/// caller and the stream it supplies.
pub async fn exchange<S>(stream: &mut S, call: &CallMessage) -> Result<Option<ReturnMessage>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let encoded = call.encode();
    tracing::trace!(bytes = encoded.len(), hash = call.hash, "sending call");
    stream.write_all(&encoded).await?;
    stream.flush().await?;

    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            if buf.is_empty() {
                tracing::debug!("stream closed without a reply");
            } else {
                tracing::debug!(got = buf.len(), "stream closed mid-reply");
            }
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);

        if buf[0] != RETURN_DATA {
            tracing::debug!("peer did not answer with return data (first byte 0x{:02x})", buf[0]);
            return Ok(None);
        }
        match ReturnMessage::decode(&buf) {
            Ok(ret) => {
                tracing::trace!("received return (code 0x{:02x})", ret.code);
                return Ok(Some(ret));
            }
            Err(RmiError::Serial(SerialError::Truncated)) => continue,
            Err(err) => {
                tracing::debug!(%err, "malformed return message");
                return Ok(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{OPERATION_DISPATCH_BY_HASH, RETURN_NORMAL};
    use crate::message::{ObjId, Uid};
    use javelin_serial::Builder;
    use std::time::Duration;
    use tokio::io::duplex;

    fn test_call() -> CallMessage {
        CallMessage::new(
            ObjId::default(),
            OPERATION_DISPATCH_BY_HASH,
            crate::hash::registry_interface_hash(),
            vec![Builder::utf("jmxrmi")],
        )
    }

    fn test_return() -> ReturnMessage {
        ReturnMessage {
            code: RETURN_NORMAL,
            uid: Uid {
                number: 11,
                time: 22,
                count: 33,
            },
            value: vec![Builder::utf("ok")],
        }
    }

    #[tokio::test]
    async fn closed_before_any_reply_bytes_is_no_response() {
        let (mut client, mut server) = duplex(4096);
        let peer = tokio::spawn(async move {
            let mut sink = vec![0u8; 256];
            let _ = server.read(&mut sink).await;
            // Dropping the server half closes the stream with nothing sent.
        });
        let result = exchange(&mut client, &test_call()).await.unwrap();
        assert!(result.is_none());
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn non_rmi_reply_is_no_response() {
        let (mut client, mut server) = duplex(4096);
        let peer = tokio::spawn(async move {
            let mut sink = vec![0u8; 256];
            let _ = server.read(&mut sink).await.unwrap();
            server.write_all(b"HTTP/1.0 400 Bad Request\r\n").await.unwrap();
        });
        let result = exchange(&mut client, &test_call()).await.unwrap();
        assert!(result.is_none());
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn reply_split_across_writes_still_decodes() {
        let (mut client, mut server) = duplex(4096);
        let expected = test_return();
        let reply = expected.encode();
        let peer = tokio::spawn(async move {
            let mut sink = vec![0u8; 256];
            let _ = server.read(&mut sink).await.unwrap();
            let (head, tail) = reply.split_at(9);
            server.write_all(head).await.unwrap();
            server.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            server.write_all(tail).await.unwrap();
            // Keep the stream open until the client is done reading.
            tokio::time::sleep(Duration::from_millis(50)).await;
        });
        let result = exchange(&mut client, &test_call()).await.unwrap();
        assert_eq!(result, Some(expected));
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn truncated_then_closed_is_no_response() {
        let (mut client, mut server) = duplex(4096);
        let reply = test_return().encode();
        let peer = tokio::spawn(async move {
            let mut sink = vec![0u8; 256];
            let _ = server.read(&mut sink).await.unwrap();
            server.write_all(&reply[..6]).await.unwrap();
        });
        let result = exchange(&mut client, &test_call()).await.unwrap();
        assert!(result.is_none());
        peer.await.unwrap();
    }
}
