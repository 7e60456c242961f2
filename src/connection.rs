// ABOUTME: Frame based I/O for an SMPP session over any async byte stream
// ABOUTME: Buffers reads until a whole PDU is available and writes through a BufWriter

use crate::client::{SmppError, SmppResult};
use crate::codec::{CodecError, Frame};
use bytes::{Buf, BytesMut};
use std::io::Cursor;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};

/// SMPP transport over a byte stream (plain TCP or TLS).
///
/// The connection only moves PDUs. Session state, sequencing and the bind
/// handshake belong to the caller.
#[derive(Debug)]
pub struct Connection<S> {
    stream: BufWriter<S>,

    // The buffer for reading frames.
    buffer: BytesMut,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(socket: S) -> Connection<S> {
        Connection {
            stream: BufWriter::new(socket),
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Read a single `Frame` from the stream.
    ///
    /// Returns `None` when the peer closed the stream on a PDU boundary.
    /// Cancel safe: bytes already received stay buffered for the next call.
    pub async fn read_frame(&mut self) -> SmppResult<Option<Frame>> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                // A clean close leaves nothing half read behind
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(SmppError::ConnectionClosed);
            }
        }
    }

    fn parse_frame(&mut self) -> SmppResult<Option<Frame>> {
        let mut buf = Cursor::new(&self.buffer[..]);

        match Frame::check(&mut buf) {
            Ok(len) => {
                // The length is sound, so a bad body only costs this PDU
                let frame = Frame::parse(&mut buf);
                self.buffer.advance(len);
                Ok(Some(frame?))
            }
            Err(CodecError::Incomplete) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a single `Frame` and flush it to the stream.
    pub async fn write_frame(&mut self, frame: &Frame) -> SmppResult<()> {
        let bytes = frame.to_bytes()?;
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Shut down the write side of the stream.
    pub async fn shutdown(&mut self) -> SmppResult<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encodable;
    use crate::datatypes::{EnquireLink, SubmitSmResponse};
    use tokio::io::duplex;

    #[tokio::test]
    async fn reads_frames_split_across_writes() {
        let (client, mut server) = duplex(1024);
        let mut conn = Connection::new(client);

        let bytes = SubmitSmResponse::new(7, "abc").to_bytes().unwrap();
        server.write_all(&bytes[..5]).await.unwrap();

        let reader = tokio::spawn(async move {
            let frame = conn.read_frame().await.unwrap();
            (conn, frame)
        });

        tokio::task::yield_now().await;
        server.write_all(&bytes[5..]).await.unwrap();

        let (_conn, frame) = reader.await.unwrap();
        assert_eq!(
            frame,
            Some(Frame::SubmitSmResp(SubmitSmResponse::new(7, "abc")))
        );
    }

    #[tokio::test]
    async fn writes_and_reads_back() {
        let (client, server) = duplex(1024);
        let mut writer = Connection::new(client);
        let mut reader = Connection::new(server);

        writer
            .write_frame(&Frame::EnquireLink(EnquireLink::new(1)))
            .await
            .unwrap();
        writer
            .write_frame(&Frame::EnquireLink(EnquireLink::new(2)))
            .await
            .unwrap();

        assert_eq!(reader.read_frame().await.unwrap().unwrap().sequence_number(), 1);
        assert_eq!(reader.read_frame().await.unwrap().unwrap().sequence_number(), 2);
    }

    #[tokio::test]
    async fn clean_close_returns_none() {
        let (client, server) = duplex(64);
        let mut conn = Connection::new(client);
        drop(server);

        assert!(conn.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn close_mid_frame_is_an_error() {
        let (client, mut server) = duplex(64);
        let mut conn = Connection::new(client);

        server.write_all(&[0x00, 0x00, 0x00, 0x10, 0x00]).await.unwrap();
        drop(server);

        assert!(matches!(
            conn.read_frame().await,
            Err(SmppError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn oversized_length_is_rejected() {
        let (client, mut server) = duplex(64);
        let mut conn = Connection::new(client);

        server
            .write_all(&[0x7F, 0x00, 0x00, 0x00, 0, 0, 0, 0x15, 0, 0, 0, 0, 0, 0, 0, 1])
            .await
            .unwrap();

        assert!(matches!(conn.read_frame().await, Err(SmppError::Codec(_))));
    }
}
