use crate::{ProtocolError, Result, MAX_MESSAGE_SIZE};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// One request/response byte-stream over a TCP connection.
///
/// Frames are a 4-byte big-endian length prefix followed by exactly
/// that many bytes; zero-length frames are legal. The node side opens
/// a fresh connection per round trip, the server side wraps each
/// accepted stream.
pub struct Connection {
    framed: Framed<TcpStream, LengthDelimitedCodec>,
}

impl Connection {
    /// Wrap an already-connected stream (server accept path).
    pub fn new(stream: TcpStream) -> Self {
        let codec = LengthDelimitedCodec::builder()
            .max_frame_length(MAX_MESSAGE_SIZE)
            .new_codec();
        Connection {
            framed: Framed::new(stream, codec),
        }
    }

    /// Resolve and connect to a peer (node client path).
    pub async fn open<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(ProtocolError::Connect)?;
        Ok(Connection::new(stream))
    }

    /// Write one length-prefixed frame. Refuses frames the peer would
    /// reject as oversized.
    pub async fn send(&mut self, data: Vec<u8>) -> Result<()> {
        if data.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge(data.len()));
        }
        self.framed
            .send(Bytes::from(data))
            .await
            .map_err(ProtocolError::Write)
    }

    /// Read one length-prefixed frame. EOF before a complete frame is
    /// a read error, not an empty payload.
    pub async fn receive(&mut self) -> Result<Vec<u8>> {
        match self.framed.next().await {
            Some(Ok(frame)) => Ok(frame.to_vec()),
            Some(Err(e)) => Err(ProtocolError::Read(e)),
            None => Err(ProtocolError::Read(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed before a complete frame",
            ))),
        }
    }
}
