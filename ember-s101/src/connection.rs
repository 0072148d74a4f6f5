//! S101 over a tokio byte stream

use crate::config::S101Config;
use crate::error::EmberResult;
use crate::session::{S101Session, SessionEvent};
use crate::statistics::S101Statistics;
use bytes::Bytes;
use std::collections::VecDeque;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const READ_BUFFER_SIZE: usize = 4096;

/// S101 session bound to a stream such as a `TcpStream`
///
/// Keep-alive requests from the peer are answered while waiting for
/// messages; provider state changes and rejected frames are logged.
pub struct S101Connection<S> {
    stream: S,
    session: S101Session,
    received: VecDeque<Bytes>,
    buffer: Box<[u8]>,
    closed: bool,
}

impl<S: AsyncRead + AsyncWrite + Unpin> S101Connection<S> {
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, S101Config::default())
    }

    pub fn with_config(stream: S, config: S101Config) -> Self {
        log::info!("S101 connection opened on slot {}", config.slot);
        Self {
            stream,
            session: S101Session::new(config),
            received: VecDeque::new(),
            buffer: vec![0u8; READ_BUFFER_SIZE].into_boxed_slice(),
            closed: false,
        }
    }

    pub fn statistics(&self) -> &S101Statistics {
        self.session.statistics()
    }

    /// Next complete EmBER message, or `None` once the peer closed the stream
    pub async fn recv(&mut self) -> EmberResult<Option<Bytes>> {
        loop {
            if let Some(message) = self.received.pop_front() {
                return Ok(Some(message));
            }
            if self.closed {
                return Ok(None);
            }

            let n = self.stream.read(&mut self.buffer).await?;
            if n == 0 {
                log::info!("S101 connection closed by peer");
                self.closed = true;
                continue;
            }

            let events = self.session.feed(&self.buffer[..n]);
            for event in events {
                match event {
                    SessionEvent::Message { payload, .. } => self.received.push_back(payload),
                    SessionEvent::KeepAliveResponse { slot } => {
                        log::debug!("Keep-alive response on slot {}", slot)
                    }
                    SessionEvent::ProviderState { slot, state } => {
                        log::info!("Provider state {} on slot {}", state, slot)
                    }
                    // Already logged by the session
                    SessionEvent::Fault(_) => {}
                }
            }
            self.flush().await?;
        }
    }

    /// Frame and send one message
    pub async fn send(&mut self, payload: impl Into<Bytes>) -> EmberResult<()> {
        self.session.encode_message(payload)?;
        self.flush().await
    }

    pub async fn send_keep_alive(&mut self) -> EmberResult<()> {
        self.session.keep_alive_request()?;
        self.flush().await
    }

    pub async fn send_provider_state(&mut self, state: u8) -> EmberResult<()> {
        self.session.provider_state(state)?;
        self.flush().await
    }

    async fn flush(&mut self) -> EmberResult<()> {
        if self.session.has_outbound() {
            let bytes = self.session.take_outbound();
            self.stream.write_all(&bytes).await?;
            self.stream.flush().await?;
        }
        Ok(())
    }

    /// Shut down the write side and return the stream
    pub async fn close(mut self) -> EmberResult<S> {
        self.flush().await?;
        self.stream.shutdown().await?;
        log::info!("S101 connection closed");
        Ok(self.stream)
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::S101Encoder;
    use crate::frame::S101Frame;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_send_recv() {
        let (a, b) = duplex(256);
        let mut left = S101Connection::with_config(a, S101Config::default().with_max_payload_per_frame(16));
        let mut right = S101Connection::new(b);

        let payload: Vec<u8> = (0u8..100).collect();
        left.send(payload.clone()).await.unwrap();
        let received = right.recv().await.unwrap().unwrap();
        assert_eq!(&received[..], &payload[..]);
    }

    #[tokio::test]
    async fn test_keep_alive_answered() {
        let (a, mut b) = duplex(256);
        let mut connection = S101Connection::new(a);

        let request = S101Encoder::encode(&S101Frame::keep_alive_request(0)).unwrap();
        let message = S101Frame::ember_packet(
            0,
            crate::frame::PackageFlags::SINGLE,
            crate::frame::Dtd::Glow,
            &[],
            Bytes::from_static(b"tree"),
        );
        b.write_all(&request).await.unwrap();
        b.write_all(&S101Encoder::encode(&message).unwrap()).await.unwrap();

        let received = connection.recv().await.unwrap().unwrap();
        assert_eq!(&received[..], b"tree");
        assert_eq!(connection.statistics().keep_alives_answered, 1);

        let mut reply = vec![0u8; 32];
        let n = b.read(&mut reply).await.unwrap();
        let mut peer = S101Session::default();
        let events = peer.feed(&reply[..n]);
        assert!(matches!(events[..], [SessionEvent::KeepAliveResponse { slot: 0 }]));
    }

    #[tokio::test]
    async fn test_recv_after_close() {
        let (a, b) = duplex(64);
        let mut connection = S101Connection::new(a);
        drop(b);
        assert!(connection.recv().await.unwrap().is_none());
    }
}
