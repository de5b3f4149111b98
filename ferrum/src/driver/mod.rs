//! Drives a [`Connection`] over a tokio transport

use std::io;

use bytes::BytesMut;
use futures_util::StreamExt;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    time::Instant,
};
use tracing::{debug, trace};

use crate::{connection::ConnectionState, event::Event, Connection};

mod heartbeat;

pub use heartbeat::HeartBeat;

const READ_BUFFER_SIZE: usize = 16 * 1024;

enum Wake {
    Read(io::Result<usize>),
    Heartbeat,
    IdleTimeout,
}

/// Pumps bytes between a transport and a [`Connection`]
///
/// Reads are fed to [`Connection::process`], the outgoing buffer is written after every
/// input. Empty frames are sent at half the peer's idle timeout and the connection is closed
/// when nothing arrives within the local one.
#[derive(Debug)]
pub struct Driver<Io> {
    io: Io,
    connection: Connection,
    buf: BytesMut,
    heartbeat: HeartBeat,
    idle_deadline: Option<Instant>,
}

impl<Io> Driver<Io>
where
    Io: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a driver
    pub fn new(io: Io, connection: Connection) -> Self {
        let idle_deadline = connection.local_idle_timeout().map(|t| Instant::now() + t);
        Self {
            io,
            connection,
            buf: BytesMut::with_capacity(READ_BUFFER_SIZE),
            heartbeat: HeartBeat::never(),
            idle_deadline,
        }
    }

    /// The connection
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// The connection, for API calls. Their frames are written by the next
    /// [`flush`](Self::flush) or [`next_events`](Self::next_events)
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    /// Write everything the connection has buffered
    pub async fn flush(&mut self) -> io::Result<()> {
        let bytes = self.connection.take_outgoing();
        if !bytes.is_empty() {
            trace!(len = bytes.len(), "write");
            self.io.write_all(&bytes).await?;
        }
        self.io.flush().await
    }

    fn update_heartbeat(&mut self) {
        if self.heartbeat.period().is_some() {
            return;
        }
        if let Some(timeout) = self.connection.remote_idle_timeout() {
            let period = timeout / 2;
            debug!(?period, "heartbeat");
            self.heartbeat = HeartBeat::new(period);
        }
    }

    /// Wait until the connection produces events
    ///
    /// Returns an empty list once the connection has ended and the transport is closed.
    pub async fn next_events(&mut self) -> io::Result<Vec<Event>> {
        loop {
            self.flush().await?;
            let pending = self.connection.drain_events();
            if !pending.is_empty() {
                return Ok(pending);
            }
            if self.connection.state() == ConnectionState::End {
                return Ok(Vec::new());
            }
            self.update_heartbeat();
            self.buf.reserve(READ_BUFFER_SIZE);

            let wake = tokio::select! {
                read = self.io.read_buf(&mut self.buf) => Wake::Read(read),
                Some(_) = self.heartbeat.next() => Wake::Heartbeat,
                _ = expire(self.idle_deadline) => Wake::IdleTimeout,
            };

            match wake {
                Wake::Read(read) => {
                    let n = read?;
                    if n == 0 {
                        return match self.connection.state() {
                            ConnectionState::End => Ok(self.connection.drain_events()),
                            _ => Err(io::ErrorKind::UnexpectedEof.into()),
                        };
                    }
                    trace!(len = n, "read");
                    let events = self.connection.process(&self.buf.split()[..]);
                    if let Some(timeout) = self.connection.local_idle_timeout() {
                        self.idle_deadline = Some(Instant::now() + timeout);
                    }
                    if !events.is_empty() {
                        self.flush().await?;
                        return Ok(events);
                    }
                }
                Wake::Heartbeat => {
                    if let Err(err) = self.connection.send_heartbeat() {
                        debug!(%err, "heartbeat not sent");
                        self.heartbeat = HeartBeat::never();
                    }
                }
                Wake::IdleTimeout => {
                    self.idle_deadline = None;
                    self.connection.idle_timeout_elapsed();
                }
            }
        }
    }

    /// Take back the transport and the connection
    pub fn into_inner(self) -> (Io, Connection) {
        (self.io, self.connection)
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::io::Builder;

    use super::Driver;
    use crate::{connection::ConnectionState, event::Event, Connection};

    fn connection(id: &str) -> Connection {
        Connection::builder().container_id(id).build().unwrap()
    }

    fn opened_bytes(id: &str) -> bytes::Bytes {
        let mut conn = connection(id);
        conn.open().unwrap();
        conn.take_outgoing()
    }

    #[tokio::test]
    async fn open_handshake_over_mock_io() {
        let ours = opened_bytes("client");
        let theirs = opened_bytes("server");
        let mock = Builder::new().write(&ours).read(&theirs).build();

        let mut client = connection("client");
        client.open().unwrap();
        let mut driver = Driver::new(mock, client);

        let events = driver.next_events().await.unwrap();
        assert!(matches!(&events[..], [Event::Opened { remote }] if remote.container_id == "server"));
        assert_eq!(driver.connection().state(), ConnectionState::Opened);
    }

    #[tokio::test]
    async fn unexpected_eof() {
        let ours = opened_bytes("client");
        let mock = Builder::new().write(&ours).build();

        let mut client = connection("client");
        client.open().unwrap();
        let mut driver = Driver::new(mock, client);
        let err = driver.next_events().await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
