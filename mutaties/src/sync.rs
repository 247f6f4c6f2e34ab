//! Background sync: wake up a worker process over UDP.
//!
//! Producers call [`BackgroundSync::ping`] after writing a mutation. The worker
//! sits in [`PingReceiver::wait_for_ping`] between polls of its queue table; a ping
//! cuts that wait short. Pings carry no data and are not acknowledged. If the worker
//! isn't running, the datagram is simply lost and the worker will find the mutation
//! on its next start.
//!
//! Both sides are plain values, created at startup and passed to whoever needs them.
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::{lookup_host, ToSocketAddrs, UdpSocket};
use tokio::sync::OnceCell;
use tokio::time::timeout;
use tracing::debug;

use crate::config::Config;
use crate::queue::Queue;

const PING: &[u8] = b"ping";

#[derive(Error, Debug)]
pub enum Error {
    #[error("background sync: {0}")]
    Io(#[from] std::io::Error),

    #[error("background sync: no address for \"{0}\"")]
    NoAddress(String),
}

/// Sending side of the background sync.
#[derive(Debug)]
pub struct BackgroundSync {
    addr: SocketAddr,
    socket: OnceCell<UdpSocket>,
}

impl BackgroundSync {
    /// Ping the worker listening on this address.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            socket: OnceCell::new(),
        }
    }

    /// Ping the worker of this queue, as configured.
    pub async fn for_queue(queue: Queue, config: &Config) -> Result<Self, Error> {
        Ok(Self::new(resolve(queue.sync_addr(config)).await?))
    }

    /// Where the pings go.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Tell the worker there may be new work. Returns as soon as the datagram is handed
    /// to the OS; nobody is waiting for an answer.
    pub async fn ping(&self) -> Result<(), Error> {
        let socket = self
            .socket
            .get_or_try_init(|| async {
                let local: SocketAddr = if self.addr.is_ipv4() {
                    ([0, 0, 0, 0], 0).into()
                } else {
                    ([0u16; 8], 0).into()
                };
                UdpSocket::bind(local).await
            })
            .await?;

        socket.send_to(PING, self.addr).await?;
        debug!("ping sent to {}", self.addr);

        Ok(())
    }
}

/// Receiving side of the background sync, owned by the worker.
#[derive(Debug)]
pub struct PingReceiver {
    socket: UdpSocket,
}

impl PingReceiver {
    /// Listen for pings on this address.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, Error> {
        Ok(Self {
            socket: UdpSocket::bind(addr).await?,
        })
    }

    /// Listen for pings meant for the worker of this queue.
    pub async fn for_queue(queue: Queue, config: &Config) -> Result<Self, Error> {
        Self::bind(queue.sync_addr(config)).await
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.socket.local_addr()?)
    }

    /// Wait at most `duration` for a ping. Returns `true` if one arrived.
    ///
    /// Pings that queued up behind the first one are consumed as well, so a burst
    /// of producers wakes the worker once.
    pub async fn wait_for_ping(&self, duration: Duration) -> Result<bool, Error> {
        let mut buf = [0u8; 64];

        match timeout(duration, self.socket.recv_from(&mut buf)).await {
            Ok(result) => {
                let (_, peer) = result?;
                debug!("ping received from {}", peer);
            }
            Err(_) => return Ok(false),
        }

        let mut drained = 0;
        loop {
            match self.socket.try_recv_from(&mut buf) {
                Ok(_) => drained += 1,
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(err) => return Err(err.into()),
            }
        }

        if drained > 0 {
            debug!("{} extra pings drained", drained);
        }

        Ok(true)
    }
}

async fn resolve(addr: String) -> Result<SocketAddr, Error> {
    let found = lookup_host(addr.as_str()).await?.next();
    found.ok_or(Error::NoAddress(addr))
}
