use std::net::SocketAddr;
use tokio::net::UdpSocket;
#[cfg(unix)]
use std::os::unix::io::AsRawFd;

use bytes::Bytes;
use tracing::trace;

use crate::error::{Error, Result};
use crate::protocol::packet::MAX_PACKET_SIZE;

/// Non-blocking datagram link to a single remote address
pub trait DatagramTransport {
    fn remote_addr(&self) -> SocketAddr;

    /// Send one datagram. Fails on oversize packets and I/O errors.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive one datagram if one is waiting, without blocking
    fn try_recv(&mut self) -> Result<Option<Bytes>>;
}

/// UDP transport over a tokio socket
pub struct UdpTransport {
    socket: UdpSocket,
    remote_addr: SocketAddr,
    buf: Vec<u8>,
}

impl UdpTransport {
    pub async fn bind(remote_addr: SocketAddr) -> Result<Self> {
        let bind_addr = match remote_addr {
            SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
            SocketAddr::V6(_) => SocketAddr::from(([0, 0, 0, 0, 0, 0, 0, 0], 0)),
        };
        Self::bind_with(remote_addr, bind_addr).await
    }

    pub async fn bind_with(remote_addr: SocketAddr, bind_addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(bind_addr).await?;

        // Multi-fragment updates arrive in bursts
        #[cfg(unix)]
        unsafe {
            let buf_size: libc::c_int = 1024 * 1024;
            libc::setsockopt(
                socket.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_RCVBUF,
                &buf_size as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            );
        }

        Ok(Self {
            socket,
            remote_addr,
            buf: vec![0u8; MAX_PACKET_SIZE],
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl DatagramTransport for UdpTransport {
    fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > MAX_PACKET_SIZE {
            return Err(Error::PacketTooLarge { len: data.len(), max: MAX_PACKET_SIZE });
        }
        self.socket.try_send_to(data, self.remote_addr)?;
        Ok(())
    }

    fn try_recv(&mut self) -> Result<Option<Bytes>> {
        loop {
            match self.socket.try_recv_from(&mut self.buf) {
                Ok((len, from)) if from == self.remote_addr => {
                    return Ok(Some(Bytes::copy_from_slice(&self.buf[..len])));
                }
                Ok((len, from)) => {
                    trace!(%from, len, "dropping datagram from unexpected peer");
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// In-memory transport: tests push inbound datagrams and inspect
    /// what the client sent.
    #[derive(Clone, Default)]
    pub struct MemoryTransport {
        pub inbound: Arc<Mutex<VecDeque<Vec<u8>>>>,
        pub outbound: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl MemoryTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn deliver(&self, packet: Vec<u8>) {
            self.inbound.lock().unwrap().push_back(packet);
        }

        pub fn sent(&self) -> Vec<Vec<u8>> {
            self.outbound.lock().unwrap().clone()
        }

        pub fn take_sent(&self) -> Vec<Vec<u8>> {
            std::mem::take(&mut *self.outbound.lock().unwrap())
        }
    }

    impl DatagramTransport for MemoryTransport {
        fn remote_addr(&self) -> SocketAddr {
            SocketAddr::from(([127, 0, 0, 1], 27015))
        }

        fn send(&mut self, data: &[u8]) -> Result<()> {
            if data.len() > MAX_PACKET_SIZE {
                return Err(Error::PacketTooLarge { len: data.len(), max: MAX_PACKET_SIZE });
            }
            self.outbound.lock().unwrap().push(data.to_vec());
            Ok(())
        }

        fn try_recv(&mut self) -> Result<Option<Bytes>> {
            Ok(self.inbound.lock().unwrap().pop_front().map(Bytes::from))
        }
    }
}
