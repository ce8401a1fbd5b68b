use super::router::ZoneRouter;
use super::transport::tcp::{read_with_length_prefix, send_with_length_prefix};
use fakedns_domain::{FakeDnsError, Transport};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const MAX_UDP_MESSAGE_SIZE: usize = 4096;
const TCP_BACKLOG: i32 = 128;

/// Stream connections with no complete message for this long are closed.
pub const TCP_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

enum BoundSocket {
    Udp(UdpSocket),
    Tcp(TcpListener),
}

/// One bound socket for one transport, served by its own task.
pub struct TransportListener {
    transport: Transport,
    local_addr: SocketAddr,
    socket: BoundSocket,
}

impl TransportListener {
    /// Binds without address or port sharing, so an occupied port fails here.
    /// Must be called from within a tokio runtime.
    pub fn bind(transport: Transport, addr: SocketAddr) -> Result<Self, FakeDnsError> {
        let socket = match transport {
            Transport::Udp => create_udp_socket(addr).map(BoundSocket::Udp),
            Transport::Tcp => create_tcp_listener(addr).map(BoundSocket::Tcp),
        }
        .map_err(|e| FakeDnsError::bind(transport, addr, e))?;

        let local_addr = match &socket {
            BoundSocket::Udp(socket) => socket.local_addr(),
            BoundSocket::Tcp(listener) => listener.local_addr(),
        }
        .map_err(|e| FakeDnsError::bind(transport, addr, e))?;

        info!(protocol = %transport, bind_address = %local_addr, "Listener bound");

        Ok(Self {
            transport,
            local_addr,
            socket,
        })
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawns the serve loop. The loop ends without error once `done` fires;
    /// a socket failure is sent on `errors` and fires `done` for the siblings.
    pub fn serve(
        self,
        router: Arc<ZoneRouter>,
        done: CancellationToken,
        errors: UnboundedSender<FakeDnsError>,
    ) -> JoinHandle<()> {
        let transport = self.transport;
        let local_addr = self.local_addr;

        tokio::spawn(async move {
            let result = match self.socket {
                BoundSocket::Udp(socket) => serve_udp(socket, router, &done).await,
                BoundSocket::Tcp(listener) => serve_tcp(listener, router, &done).await,
            };

            match result {
                Ok(()) => debug!(protocol = %transport, bind_address = %local_addr, "Listener stopped"),
                Err(e) => {
                    error!(protocol = %transport, bind_address = %local_addr, error = %e, "Listener failed");
                    let _ = errors.send(FakeDnsError::socket_io(transport, e));
                    done.cancel();
                }
            }
        })
    }
}

async fn serve_udp(
    socket: UdpSocket,
    router: Arc<ZoneRouter>,
    done: &CancellationToken,
) -> io::Result<()> {
    let mut recv_buf = [0u8; MAX_UDP_MESSAGE_SIZE];

    loop {
        let received = tokio::select! {
            _ = done.cancelled() => return Ok(()),
            received = socket.recv_from(&mut recv_buf) => received,
        };

        let (n, peer) = match received {
            Ok(received) => received,
            Err(e) if is_transient(&e) => {
                debug!(error = %e, "Transient UDP receive error");
                continue;
            }
            Err(e) => return Err(e),
        };

        if let Some(reply) = router.dispatch(&recv_buf[..n], peer, Transport::Udp) {
            if let Err(e) = socket.send_to(&reply, peer).await {
                warn!(client = %peer, error = %e, "Failed to send UDP reply");
            }
        }
    }
}

async fn serve_tcp(
    listener: TcpListener,
    router: Arc<ZoneRouter>,
    done: &CancellationToken,
) -> io::Result<()> {
    let mut connections = JoinSet::new();

    let result = loop {
        tokio::select! {
            _ = done.cancelled() => break Ok(()),
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    connections.spawn(serve_connection(stream, peer, router.clone(), done.clone()));
                }
                Err(e) if is_transient(&e) => {
                    debug!(error = %e, "Transient TCP accept error");
                }
                Err(e) => break Err(e),
            },
        }
    };

    drop(listener);
    connections.shutdown().await;
    result
}

async fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    router: Arc<ZoneRouter>,
    done: CancellationToken,
) {
    loop {
        let read = tokio::select! {
            _ = done.cancelled() => break,
            read = tokio::time::timeout(TCP_IDLE_TIMEOUT, read_with_length_prefix(&mut stream)) => read,
        };

        let message = match read {
            Ok(Ok(message)) => message,
            Ok(Err(e)) => {
                if e.kind() != io::ErrorKind::UnexpectedEof {
                    debug!(client = %peer, error = %e, "TCP read failed");
                }
                break;
            }
            Err(_) => {
                debug!(client = %peer, "TCP connection idle, closing");
                break;
            }
        };

        let Some(reply) = router.dispatch(&message, peer, Transport::Tcp) else {
            continue;
        };

        if let Err(e) = send_with_length_prefix(&mut stream, &reply).await {
            debug!(client = %peer, error = %e, "Failed to send TCP reply");
            break;
        }
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

fn create_udp_socket(socket_addr: SocketAddr) -> io::Result<UdpSocket> {
    let socket = Socket::new(
        Domain::for_address(socket_addr),
        Type::DGRAM,
        Some(Protocol::UDP),
    )?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.bind(&socket_addr.into())?;
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket.into())
}

fn create_tcp_listener(socket_addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(
        Domain::for_address(socket_addr),
        Type::STREAM,
        Some(Protocol::TCP),
    )?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    // Rebinding must work while closed connections linger in TIME_WAIT.
    #[cfg(unix)]
    socket.set_reuse_address(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(TCP_BACKLOG)?;
    socket.set_nonblocking(true)?;
    TcpListener::from_std(socket.into())
}
