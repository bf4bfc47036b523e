use std::collections::VecDeque;
use std::net::SocketAddr;

use oonf_core::rate_limit::{Admission, RateLimiter};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::error::SocketError;

/// One open UDP socket plus its outgoing backlog (spec.md §4.2): `send`
/// tries an immediate non-blocking write; on `WouldBlock`/`Interrupted` the
/// datagram is queued and the caller is told to watch for writability;
/// `PermissionDenied` is rate-limited rather than logged per-packet.
pub struct ManagedSocket {
    socket: UdpSocket,
    backlog: VecDeque<(SocketAddr, Vec<u8>)>,
    write_ready_wanted: bool,
    eperm_limiter: RateLimiter,
}

/// What the caller should do after a `send`/`drain_backlog` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Backlogged,
    PermissionDenied,
}

impl ManagedSocket {
    pub fn new(socket: UdpSocket) -> Self {
        Self {
            socket,
            backlog: VecDeque::new(),
            write_ready_wanted: false,
            eperm_limiter: RateLimiter::per_minute(10),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn wants_write_ready(&self) -> bool {
        self.write_ready_wanted
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Attempts an immediate send; on EAGAIN/EINTR the datagram joins the
    /// backlog and write-readiness is armed instead of being retried inline.
    pub fn send(&mut self, dest: SocketAddr, bytes: &[u8], now_ms: u64) -> Result<SendOutcome, SocketError> {
        if !self.backlog.is_empty() {
            self.backlog.push_back((dest, bytes.to_vec()));
            self.write_ready_wanted = true;
            return Ok(SendOutcome::Backlogged);
        }

        match self.socket.try_send_to(bytes, dest) {
            Ok(_) => Ok(SendOutcome::Sent),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::Interrupted => {
                self.backlog.push_back((dest, bytes.to_vec()));
                self.write_ready_wanted = true;
                Ok(SendOutcome::Backlogged)
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                match self.eperm_limiter.record(now_ms) {
                    Admission::Admit { .. } => warn!(%dest, "EPERM sending datagram"),
                    Admission::SummarizeThenAdmit { suppressed } => {
                        warn!(%dest, suppressed, "EPERM sending datagram (plus suppressed events)")
                    }
                    Admission::Suppress => {}
                }
                Ok(SendOutcome::PermissionDenied)
            }
            Err(e) => Err(SocketError::Io(e)),
        }
    }

    /// Drains as much of the backlog as the socket accepts without
    /// blocking; called when the scheduler observes write-readiness.
    pub fn drain_backlog(&mut self) -> Result<(), SocketError> {
        while let Some((dest, bytes)) = self.backlog.front() {
            match self.socket.try_send_to(bytes, *dest) {
                Ok(_) => {
                    self.backlog.pop_front();
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    debug!(%dest, error = %e, "dropping backlogged datagram after send failure");
                    self.backlog.pop_front();
                }
            }
        }
        self.write_ready_wanted = !self.backlog.is_empty();
        Ok(())
    }

    pub async fn readable(&self) -> std::io::Result<()> {
        self.socket.readable().await
    }

    pub async fn writable(&self) -> std::io::Result<()> {
        self.socket.writable().await
    }

    pub fn try_recv(&self, buf: &mut [u8]) -> std::io::Result<(usize, SocketAddr)> {
        self.socket.try_recv_from(buf)
    }

    pub fn into_inner(self) -> UdpSocket {
        self.socket
    }
}
