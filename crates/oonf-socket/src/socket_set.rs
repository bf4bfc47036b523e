use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use oonf_core::netaddr::AddressFamily;
use oonf_rfc5444::TargetId;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket as TokioUdpSocket;
use tracing::{debug, info, warn};

use futures::future::BoxFuture;

use crate::config::SocketConfig;
use crate::error::SocketError;
use crate::managed_socket::{ManagedSocket, SendOutcome};

fn target_id(ifname: &str, suffix: &str) -> TargetId {
    format!("{ifname}/{suffix}")
}

/// Every socket `SocketSet` owns for one interface: a unicast socket and a
/// multicast-joined socket, per family, matching spec.md §4.2's "managed
/// UDP sockets bound per interface".
struct InterfaceSockets {
    unicast: Option<ManagedSocket>,
    multicast: Option<ManagedSocket>,
    config: SocketConfig,
}

/// Owns every open socket in the daemon, keyed by interface name and
/// family. `send` is the only entry point `oonf-rfc5444`'s fabric needs;
/// everything else (ACL, bind selection, teardown/reopen) happens inside
/// `apply_config`.
pub struct SocketSet {
    by_iface: HashMap<(String, AddressFamily), InterfaceSockets>,
}

impl Default for SocketSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SocketSet {
    pub fn new() -> Self {
        Self {
            by_iface: HashMap::new(),
        }
    }

    /// (Re)applies `config` for `ifname`/`family`. If the interface is
    /// down or no candidate address satisfies the bind ACL, any existing
    /// sockets are torn down and nothing is reopened; this is re-evaluated
    /// every time the interface's up/down or address state changes.
    pub fn apply_config(
        &mut self,
        ifname: &str,
        family: AddressFamily,
        config: SocketConfig,
        iface_up: bool,
        candidate_addrs: &[IpAddr],
    ) -> Result<(), SocketError> {
        let key = (ifname.to_string(), family);

        let bind_addr = iface_up.then(|| config.bind_acl.select(candidate_addrs)).flatten();
        let Some(bind_addr) = bind_addr else {
            if self.by_iface.remove(&key).is_some() {
                info!(ifname, ?family, "tearing down sockets: interface down or no bindable address");
            }
            return Ok(());
        };

        let unicast = open_unicast(family, bind_addr, config.unicast_port, &config)?;
        let multicast = open_multicast(family, bind_addr, config.multicast_port, &config)?;

        self.by_iface.insert(
            key,
            InterfaceSockets {
                unicast: Some(ManagedSocket::new(unicast)),
                multicast: Some(ManagedSocket::new(multicast)),
                config,
            },
        );
        debug!(ifname, ?family, %bind_addr, "socket (re)opened");
        Ok(())
    }

    pub fn close_interface(&mut self, ifname: &str) {
        self.by_iface.retain(|(name, _), _| name != ifname);
    }

    fn managed_mut(&mut self, ifname: &str, family: AddressFamily, multicast: bool) -> Option<&mut ManagedSocket> {
        let iface = self.by_iface.get_mut(&(ifname.to_string(), family))?;
        if multicast {
            iface.multicast.as_mut()
        } else {
            iface.unicast.as_mut()
        }
    }

    /// Sends `bytes` to `dest` on the unicast or multicast socket for
    /// `ifname`/`family`, selected by whether `dest` is a multicast
    /// address. On `EBADF` the offending socket is closed; the next
    /// `apply_config` call reopens it (spec.md §4.2's failure model).
    pub fn send(
        &mut self,
        ifname: &str,
        family: AddressFamily,
        dest: SocketAddr,
        bytes: &[u8],
        now_ms: u64,
    ) -> Result<SendOutcome, SocketError> {
        let multicast = dest.ip().is_multicast();
        let Some(managed) = self.managed_mut(ifname, family, multicast) else {
            return Err(SocketError::NotOpen(ifname.to_string()));
        };
        match managed.send(dest, bytes, now_ms) {
            Err(SocketError::Io(e)) if e.raw_os_error() == Some(9) => {
                warn!(ifname, ?family, "EBADF on send, closing socket for reopen");
                let key = (ifname.to_string(), family);
                if let Some(iface) = self.by_iface.get_mut(&key) {
                    if multicast {
                        iface.multicast = None;
                    } else {
                        iface.unicast = None;
                    }
                }
                Err(SocketError::Io(e))
            }
            other => other,
        }
    }

    /// Flushes the per-target packet the fabric just aggregated, resolving
    /// `target` (`"ifname/unicast"` or `"ifname/mcast"`) to its socket and
    /// destination.
    pub fn send_to_target(
        &mut self,
        target: &TargetId,
        family: AddressFamily,
        bytes: &[u8],
        now_ms: u64,
    ) -> Result<SendOutcome, SocketError> {
        let (ifname, suffix) = target
            .rsplit_once('/')
            .ok_or_else(|| SocketError::NotOpen(target.clone()))?;
        let key = (ifname.to_string(), family);
        let iface = self
            .by_iface
            .get(&key)
            .ok_or_else(|| SocketError::NotOpen(target.clone()))?;
        let dest = match suffix {
            "mcast" => match family {
                AddressFamily::Ipv4 => SocketAddr::new(
                    IpAddr::V4(iface.config.multicast_group_v4),
                    iface.config.multicast_port,
                ),
                AddressFamily::Ipv6 => SocketAddr::new(
                    IpAddr::V6(iface.config.multicast_group_v6),
                    iface.config.multicast_port,
                ),
                _ => return Err(SocketError::NotOpen(target.clone())),
            },
            _ => return Err(SocketError::NotOpen(target.clone())),
        };
        self.send(ifname, family, dest, bytes, now_ms)
    }

    pub fn drain_all_backlogs(&mut self) {
        for iface in self.by_iface.values_mut() {
            if let Some(s) = iface.unicast.as_mut() {
                let _ = s.drain_backlog();
            }
            if let Some(s) = iface.multicast.as_mut() {
                let _ = s.drain_backlog();
            }
        }
    }

    pub fn target_id_unicast(ifname: &str) -> TargetId {
        target_id(ifname, "unicast")
    }

    pub fn target_id_multicast(ifname: &str) -> TargetId {
        target_id(ifname, "mcast")
    }

    /// Waits until any open socket has a datagram ready, multiplexing
    /// across every interface/family/unicast-or-multicast socket this set
    /// owns (spec.md §4.1's `Scheduler` folding socket readiness into the
    /// timer-wheel event loop). Pends forever if nothing is open, so
    /// callers `select!` this alongside `Scheduler::wait_for_timers`.
    pub async fn wait_readable(&self) -> Option<SocketId> {
        let mut ids = Vec::new();
        let mut futs: Vec<BoxFuture<'_, std::io::Result<()>>> = Vec::new();
        for ((ifname, family), iface) in &self.by_iface {
            if let Some(s) = &iface.unicast {
                ids.push(SocketId { ifname: ifname.clone(), family: *family, multicast: false });
                futs.push(Box::pin(s.readable()));
            }
            if let Some(s) = &iface.multicast {
                ids.push(SocketId { ifname: ifname.clone(), family: *family, multicast: true });
                futs.push(Box::pin(s.readable()));
            }
        }
        if futs.is_empty() {
            std::future::pending::<()>().await;
            unreachable!("pending future never resolves");
        }
        let (_, idx, _) = futures::future::select_all(futs).await;
        Some(ids.swap_remove(idx))
    }

    /// Reads one datagram from the socket `id` identifies, non-blocking.
    pub fn try_recv(&self, id: &SocketId, buf: &mut [u8]) -> std::io::Result<(usize, SocketAddr)> {
        let iface = self
            .by_iface
            .get(&(id.ifname.clone(), id.family))
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "socket no longer open"))?;
        let managed = if id.multicast { iface.multicast.as_ref() } else { iface.unicast.as_ref() };
        managed
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "socket no longer open"))?
            .try_recv(buf)
    }
}

/// Identifies one managed socket for readiness multiplexing; opaque to
/// callers beyond round-tripping it back into [`SocketSet::try_recv`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketId {
    pub ifname: String,
    pub family: AddressFamily,
    pub multicast: bool,
}

fn open_unicast(
    family: AddressFamily,
    bind_addr: IpAddr,
    port: u16,
    config: &SocketConfig,
) -> Result<TokioUdpSocket, SocketError> {
    let socket = new_raw_socket(family)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    apply_common_opts(&socket, family, config)?;
    socket.bind(&SocketAddr::new(bind_addr, port).into())?;
    Ok(TokioUdpSocket::from_std(socket.into())?)
}

fn open_multicast(
    family: AddressFamily,
    bind_addr: IpAddr,
    port: u16,
    config: &SocketConfig,
) -> Result<TokioUdpSocket, SocketError> {
    let socket = new_raw_socket(family)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    apply_common_opts(&socket, family, config)?;

    match family {
        AddressFamily::Ipv4 => {
            socket.bind(&SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port).into())?;
            socket.join_multicast_v4(&config.multicast_group_v4, &ipv4_of(bind_addr))?;
            socket.set_multicast_loop_v4(config.loop_multicast)?;
        }
        AddressFamily::Ipv6 => {
            socket.bind(&SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port).into())?;
            socket.join_multicast_v6(&config.multicast_group_v6, 0)?;
            socket.set_multicast_loop_v6(config.loop_multicast)?;
        }
        _ => unreachable!("multicast sockets are only opened for IP families"),
    }
    Ok(TokioUdpSocket::from_std(socket.into())?)
}

fn ipv4_of(addr: IpAddr) -> Ipv4Addr {
    match addr {
        IpAddr::V4(v4) => v4,
        IpAddr::V6(_) => Ipv4Addr::UNSPECIFIED,
    }
}

fn new_raw_socket(family: AddressFamily) -> Result<Socket, SocketError> {
    let domain = match family {
        AddressFamily::Ipv4 => Domain::IPV4,
        AddressFamily::Ipv6 => Domain::IPV6,
        _ => return Err(SocketError::NoBindAddress("non-IP family".to_string())),
    };
    Ok(Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?)
}

fn apply_common_opts(socket: &Socket, family: AddressFamily, config: &SocketConfig) -> Result<(), SocketError> {
    match family {
        AddressFamily::Ipv4 => {
            socket.set_ttl(config.ttl)?;
            socket.set_tos(u32::from(config.dscp) << 2)?;
        }
        AddressFamily::Ipv6 => {
            socket.set_unicast_hops_v6(config.ttl)?;
        }
        _ => {}
    }
    Ok(())
}
