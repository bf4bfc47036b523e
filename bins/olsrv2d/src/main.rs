use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Parser;
use oonf_core::arena::Key;
use oonf_core::inspect::Snapshot;
use oonf_core::netaddr::{AddressFamily, NetAddr};
use oonf_core::serial::SerialU16;
use oonf_core::timer::TimerHandle;
use oonf_layer2::Layer2Db;
use oonf_nhdp::constants::{MSG_TYPE_HELLO, MSG_TYPE_TC};
use oonf_nhdp::{DomainId, NhdpInterface};
use oonf_olsrv2::{build_tc_message, parse_tc_message, NetlinkRouteBackend, RouteBackend, RouteInstaller, RoutingEntry, TcDb};
use oonf_rfc5444::{BinbufCodec, ForwardingPolicy, Rfc5444Fabric, Rfc5444Reader, Rfc5444Writer, TargetId};
use oonf_socket::{Scheduler, SocketConfig, SocketId, SocketSet};

mod config;
mod control;

use config::Config;

#[derive(Parser)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", default_value = "/etc/olsrv2/olsrv2d.toml")]
    config: PathBuf,

    /// Enables verbose (debug-level) logging
    #[arg(short, long)]
    verbose: bool,
}

struct Daemon {
    scheduler: Scheduler,
    sockets: SocketSet,
    fabric: Rfc5444Fabric,
    codec: BinbufCodec,
    interfaces: HashMap<String, NhdpInterface>,
    tc: TcDb,
    layer2: Layer2Db,
    routes: RouteInstaller,
    backend: Box<dyn RouteBackend>,
    snapshot: Arc<Mutex<Snapshot>>,
    hello_timers: HashMap<TimerHandle, String>,
    tc_timer: TimerHandle,
    local_ansn: SerialU16,
    cfg: Config,
}

fn net_addr_from_ip(ip: IpAddr) -> NetAddr {
    match ip {
        IpAddr::V4(v4) => NetAddr::host_v4(v4),
        IpAddr::V6(v6) => NetAddr::host_v6(v6),
    }
}

/// spec.md §4.7's "everyone" default applied to flooding: since every
/// neighbor selects every willing neighbor as MPR, this node is a
/// flooding MPR for any neighbor it currently holds symmetric (no wire
/// bit communicates MPR-selector status back, see DESIGN.md).
struct FloodAllSymmetric {
    symmetric_neighbors: std::collections::HashSet<NetAddr>,
    targets: Vec<TargetId>,
}

impl ForwardingPolicy for FloodAllSymmetric {
    fn is_flooding_mpr_for(&self, sender: &NetAddr) -> bool {
        self.symmetric_neighbors.contains(sender)
    }

    fn flooding_targets(&self) -> Vec<TargetId> {
        self.targets.clone()
    }
}

impl Daemon {
    fn new(cfg: Config) -> Self {
        let backend: Box<dyn RouteBackend> = match NetlinkRouteBackend::new(254) {
            Ok(b) => Box::new(b),
            Err(e) => {
                tracing::warn!(error = %e, "netlink unavailable, falling back to a no-op route backend");
                Box::new(oonf_olsrv2::NullRouteBackend::default())
            }
        };

        let mut scheduler = Scheduler::new();
        let mut interfaces = HashMap::new();
        let mut hello_timers = HashMap::new();

        for ifname in &cfg.interfaces {
            let mut iface = NhdpInterface::new(ifname.clone(), scheduler.wheel());
            iface.interval_time_ms = cfg.hello_interval_ms;
            iface.validity_time_ms = cfg.hello_interval_ms * 3;
            iface.willingness.insert(DomainId(0), oonf_nhdp::constants::WILLINGNESS_DEFAULT);
            iface.arm_hello_timer(scheduler.wheel());
            hello_timers.insert(iface.hello_timer, ifname.clone());
            interfaces.insert(ifname.clone(), iface);
        }

        let tc_timer = scheduler.wheel().create();
        scheduler.wheel().set(tc_timer, cfg.tc_interval_ms, Some(cfg.tc_interval_ms));

        let mut routes = RouteInstaller::new();
        routes.set_frozen(cfg.freeze_routes);

        Self {
            scheduler,
            sockets: SocketSet::new(),
            fabric: Rfc5444Fabric::new(),
            codec: BinbufCodec,
            interfaces,
            tc: TcDb::new(),
            layer2: Layer2Db::new(),
            routes,
            backend,
            snapshot: Arc::new(Mutex::new(Snapshot::default())),
            hello_timers,
            tc_timer,
            local_ansn: SerialU16::new(0),
            cfg,
        }
    }

    #[cfg(target_os = "linux")]
    fn check_interfaces_exist(&self) {
        use oonf_os::{LinuxOsAdapter, OsAdapter};
        let Ok(present) = LinuxOsAdapter.list_interfaces() else { return };
        for ifname in &self.cfg.interfaces {
            if !present.iter().any(|i| &i.name == ifname) {
                tracing::warn!(ifname, "configured interface not present on this host");
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn check_interfaces_exist(&self) {}

    fn open_sockets(&mut self) {
        let candidates = [IpAddr::V4(self.cfg.originator)];
        for ifname in &self.cfg.interfaces {
            if let Err(e) = self.sockets.apply_config(ifname, AddressFamily::Ipv4, SocketConfig::default(), true, &candidates) {
                tracing::warn!(ifname, error = %e, "failed to open sockets for interface");
            }
        }
    }

    fn emit_hello(&mut self, ifname: &str) {
        let Some(iface) = self.interfaces.get(ifname) else { return };
        let originator = Some(NetAddr::host_v4(self.cfg.originator));
        let hello = iface.build_hello(originator);
        let target: TargetId = SocketSet::target_id_multicast(ifname);
        self.fabric.generate_message(&target, hello, self.scheduler.wheel());
    }

    fn flush_fired(&mut self, handle: TimerHandle) {
        let Some((target, packet)) = self.fabric.flush_on_timer(handle) else { return };
        let Ok(bytes) = self.codec.write_packet(&packet) else { return };
        let now = self.scheduler.wheel().now();
        if let Err(e) = self.sockets.send_to_target(&target, AddressFamily::Ipv4, &bytes, now) {
            tracing::warn!(%target, error = %e, "failed to send aggregated packet");
        }
    }

    /// Composes and floods this node's own TC (spec.md §4.8's fallback
    /// "a full TC is sent every interval" rather than MPR-gated
    /// incremental TCs, since no wire bit exists yet for a neighbor to
    /// tell us it selected us as MPR).
    fn emit_tc(&mut self) {
        let originator = NetAddr::host_v4(self.cfg.originator);
        self.local_ansn = self.local_ansn.next();

        let neighbors: Vec<oonf_olsrv2::TcNeighborAdvert> = self
            .interfaces
            .values()
            .flat_map(|iface| iface.links.iter())
            .filter(|(_, link)| link.is_symmetric())
            .map(|(_, link)| {
                let metric = link.metric(DomainId(0));
                oonf_olsrv2::TcNeighborAdvert {
                    originator: link.remote_addr,
                    metric_in: metric.metric_in,
                    metric_out: metric.metric_out,
                }
            })
            .collect();

        let attachments: Vec<oonf_olsrv2::TcAttachment> = self
            .cfg
            .attached_networks
            .iter()
            .filter(|lan| lan.active)
            .map(|lan| oonf_olsrv2::TcAttachment {
                prefix: lan.route.dst,
                src: lan.route.src,
                distance: lan.distance,
                metric: lan.outgoing_metric,
                ansn: self.local_ansn,
            })
            .collect();

        let msg = build_tc_message(originator, self.local_ansn, &neighbors, &attachments);
        for ifname in self.cfg.interfaces.clone() {
            let target = SocketSet::target_id_multicast(&ifname);
            self.fabric.generate_message(&target, msg.clone(), self.scheduler.wheel());
        }
    }

    fn forwarding_policy(&self) -> FloodAllSymmetric {
        let symmetric_neighbors = self
            .interfaces
            .values()
            .flat_map(|iface| iface.links.iter())
            .filter(|(_, link)| link.is_symmetric())
            .map(|(_, link)| link.remote_addr)
            .collect();
        let targets = self.cfg.interfaces.iter().map(|ifname| SocketSet::target_id_multicast(ifname)).collect();
        FloodAllSymmetric { symmetric_neighbors, targets }
    }

    /// Applies one received message to NHDP or the TC database, spec.md
    /// §4.3's "feed every inbound message into the matching extension".
    fn dispatch_message(&mut self, ifname: &str, sender: NetAddr, msg: &oonf_rfc5444::Message) {
        match msg.msg_type {
            MSG_TYPE_HELLO => {
                if let Some(iface) = self.interfaces.get_mut(ifname) {
                    iface.process_hello(sender, msg, self.scheduler.wheel());
                }
            }
            MSG_TYPE_TC => {
                if let Some((originator, ansn, neighbors, attachments)) = parse_tc_message(msg) {
                    self.tc.process_tc(originator, ansn, &neighbors, attachments);
                }
            }
            _ => {}
        }
    }

    /// Drains every datagram currently queued on the socket `id`
    /// identifies, decodes each as an RFC5444 packet and dispatches its
    /// messages, then runs the packet through the fabric's duplicate
    /// suppression and forwarding.
    fn on_socket_readable(&mut self, id: &SocketId) {
        let mut buf = [0u8; 2048];
        loop {
            let (n, from) = match self.sockets.try_recv(id, &mut buf) {
                Ok(v) => v,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return,
                Err(e) => {
                    tracing::warn!(ifname = %id.ifname, error = %e, "socket recv failed");
                    return;
                }
            };
            let packet = match self.codec.read_packet(&buf[..n]) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(ifname = %id.ifname, error = %e, "dropping unparsable packet");
                    continue;
                }
            };
            let sender = net_addr_from_ip(from.ip());
            for msg in &packet.messages {
                self.dispatch_message(&id.ifname, sender, msg);
            }
            let policy = self.forwarding_policy();
            let on_unicast_iface = !id.multicast;
            self.fabric.receive_packet(&packet, sender, on_unicast_iface, &policy, self.scheduler.wheel());
        }
    }

    fn recompute_routes(&mut self) {
        let seeds: Vec<(Key<oonf_olsrv2::TcNode>, u32, NetAddr)> = self
            .interfaces
            .values()
            .flat_map(|iface| iface.links.iter())
            .filter(|(_, link)| link.is_symmetric())
            .filter_map(|(_, link)| {
                let originator = link.remote_addr;
                let key = self.tc.node_for(&originator)?;
                let metric = link.metric(DomainId(0)).metric_out;
                Some((key, metric, originator))
            })
            .collect();

        let local_originator = NetAddr::host_v4(self.cfg.originator);
        let entries: Vec<RoutingEntry> = oonf_olsrv2::dijkstra::run(
            &self.tc,
            AddressFamily::Ipv4,
            &seeds,
            local_originator,
            &self.cfg.attached_networks,
            |e| e.metric_out,
        );

        let interfaces = self.cfg.interfaces.clone();
        self.routes.apply(&entries, |_| interfaces[0].clone(), self.backend.as_mut());

        let mut snap = self.snapshot.lock().expect("snapshot mutex poisoned");
        snap.originator = self.cfg.originator.to_string();
        snap.routes = self.routes.installed_routes().map(|r| format!("{} via {} ({} hops, cost {})", r.key, r.next_originator, r.path_hops, r.path_cost)).collect();
        snap.neighbors = self
            .interfaces
            .values()
            .flat_map(|iface| iface.links.iter())
            .filter(|(_, link)| link.is_symmetric())
            .map(|(_, link)| link.remote_addr.to_string())
            .collect();
        snap.tc_nodes = entries.iter().map(|e| format!("{} last-hop {}", e.route, e.last_originator)).collect();
    }

    async fn run(mut self) {
        self.check_interfaces_exist();
        self.open_sockets();
        tokio::spawn(control::serve(self.cfg.control_socket.clone(), Arc::clone(&self.snapshot)));
        for ifname in self.cfg.interfaces.clone() {
            self.emit_hello(&ifname);
        }

        loop {
            tokio::select! {
                fired = self.scheduler.wait_for_timers() => {
                    for handle in fired {
                        if let Some(ifname) = self.hello_timers.get(&handle).cloned() {
                            self.emit_hello(&ifname);
                            continue;
                        }
                        if handle == self.tc_timer {
                            self.emit_tc();
                            self.recompute_routes();
                            continue;
                        }
                        self.flush_fired(handle);
                    }
                }
                socket_id = self.sockets.wait_readable() => {
                    if let Some(id) = socket_id {
                        self.on_socket_readable(&id);
                    }
                }
            }
            self.layer2.commit();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = Config::from_file(cli.config)?;
    tracing::info!(originator = %cfg.originator, interfaces = ?cfg.interfaces, "starting olsrv2d");

    let daemon = Daemon::new(cfg);
    daemon.run().await;
    Ok(())
}
