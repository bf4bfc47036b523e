//! OLSRv2 topology control, shortest-path computation and route
//! installation (spec.md §4.8-§4.10).

pub mod dijkstra;
pub mod error;
pub mod lan;
pub mod netlink;
pub mod route;
pub mod tc;

pub use dijkstra::RoutingEntry;
pub use error::Olsrv2Error;
pub use lan::LocalLan;
pub use netlink::NetlinkRouteBackend;
pub use route::{InstalledRoute, NullRouteBackend, RouteBackend, RouteInstaller, RouteOpError};
pub use tc::{build_tc_message, parse_tc_message, TcAttachment, TcDb, TcEdge, TcNeighborAdvert, TcNode};
