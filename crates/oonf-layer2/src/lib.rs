//! Layer2 information base (spec.md §4.4): per-interface, per-neighbor
//! radio/link statistics contributed by multiple origins at different
//! priorities, feeding the DAT link metric in `oonf-nhdp`.

pub mod data;
pub mod db;
pub mod error;
pub mod neigh;
pub mod net;
pub mod origin;

pub use data::{DataSlot, DataValue};
pub use db::{Layer2Db, Layer2EntityKey, Layer2Event};
pub use error::Layer2Error;
pub use neigh::{Layer2Neigh, Layer2NeighData};
pub use net::{Layer2Net, Layer2NetData};
pub use origin::{Origin, OriginHandle};
