//! NHDP: one- and two-hop neighbor discovery (spec.md §4.5-§4.7), the
//! directional airtime link metric and MPR selection. Built on
//! `oonf-core`'s arena/timer primitives and `oonf-rfc5444`'s message
//! fabric.

pub mod constants;
pub mod dat;
pub mod domain;
pub mod error;
pub mod link;
pub mod linkset;
pub mod mpr;
pub mod neighbor;
pub mod twohop;

pub use dat::{DatMetric, EqualWeightCombiner, LossCombiner};
pub use domain::{DomainId, DomainMetric, FLOODING_DOMAIN};
pub use error::NhdpError;
pub use link::{LinkMetric, LinkStatus, NhdpLink};
pub use linkset::NhdpInterface;
pub use mpr::{EveryoneMpr, MprAlgorithm, MprCandidates, MprDirtyFlag};
pub use neighbor::Neighbor;
pub use twohop::{TwoHopEntry, TwoHopMetric};
