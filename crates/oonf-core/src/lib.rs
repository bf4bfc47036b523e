//! Cross-cutting primitives shared by every protocol-engine crate in the
//! workspace: arena-of-entities handles, an ordered map, the timer wheel,
//! the change-notification bus, tagged network addresses and the error
//! kinds of spec.md §7. Nothing in here knows about NHDP, OLSRv2 or RFC5444
//! — those live in their own crates and depend on this one.

pub mod arena;
pub mod changebus;
pub mod error;
pub mod inspect;
pub mod netaddr;
pub mod ordered_map;
pub mod rate_limit;
pub mod serial;
pub mod timer;

pub mod prelude {
    pub use crate::arena::{Arena, Key};
    pub use crate::changebus::{Bus, ChangeKind, DirtyFlag};
    pub use crate::error::{ErrorKind, HasErrorKind};
    pub use crate::netaddr::{AddressFamily, Eui64, LinkId, Mac48, NetAddr, RouteKey};
    pub use crate::ordered_map::{OrderedMap, OrderedMultiMap};
    pub use crate::rate_limit::{Admission, RateLimiter};
    pub use crate::serial::SerialU16;
    pub use crate::timer::{TimerHandle, TimerWheel};
}
