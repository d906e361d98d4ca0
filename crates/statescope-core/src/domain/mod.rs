//! Domain model (frozen values, events, errors).

pub mod errors;
pub mod events;
pub mod freeze;

pub use self::errors::{ErrorKind, StoreError};
pub use self::events::{ActionRejection, ScopeEvent};
pub use self::freeze::{Frozen, Props, State};
