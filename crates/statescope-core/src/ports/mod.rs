//! Ports - 外部プリミティブの抽象化
//!
//! Each trait here is a narrow contract the scope machinery depends on.
//! Implementations can be swapped without touching `scope` or `app`.

pub mod clock;
pub mod id_generator;
pub mod middleware;
pub mod observer;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, SequentialIdGenerator, UlidGenerator};
pub use self::middleware::Middleware;
pub use self::observer::{ObserverSlot, StoreObserver};
