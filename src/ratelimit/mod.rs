//! Rate limiting logic and counter storage.

mod clock;
mod key;
mod limiter;
mod memory;
mod rate;
mod redis;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{LimitKey, Scope};
pub use limiter::{RateLimiter, RateStatus, DEFAULT_RATE};
pub use memory::MemoryStore;
pub use rate::{RateSpec, TimeWindow};
pub use self::redis::{ExpiryMode, RedisStore, DEFAULT_KEY_PREFIX};
pub use store::CounterStore;
