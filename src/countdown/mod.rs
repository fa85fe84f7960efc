//! Live countdown to a scheduled dispatch.
//!
//! | Module         | Contents                                          |
//! |----------------|---------------------------------------------------|
//! | `synchronizer` | `Countdown` owner, setter and reader handles      |
//! | `remaining`    | `Remaining` value and its display formatting      |
//! | `timestamp`    | ISO-8601 parsing of backend scheduled times       |
//! | `clock`        | `Clock` trait, system and tokio-driven clocks     |

pub mod clock;
pub mod remaining;
pub mod synchronizer;
pub mod timestamp;

pub use clock::{Clock, SystemClock, TokioClock};
pub use remaining::Remaining;
pub use synchronizer::{Countdown, CountdownReader, CountdownSetter, TICK_INTERVAL};
pub use timestamp::parse_timestamp;
