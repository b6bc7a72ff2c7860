//! # timebits
//!
//! Storage keys for exact, time-bucketed event bitmaps.
//!
//! Every tracked event is stored as one bitmap per time bucket, where bit `n`
//! is set when identifier `n` triggered the event during that bucket. This
//! crate holds the pure, I/O-free pieces shared by the engine and the store
//! adapters:
//!
//! - [`Granularity`]: year, month, week, day, hour and minute buckets (UTC)
//! - [`Operator`] / [`StoreOp`]: set operators and the store primitives behind them
//! - [`KeyCodec`]: deterministic, collision-free key derivation
//!
//! ## Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use timebits::{Granularity, KeyCodec, Operator};
//!
//! let codec = KeyCodec::default();
//! let monday = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();
//! let friday = Utc.with_ymd_and_hms(2026, 10, 23, 17, 0, 0).unwrap();
//!
//! // Same week, same key
//! assert_eq!(
//!     codec.base_key("login", Granularity::Week, monday),
//!     codec.base_key("login", Granularity::Week, friday),
//! );
//!
//! // Subtraction is order sensitive
//! let a = codec.base_key("login", Granularity::Week, monday);
//! let b = codec.base_key("purchase", Granularity::Week, monday);
//! assert_ne!(
//!     codec.combined_key(Operator::Subtract, &[a.clone(), b.clone()]).unwrap(),
//!     codec.combined_key(Operator::Subtract, &[b, a]).unwrap(),
//! );
//! ```
//!
//! ## Key Layout
//!
//! | Kind | Layout |
//! |------|--------|
//! | Base | `{prefix}:evt:{granularity}:{bucket}:{event}` |
//! | Derived | `{prefix}:op:{operator}[{len}:{key}]...` |

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod codec;
mod error;
mod granularity;
mod operator;

pub use codec::{escape_glob, BaseKey, KeyCodec, OperationKey, DEFAULT_PREFIX};
pub use error::{KeyError, KeyResult};
pub use granularity::Granularity;
pub use operator::{Operator, StoreOp};

/// Identifier of the actor that triggered an event. Used directly as a bit position.
pub type Identifier = u64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        let _: Option<KeyCodec> = None;
        let _: Option<OperationKey> = None;
        let _: Option<KeyResult<()>> = None;
        let _id: Identifier = 42;
    }
}
