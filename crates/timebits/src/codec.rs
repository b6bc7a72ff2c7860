//! Storage key derivation.
//!
//! Base keys address one event in one time bucket:
//!
//! ```text
//! {prefix}:evt:{granularity}:{bucket}:{event}
//! ```
//!
//! Derived keys address the result of an operator applied to other keys.
//! Each operand is written with its byte length so that no two distinct
//! operand lists can encode to the same string:
//!
//! ```text
//! {prefix}:op:{operator}[{len}:{key}][{len}:{key}]...
//! ```

use chrono::{DateTime, Utc};

use crate::error::KeyResult;
use crate::{Granularity, Operator};

/// Default namespace prefix for every key.
pub const DEFAULT_PREFIX: &str = "timebits";

const EVENT_SEGMENT: &str = "evt";
const OPERATION_SEGMENT: &str = "op";

/// An operator with its operands in canonical order.
///
/// Two `OperationKey`s are equal exactly when they denote the same logical
/// set, so this is the lookup key for memoized combinations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationKey {
    operator: Operator,
    operands: Vec<String>,
}

impl OperationKey {
    /// Validates arity and canonicalizes operand order.
    pub fn new(operator: Operator, operands: Vec<String>) -> KeyResult<Self> {
        operator.check_arity(operands.len())?;
        let mut operands = operands;
        operator.canonicalize(&mut operands);
        Ok(Self { operator, operands })
    }

    /// Returns the operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Returns the operands in canonical order.
    pub fn operands(&self) -> &[String] {
        &self.operands
    }
}

/// The components of a parsed base key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseKey {
    /// Bucket granularity.
    pub granularity: Granularity,
    /// Bucket index, see [`Granularity::bucket_index`].
    pub bucket: i64,
    /// Event name.
    pub event: String,
}

/// Derives deterministic storage keys for base and derived bitsets.
///
/// # Example
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use timebits::{Granularity, KeyCodec, Operator};
///
/// let codec = KeyCodec::default();
/// let t = Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap();
///
/// let day = codec.base_key("login", Granularity::Day, t);
/// assert_eq!(day, "timebits:evt:day:20745:login");
///
/// let a = codec.base_key("login", Granularity::Week, t);
/// let b = codec.base_key("signup", Granularity::Week, t);
/// let ab = codec.combined_key(Operator::And, &[a.clone(), b.clone()]).unwrap();
/// let ba = codec.combined_key(Operator::And, &[b, a]).unwrap();
/// assert_eq!(ab, ba);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCodec {
    prefix: String,
}

impl KeyCodec {
    /// Creates a codec that namespaces every key under `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns the namespace prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the key of the bucket containing `time`.
    pub fn base_key(&self, event: &str, granularity: Granularity, time: DateTime<Utc>) -> String {
        self.bucket_key(event, granularity, granularity.bucket_index(time))
    }

    /// Returns the key of the bucket with the given index.
    pub fn bucket_key(&self, event: &str, granularity: Granularity, bucket: i64) -> String {
        format!(
            "{}:{EVENT_SEGMENT}:{}:{bucket}:{event}",
            self.prefix,
            granularity.as_str()
        )
    }

    /// Returns the canonical key for `operator` applied to `operands`.
    pub fn combined_key(&self, operator: Operator, operands: &[String]) -> KeyResult<String> {
        let op = OperationKey::new(operator, operands.to_vec())?;
        Ok(self.derived_key(&op))
    }

    /// Returns the storage key for an already canonical operation.
    pub fn derived_key(&self, op: &OperationKey) -> String {
        let mut key = format!(
            "{}:{OPERATION_SEGMENT}:{}",
            self.prefix,
            op.operator.as_str()
        );
        for operand in &op.operands {
            key.push_str(&format!("[{}:{}]", operand.len(), operand));
        }
        key
    }

    /// Parses a base key produced by this codec.
    ///
    /// Returns `None` for derived keys and keys from other namespaces.
    pub fn parse_base_key(&self, key: &str) -> Option<BaseKey> {
        let rest = key
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix(':')?
            .strip_prefix(EVENT_SEGMENT)?
            .strip_prefix(':')?;
        let mut parts = rest.splitn(3, ':');
        let granularity = parts.next()?.parse().ok()?;
        let bucket = parts.next()?.parse().ok()?;
        let event = parts.next()?.to_string();
        Some(BaseKey {
            granularity,
            bucket,
            event,
        })
    }

    /// Returns true if `key` is a derived (operation) key of this codec.
    pub fn is_derived_key(&self, key: &str) -> bool {
        key.strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
            .and_then(|rest| rest.strip_prefix(OPERATION_SEGMENT))
            .is_some_and(|rest| rest.starts_with(':'))
    }

    /// Glob pattern matching every base key.
    pub fn events_pattern(&self) -> String {
        format!("{}:{EVENT_SEGMENT}:*", escape_glob(&self.prefix))
    }

    /// Glob pattern matching every derived key.
    pub fn operations_pattern(&self) -> String {
        format!("{}:{OPERATION_SEGMENT}:*", escape_glob(&self.prefix))
    }

    /// Glob pattern matching every key in the namespace.
    ///
    /// Glob metacharacters in the prefix are escaped, so the pattern never
    /// reaches into another namespace.
    pub fn all_pattern(&self) -> String {
        format!("{}:*", escape_glob(&self.prefix))
    }
}

/// Backslash-escapes the glob metacharacters `*`, `?`, `[`, `]` and `\` in `literal`.
pub fn escape_glob(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Default for KeyCodec {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}
