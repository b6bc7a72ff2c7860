//! Set operators over bitsets.

use std::fmt;

use crate::error::{KeyError, KeyResult};

/// A set operator that can combine bitsets into a derived bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    /// Intersection.
    And,
    /// Union.
    Or,
    /// Symmetric difference.
    Xor,
    /// Complement (unary).
    Not,
    /// Difference: members of the first operand absent from the second.
    Subtract,
}

impl Operator {
    /// Returns the tag used inside derived storage keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Xor => "xor",
            Operator::Not => "not",
            Operator::Subtract => "minus",
        }
    }

    /// Returns true if operand order does not affect the result.
    pub fn is_commutative(&self) -> bool {
        matches!(self, Operator::And | Operator::Or | Operator::Xor)
    }

    /// Returns the primitive the store executes for this operator, if any.
    ///
    /// `Subtract` has no store primitive; `A - B` is composed as
    /// `A XOR (A AND B)`.
    pub fn store_op(&self) -> Option<StoreOp> {
        match self {
            Operator::And => Some(StoreOp::And),
            Operator::Or => Some(StoreOp::Or),
            Operator::Xor => Some(StoreOp::Xor),
            Operator::Not => Some(StoreOp::Not),
            Operator::Subtract => None,
        }
    }

    /// Checks that `count` operands are valid for this operator.
    pub fn check_arity(&self, count: usize) -> KeyResult<()> {
        let (ok, expected) = match self {
            Operator::Not => (count == 1, "exactly 1"),
            Operator::Subtract => (count == 2, "exactly 2"),
            Operator::And | Operator::Or | Operator::Xor => (count >= 1, "at least 1"),
        };
        if ok {
            Ok(())
        } else {
            Err(KeyError::Arity {
                operator: *self,
                expected,
                actual: count,
            })
        }
    }

    /// Puts operands into canonical order for this operator.
    ///
    /// Commutative operators sort their operands so `A op B` and `B op A`
    /// produce the same key; the others keep caller order.
    pub fn canonicalize(&self, operands: &mut [String]) {
        if self.is_commutative() {
            operands.sort_unstable();
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bitwise primitive executed by the store (Redis `BITOP` semantics).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// Bitwise AND of all operands.
    And,
    /// Bitwise OR of all operands.
    Or,
    /// Bitwise XOR of all operands.
    Xor,
    /// Bitwise NOT of exactly one operand.
    Not,
}

impl StoreOp {
    /// Returns the command argument name (`AND`, `OR`, `XOR`, `NOT`).
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOp::And => "AND",
            StoreOp::Or => "OR",
            StoreOp::Xor => "XOR",
            StoreOp::Not => "NOT",
        }
    }
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commutativity() {
        assert!(Operator::And.is_commutative());
        assert!(Operator::Or.is_commutative());
        assert!(Operator::Xor.is_commutative());
        assert!(!Operator::Subtract.is_commutative());
        assert!(!Operator::Not.is_commutative());
    }

    #[test]
    fn test_canonicalize_sorts_commutative() {
        let mut operands = vec!["b".to_string(), "a".to_string()];
        Operator::Or.canonicalize(&mut operands);
        assert_eq!(operands, vec!["a", "b"]);
    }

    #[test]
    fn test_canonicalize_keeps_subtract_order() {
        let mut operands = vec!["b".to_string(), "a".to_string()];
        Operator::Subtract.canonicalize(&mut operands);
        assert_eq!(operands, vec!["b", "a"]);
    }

    #[test]
    fn test_arity() {
        assert!(Operator::Not.check_arity(1).is_ok());
        assert!(Operator::Not.check_arity(2).is_err());
        assert!(Operator::Subtract.check_arity(2).is_ok());
        assert!(Operator::Subtract.check_arity(3).is_err());
        assert!(Operator::And.check_arity(3).is_ok());
        assert!(Operator::And.check_arity(0).is_err());
    }

    #[test]
    fn test_store_op_mapping() {
        assert_eq!(Operator::And.store_op(), Some(StoreOp::And));
        assert_eq!(Operator::Not.store_op(), Some(StoreOp::Not));
        assert_eq!(Operator::Subtract.store_op(), None);
        assert_eq!(StoreOp::Xor.to_string(), "XOR");
    }
}
