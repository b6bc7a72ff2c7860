//! Property tests for key derivation.

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use timebits::{Granularity, KeyCodec, Operator};

fn granularity() -> impl Strategy<Value = Granularity> {
    prop::sample::select(Granularity::ALL.to_vec())
}

fn timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    // 1900-01-01 .. 2200-01-01
    (-2_208_988_800i64..7_258_118_400i64).prop_map(|s| DateTime::from_timestamp(s, 0).unwrap())
}

fn event() -> impl Strategy<Value = String> {
    "[a-z:_]{1,12}"
}

proptest! {
    #[test]
    fn truncated_time_maps_to_same_key(g in granularity(), t in timestamp(), e in event()) {
        let codec = KeyCodec::default();
        let start = g.truncate(t).unwrap();
        prop_assert!(start <= t);
        prop_assert_eq!(codec.base_key(&e, g, t), codec.base_key(&e, g, start));
    }

    #[test]
    fn bucket_start_round_trips(g in granularity(), t in timestamp()) {
        let index = g.bucket_index(t);
        let start = g.bucket_start(index).unwrap();
        prop_assert_eq!(g.bucket_index(start), index);
    }

    #[test]
    fn base_key_parses_back(g in granularity(), t in timestamp(), e in event()) {
        let codec = KeyCodec::default();
        let parsed = codec.parse_base_key(&codec.base_key(&e, g, t)).unwrap();
        prop_assert_eq!(parsed.granularity, g);
        prop_assert_eq!(parsed.bucket, g.bucket_index(t));
        prop_assert_eq!(parsed.event, e);
    }

    #[test]
    fn commutative_operators_ignore_order(a in event(), b in event()) {
        let codec = KeyCodec::default();
        for op in [Operator::And, Operator::Or, Operator::Xor] {
            prop_assert_eq!(
                codec.combined_key(op, &[a.clone(), b.clone()]).unwrap(),
                codec.combined_key(op, &[b.clone(), a.clone()]).unwrap()
            );
        }
    }

    #[test]
    fn subtract_distinguishes_order(a in event(), b in event()) {
        prop_assume!(a != b);
        let codec = KeyCodec::default();
        prop_assert_ne!(
            codec.combined_key(Operator::Subtract, &[a.clone(), b.clone()]).unwrap(),
            codec.combined_key(Operator::Subtract, &[b, a]).unwrap()
        );
    }

    #[test]
    fn distinct_operand_lists_never_collide(
        left in prop::collection::vec("[a-z\\[\\]:0-9]{0,6}", 1..4),
        right in prop::collection::vec("[a-z\\[\\]:0-9]{0,6}", 1..4),
    ) {
        let codec = KeyCodec::default();
        let mut l = left.clone();
        let mut r = right.clone();
        l.sort();
        r.sort();
        prop_assume!(l != r);
        prop_assert_ne!(
            codec.combined_key(Operator::Or, &left).unwrap(),
            codec.combined_key(Operator::Or, &right).unwrap()
        );
    }
}
