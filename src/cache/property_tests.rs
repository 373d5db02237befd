//! Property-Based Tests for the memoization core
//!
//! Uses proptest to verify codec round-trips and cache-key determinism
//! across the three storage backends.

use proptest::prelude::*;
use tempfile::tempdir;

use crate::backend::{BinaryBackend, CacheBackend, JsonBackend, SqliteBackend};
use crate::key::FunctionId;

// == Strategies ==
/// Generates argument tuples spanning text, numbers, and raw bytes.
fn arg_strategy() -> impl Strategy<Value = (String, i64, Vec<u8>)> {
    (
        "[a-zA-Z0-9 ]{0,24}",
        any::<i64>(),
        prop::collection::vec(any::<u8>(), 0..16),
    )
}

/// Generates result values with nested structure.
fn value_strategy() -> impl Strategy<Value = (String, Vec<i64>, Option<bool>)> {
    (
        "[a-zA-Z0-9 ]{0,24}",
        prop::collection::vec(any::<i64>(), 0..8),
        any::<Option<bool>>(),
    )
}

fn subject() -> FunctionId {
    FunctionId::new("props", "subject")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // *For any* arguments, hashing twice yields the same key on every
    // backend; keys must be reproducible across calls and process runs.
    #[test]
    fn prop_keys_are_deterministic(args in arg_strategy()) {
        let dir = tempdir().unwrap();

        let json = JsonBackend::new(dir.path().join("data.json"));
        prop_assert_eq!(
            json.hash_key(&subject(), &args).unwrap(),
            json.hash_key(&subject(), &args).unwrap()
        );

        let binary = BinaryBackend::new(dir.path().join("data.bin"));
        prop_assert_eq!(
            binary.hash_key(&subject(), &args).unwrap(),
            binary.hash_key(&subject(), &args).unwrap()
        );

        let sqlite = SqliteBackend::new(dir.path().join("data.sqlite"));
        prop_assert_eq!(
            sqlite.hash_key(&subject(), &args).unwrap(),
            sqlite.hash_key(&subject(), &args).unwrap()
        );
    }

    // *For any* pair of distinct arguments, the derived keys differ: two
    // calls with different arguments never share an entry.
    #[test]
    fn prop_distinct_args_never_collide(a in arg_strategy(), b in arg_strategy()) {
        prop_assume!(a != b);
        let dir = tempdir().unwrap();

        let json = JsonBackend::new(dir.path().join("data.json"));
        prop_assert_ne!(
            json.hash_key(&subject(), &a).unwrap(),
            json.hash_key(&subject(), &b).unwrap()
        );

        let sqlite = SqliteBackend::new(dir.path().join("data.sqlite"));
        prop_assert_ne!(
            sqlite.hash_key(&subject(), &a).unwrap(),
            sqlite.hash_key(&subject(), &b).unwrap()
        );
    }

    // *For any* encodable value, decode(encode(v)) == v through the JSON
    // codec.
    #[test]
    fn prop_json_codec_round_trip(value in value_strategy()) {
        let dir = tempdir().unwrap();
        let backend = JsonBackend::new(dir.path().join("data.json"));
        let repr = backend.encode(&value).unwrap();
        let decoded: (String, Vec<i64>, Option<bool>) = backend.decode(&repr).unwrap();
        prop_assert_eq!(decoded, value);
    }

    // *For any* encodable value, decode(encode(v)) == v through the
    // binary codec.
    #[test]
    fn prop_binary_codec_round_trip(value in value_strategy()) {
        let dir = tempdir().unwrap();
        let backend = BinaryBackend::new(dir.path().join("data.bin"));
        let repr = backend.encode(&value).unwrap();
        let decoded: (String, Vec<i64>, Option<bool>) = backend.decode(&repr).unwrap();
        prop_assert_eq!(decoded, value);
    }

    // *For any* encodable value, decode(encode(v)) == v through the
    // relational backend's codec.
    #[test]
    fn prop_sqlite_codec_round_trip(value in value_strategy()) {
        let dir = tempdir().unwrap();
        let backend = SqliteBackend::new(dir.path().join("data.sqlite"));
        let repr = backend.encode(&value).unwrap();
        let decoded: (String, Vec<i64>, Option<bool>) = backend.decode(&repr).unwrap();
        prop_assert_eq!(decoded, value);
    }

    // *For any* two values written under the same key, the later write
    // wins and at most one entry is observable.
    #[test]
    fn prop_put_replaces_previous_value(args in arg_strategy(), first in any::<i64>(), second in any::<i64>()) {
        let dir = tempdir().unwrap();
        let mut backend = JsonBackend::new(dir.path().join("data.json"));
        let key = backend.hash_key(&subject(), &args).unwrap();

        let repr = backend.encode(&first).unwrap();
        backend.put(&key, repr).unwrap();
        let repr = backend.encode(&second).unwrap();
        backend.put(&key, repr).unwrap();

        let entry = backend.get(&key).unwrap().expect("entry should exist");
        let decoded: i64 = backend.decode(&entry.payload).unwrap();
        prop_assert_eq!(decoded, second);
    }
}
