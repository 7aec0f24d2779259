//! Fuzz target: check-name resolution.
//!
//! Arbitrary check names must resolve without panicking, never produce a
//! duplicate variable, and only emit sharding variables when enabled.

#![no_main]

use std::collections::HashSet;

use fuzzci_core::{resolve, ShardSpec};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(check_name) = std::str::from_utf8(data) else {
        return;
    };

    let plain = resolve(check_name, ShardSpec::DISABLED);
    let mut names = HashSet::new();
    for assignment in &plain {
        assert!(names.insert(assignment.name.clone()), "duplicate {}", assignment.name);
        assert!(!assignment.name.starts_with("RUN_BY_HASH"));
    }

    let sharded = resolve(check_name, ShardSpec::new(1, 4));
    assert_eq!(sharded.len(), plain.len() + 2);
});
