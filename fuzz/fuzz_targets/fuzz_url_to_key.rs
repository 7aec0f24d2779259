//! Fuzz target: artifact URL to object key mapping.

#![no_main]

use fuzzci_runner::fuzzers::url_to_key;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(url) = std::str::from_utf8(data) else {
        return;
    };
    let key = url_to_key(url, "clickhouse-builds");
    assert!(!key.starts_with('/'), "keys are relative: {key:?}");
    assert!(!key.contains(['?', '#']), "query must be stripped: {key:?}");
});
