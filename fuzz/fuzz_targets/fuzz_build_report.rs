//! Fuzz target: build report parsing.
//!
//! Arbitrary bytes must either fail to parse or yield fuzzer URLs whose
//! file names are non-empty.

#![no_main]

use fuzzci_runner::fuzzers::{file_name, BuildReport};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(report) = BuildReport::from_slice(data) else {
        return;
    };
    for url in report.fuzzer_urls() {
        let name = file_name(url).expect("selected URLs have a file name");
        assert!(!name.is_empty());
    }
});
