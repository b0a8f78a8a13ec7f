#![no_main]

use std::sync::LazyLock;

use httpmon_log_pipeline::parser::AccessLogParser;
use libfuzzer_sys::fuzz_target;

static PARSER: LazyLock<AccessLogParser> =
    LazyLock::new(|| AccessLogParser::new().expect("line pattern compiles"));

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);

    // Ok or Err, never a panic; accepted events keep their invariants
    if let Ok(event) = PARSER.parse(&line) {
        assert!((100..=599).contains(&event.status_code));
        assert!(!event.section.is_empty());
        assert!(!event.section.contains('/'));
    }
});
