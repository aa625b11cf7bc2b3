//! Fuzz target: `AppCommand::parse`
//!
//! Feeds arbitrary console lines into the JSON command parser.  Parsing
//! must never panic and must ignore surrounding whitespace.
//!
//! cargo fuzz run fuzz_command_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use washstation::app::commands::AppCommand;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = core::str::from_utf8(data) else {
        return;
    };

    let parsed = AppCommand::parse(line).ok();
    let padded = format!("  {line}\n");
    assert_eq!(parsed, AppCommand::parse(&padded).ok());
});
