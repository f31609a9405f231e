//! Fuzz target for line parsing.
//!
//! Any line that parses must survive serialization and a second parse
//! without changing command or parameter count.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_client::Message;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if input.len() > 8191 {
        return;
    }

    if let Ok(msg) = Message::parse(input) {
        let line = msg.to_string();
        let again = Message::parse(&line).expect("serialized message must reparse");
        assert_eq!(msg.command, again.command);
        assert_eq!(msg.params.len(), again.params.len());
    }
});
