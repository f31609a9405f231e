//! Fuzz target for mask compilation and matching.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_client::isupport::ExtbanSpec;
use slirc_client::prefix::Prefix;
use slirc_client::{HostMask, User};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Some(user) = User::from_prefix(&Prefix::parse("nick!user@host.example")) else {
        return;
    };
    let extban = ExtbanSpec::parse("$,ajrxz");

    for spec in [None, extban.as_ref()] {
        if let Ok(mask) = HostMask::parse(input, spec) {
            let _ = mask.matches(&user);
        }
    }
});
