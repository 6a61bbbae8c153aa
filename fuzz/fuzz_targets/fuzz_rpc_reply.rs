//! Fuzz target for NETCONF reply parsing and framing.

#![no_main]

use junos_engine::connection::netconf::{FrameBuffer, RpcReply};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut frames = FrameBuffer::new();
    frames.extend(data);
    while let Some(message) = frames.next_message() {
        let reply = RpcReply::parse(&message);
        let _ = reply.warnings();
        let _ = reply.error_message();
    }

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = RpcReply::parse(text);
    }
});
