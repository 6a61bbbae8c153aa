//! Fuzz target for display-set parsing.
//!
//! Arbitrary output must never panic, and whatever parses must render to
//! lines that parse back to the same record.

#![no_main]

use arbitrary::Arbitrary;
use junos_engine::parser::{builtin, parse_config, parse_config_at, render};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum FuzzSchema {
    System,
    ChassisCluster,
    Bgp,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    schema: FuzzSchema,
    relative: bool,
    raw: String,
}

fuzz_target!(|input: FuzzInput| {
    let (schema, root) = match input.schema {
        FuzzSchema::System => (builtin::system_schema(), "system"),
        FuzzSchema::ChassisCluster => (builtin::chassis_cluster_schema(), "chassis cluster"),
        FuzzSchema::Bgp => (builtin::bgp_schema(), "protocols bgp"),
    };
    let context = if input.relative { root } else { "" };

    if let Ok(record) = parse_config_at(&input.raw, &schema, context) {
        let lines = render(&record, &schema);
        if let Ok(reparsed) = parse_config(&lines.join("\n"), &schema) {
            assert_eq!(reparsed, record);
        }
    }
});
