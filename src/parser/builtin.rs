//! Schemas for the hierarchies the engine reads back most often.
//!
//! All are rooted at the top of the configuration, so relative output has to
//! be parsed with the matching context (see [`parse_config_at`]).
//!
//! [`parse_config_at`]: super::parse_config_at

use super::schema::{KeyKind, Schema};

/// `system` hierarchy
pub fn system_schema() -> Schema {
    let login = Schema::new()
        .repeated(
            "user",
            KeyKind::Name,
            Schema::new()
                .text("class")
                .integer("uid")
                .text("full-name")
                .text("authentication encrypted-password"),
        )
        .repeated("class", KeyKind::Name, Schema::new().list("permissions").text("idle-timeout"));

    let ssh = Schema::new()
        .text("root-login")
        .list("protocol-version")
        .integer("max-sessions-per-connection")
        .integer("connection-limit")
        .integer("rate-limit");

    Schema::new().block(
        "system",
        Schema::new()
            .text("host-name")
            .text("domain-name")
            .list("domain-search")
            .text("time-zone")
            .list("name-server")
            .text("login message")
            .block("login", login)
            .block("services ssh", ssh)
            .block("services netconf ssh", Schema::new().integer("port"))
            .list("ntp server")
            .text("ntp boot-server")
            .integer("max-configurations-on-flash")
            .integer("max-configuration-rollbacks")
            .flag("no-redirects")
            .flag("no-ping-record-route"),
    )
}

/// `chassis cluster` hierarchy (SRX)
pub fn chassis_cluster_schema() -> Schema {
    let redundancy_group = Schema::new()
        .repeated("node", KeyKind::Index, Schema::new().integer("priority"))
        .flag("preempt")
        .integer("gratuitous-arp-count")
        .integer("hold-down-interval")
        .repeated(
            "interface-monitor",
            KeyKind::Name,
            Schema::new().integer("weight"),
        );

    Schema::new().block(
        "chassis cluster",
        Schema::new()
            .integer("reth-count")
            .flag("control-link-recovery")
            .integer("heartbeat-interval")
            .integer("heartbeat-threshold")
            .repeated("redundancy-group", KeyKind::Index, redundancy_group),
    )
}

/// `protocols bgp` hierarchy
pub fn bgp_schema() -> Schema {
    let graceful_restart = Schema::new()
        .integer("restart-time")
        .integer("stale-routes-time")
        .flag("disable");

    let family = Schema::new()
        .integer("prefix-limit maximum")
        .flag("prefix-limit teardown");

    let neighbor = Schema::new()
        .text("description")
        .integer("peer-as")
        .text("local-address")
        .list("import")
        .list("export")
        .block("graceful-restart", graceful_restart.clone());

    let group = Schema::new()
        .text("type")
        .text("description")
        .integer("peer-as")
        .text("local-address")
        .list("import")
        .list("export")
        .flag("multipath")
        .block("graceful-restart", graceful_restart.clone())
        .repeated("family", KeyKind::Composite(2), family)
        .repeated("neighbor", KeyKind::Name, neighbor);

    Schema::new().block(
        "protocols bgp",
        Schema::new()
            .flag("log-updown")
            .block("graceful-restart", graceful_restart)
            .repeated("group", KeyKind::Name, group),
    )
}

/// Builtin schema names accepted by [`schema_by_name`]
pub const SCHEMA_NAMES: [&str; 3] = ["system", "chassis-cluster", "bgp"];

/// Look up a builtin schema and its hierarchy root
pub fn schema_by_name(name: &str) -> Option<(Schema, &'static str)> {
    match name {
        "system" => Some((system_schema(), "system")),
        "chassis-cluster" | "chassis_cluster" => Some((chassis_cluster_schema(), "chassis cluster")),
        "bgp" => Some((bgp_schema(), "protocols bgp")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::super::{parse_config, parse_config_at, render};
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_system_longest_keyword_wins() {
        let raw = "set system login message \"authorized use only\"\nset system login user ops class super-user\nset system login user ops uid 2001\n";
        let record = parse_config(raw, &system_schema()).unwrap();
        let system = record.block("system").unwrap();
        assert_eq!(system.text("login_message"), Some("authorized use only"));
        let user = system.block("login").unwrap().entry("user", "ops").unwrap();
        assert_eq!(user.text("class"), Some("super-user"));
        assert_eq!(user.int("uid"), Some(2001));
    }

    #[test]
    fn test_presence_block_materializes() {
        let raw = "set protocols bgp group ext graceful-restart\nset protocols bgp group int type internal\n";
        let record = parse_config(raw, &bgp_schema()).unwrap();
        let bgp = record.block("protocols_bgp").unwrap();

        let ext = bgp.entry("group", "ext").unwrap();
        let gr = ext.block("graceful_restart").unwrap();
        assert!(gr.is_empty());
        assert_eq!(gr.int_or_sentinel("restart_time"), -1);

        let int = bgp.entry("group", "int").unwrap();
        assert!(int.block("graceful_restart").is_none());
    }

    #[test]
    fn test_bgp_composite_family_key() {
        let raw = [
            "set protocols bgp group ext family inet unicast prefix-limit maximum 1000",
            "set protocols bgp group ext family inet unicast prefix-limit teardown",
            "set protocols bgp group ext neighbor 192.0.2.1 peer-as 65001",
        ];
        let record = parse_config(&raw.join("\n"), &bgp_schema()).unwrap();
        let group = record.block("protocols_bgp").unwrap().entry("group", "ext").unwrap();

        let family = group.entry("family", "inet unicast").unwrap();
        assert_eq!(family.int("prefix_limit_maximum"), Some(1000));
        assert!(family.flag("prefix_limit_teardown"));
        assert_eq!(group.entry("neighbor", "192.0.2.1").unwrap().int("peer_as"), Some(65001));

        assert_eq!(render(&record, &bgp_schema()), raw.to_vec());
    }

    #[test]
    fn test_relative_host_name() {
        let record = parse_config_at("host-name R1;\n", &system_schema(), "system").unwrap();
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            serde_json::json!({"system": {"host_name": "R1"}})
        );
    }

    #[test]
    fn test_schema_by_name() {
        for name in SCHEMA_NAMES {
            assert!(schema_by_name(name).is_some());
        }
        assert!(schema_by_name("ospf").is_none());
    }
}
