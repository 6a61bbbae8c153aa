//! Display-set parser benchmarks
//!
//! ```bash
//! cargo bench --bench parser_benchmark
//! ```
//!
//! # Benchmark Groups
//!
//! - `parse_config` - parsing generated BGP output of increasing size
//! - `render` - rendering the parsed record back to `set` lines
//! - `stage` - staging and rendering a commit batch

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use junos_engine::parser::{builtin, parse_config, render};
use junos_engine::stage::{CommandStager, ConfigLine};

fn bgp_output(groups: usize, neighbors: usize) -> String {
    let mut out = String::from("<configuration-output>\nset protocols bgp log-updown\n");
    for g in 0..groups {
        out.push_str(&format!("set protocols bgp group g{} type external\n", g));
        out.push_str(&format!(
            "set protocols bgp group g{} family inet unicast prefix-limit maximum 1000\n",
            g
        ));
        for n in 0..neighbors {
            out.push_str(&format!(
                "set protocols bgp group g{} neighbor 10.{}.{}.1 peer-as {}\n",
                g,
                g % 256,
                n % 256,
                64512 + n
            ));
            out.push_str(&format!(
                "set protocols bgp group g{} neighbor 10.{}.{}.1 description \"peer {} in g{}\"\n",
                g,
                g % 256,
                n % 256,
                n,
                g
            ));
        }
    }
    out.push_str("</configuration-output>\n");
    out
}

fn bench_parse(c: &mut Criterion) {
    let schema = builtin::bgp_schema();
    let mut group = c.benchmark_group("parse_config");

    for (groups, neighbors) in [(1, 10), (10, 10), (50, 40)] {
        let raw = bgp_output(groups, neighbors);
        group.throughput(Throughput::Bytes(raw.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", groups, neighbors)),
            &raw,
            |b, raw| b.iter(|| parse_config(black_box(raw), &schema)),
        );
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let schema = builtin::bgp_schema();
    let record = parse_config(&bgp_output(50, 40), &schema).unwrap_or_default();

    c.bench_function("render/50x40", |b| {
        b.iter(|| render(black_box(&record), &schema))
    });
}

fn bench_stage(c: &mut Criterion) {
    let lines: Vec<ConfigLine> = (0..1000)
        .map(|i| ConfigLine::set_value(format!("interfaces ge-0/0/{} description", i), "uplink to core"))
        .collect();

    c.bench_function("stage/1000", |b| {
        b.iter(|| {
            let mut stager = CommandStager::new();
            stager.stage_lines(lines.iter().map(String::from));
            black_box(stager.render())
        })
    });
}

criterion_group!(benches, bench_parse, bench_render, bench_stage);
criterion_main!(benches);
