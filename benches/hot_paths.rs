//! Hot path benchmarks for the request pipeline.
//!
//! Run with: `cargo bench --bench hot_paths`
//! Compare baselines: `cargo bench --bench hot_paths -- --baseline main`
//!
//! Every inbound request goes through key parsing, alias resolution and,
//! for user parameters, the deny-set scan plus placeholder substitution.

use agent_request::key::{make_key, parse_key};
use agent_request::userparam::{substitute, SafetyPolicy};
use agent_request::{AgentConfig, AliasResolver, CommandTemplater, RequestPipeline};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

/// Benchmark parse_key across the grammar's shapes
fn bench_parse_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_key");
    group.throughput(Throughput::Elements(1));

    let inputs = [
        ("bare_name", "system.cpu.load"),
        ("two_params", "system.cpu.load[all,avg1]"),
        ("quoted", "vfs.file.regmatch[\"/var/log/app.log\",\"ERROR [a-z]+\"]"),
        ("array", "net.tcp.service[tcp,,[80, 443, 8080]]"),
    ];

    for (label, input) in inputs {
        group.bench_function(label, |b| b.iter(|| parse_key(black_box(input))));
    }

    // Long parameter lists
    for count in [8, 64] {
        let params: Vec<String> = (0..count).map(|i| format!("param{}", i)).collect();
        let text = make_key("bench.key", &params);
        group.bench_function(format!("params_{}", count), |b| {
            b.iter(|| parse_key(black_box(&text)))
        });
    }

    group.finish();
}

/// Benchmark make_key with and without quoting
fn bench_make_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("make_key");
    group.throughput(Throughput::Elements(1));

    let plain = ["all", "avg1"];
    group.bench_function("plain", |b| {
        b.iter(|| make_key(black_box("system.cpu.load"), black_box(&plain)))
    });

    let quoted = ["a,b", "\"x\"", ""];
    group.bench_function("quoted", |b| {
        b.iter(|| make_key(black_box("key"), black_box(&quoted)))
    });

    group.finish();
}

/// Benchmark alias resolution hits and misses
fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("alias_resolve");
    group.throughput(Throughput::Elements(1));

    let rules: Vec<String> = (0..100)
        .map(|i| format!("alias{}[*]:target{}[*]", i, i))
        .chain((0..100).map(|i| format!("plain{}:target.plain{}", i, i)))
        .collect();
    let resolver = match AliasResolver::new(&rules) {
        Ok(resolver) => resolver,
        Err(e) => panic!("benchmark rules must load: {}", e),
    };

    group.bench_function("exact_hit", |b| {
        b.iter(|| resolver.resolve(black_box("plain42")))
    });
    group.bench_function("wildcard_hit", |b| {
        b.iter(|| resolver.resolve(black_box("alias42[/tmp,1]")))
    });
    group.bench_function("miss", |b| {
        b.iter(|| resolver.resolve(black_box("system.cpu.load[all,avg1]")))
    });

    group.finish();
}

/// Benchmark command building under both policies
fn bench_build_command(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_command");
    group.throughput(Throughput::Elements(1));

    let lines = ["vfs.dir.size[*],du -s -B 1 \"$1\" | cut -f1 && echo $2"];
    for policy in [SafetyPolicy::Restrictive, SafetyPolicy::AllowUnsafe] {
        let templater = match CommandTemplater::new(&lines, policy) {
            Ok(templater) => templater,
            Err(e) => panic!("benchmark binding must load: {}", e),
        };
        let params = ["/var/lib/data", "done"];
        group.bench_function(format!("{:?}", policy), |b| {
            b.iter(|| templater.build(black_box("vfs.dir.size"), black_box(&params)))
        });
    }

    let template = "$1 $2 $3 $4 $5 $6 $7 $8 $9";
    let params = ["a", "b", "c", "d", "e", "f", "g", "h", "i"];
    group.bench_function("substitute_9", |b| {
        b.iter(|| substitute(black_box(template), black_box(&params)))
    });

    group.finish();
}

/// Benchmark the full dispatch path
fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    let config = AgentConfig {
        aliases: vec!["dir.size[*]:vfs.dir.size[*]".to_string()],
        user_parameters: vec!["vfs.dir.size[*],du -s -B 1 \"$1\" | cut -f1".to_string()],
        unsafe_user_parameters: 0,
    };
    let pipeline = match RequestPipeline::from_config(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => panic!("benchmark config must load: {}", e),
    };

    group.bench_function("user_parameter", |b| {
        b.iter(|| pipeline.dispatch(black_box("dir.size[/tmp]")))
    });
    group.bench_function("builtin", |b| {
        b.iter(|| pipeline.dispatch(black_box("system.cpu.load[all,avg1]")))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_key,
    bench_make_key,
    bench_resolve,
    bench_build_command,
    bench_dispatch,
);

criterion_main!(benches);
