//! Front-end benchmarks: parsing, translation, and program assembly.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use relat::assembler::translation_result_to_full_program;
use relat::parser::parse;
use relat::translator::{translate, Environment};
use relat::value::Type;

const FAMILY: &str = "x : isPerson | (some x.hasChild) & (not some (y : x.hasChild | not y.isHappy))";

fn family_env() -> Environment {
    Environment::with_inputs([
        ("isPerson", &[Type::Number][..]),
        ("hasChild", &[Type::Number, Type::Number][..]),
        ("isHappy", &[Type::Number][..]),
        ("edge", &[Type::Number, Type::Number][..]),
    ])
    .unwrap()
}

/// `edge.edge. ... .edge` with `depth` joins
fn join_chain(depth: usize) -> String {
    vec!["edge"; depth + 1].join(".")
}

/// `((1 ; 2) ; 3) ...` with `width` constants
fn union_chain(width: usize) -> String {
    (1..=width).map(|i| i.to_string()).collect::<Vec<_>>().join(" ; ")
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.bench_function("family", |b| b.iter(|| parse(black_box(FAMILY)).unwrap()));
    for depth in [8usize, 64, 256] {
        let source = join_chain(depth);
        group.bench_with_input(BenchmarkId::new("join_chain", depth), &source, |b, s| {
            b.iter(|| parse(black_box(s)).unwrap());
        });
    }
    group.finish();
}

fn bench_translate(c: &mut Criterion) {
    let env = family_env();
    let mut group = c.benchmark_group("translate");

    let family = parse(FAMILY).unwrap();
    group.bench_function("family", |b| b.iter(|| translate(black_box(&family), &env).unwrap()));

    for width in [8usize, 64, 256] {
        let expr = parse(&union_chain(width)).unwrap();
        group.bench_with_input(BenchmarkId::new("union_chain", width), &expr, |b, e| {
            b.iter(|| translate(black_box(e), &env).unwrap());
        });
    }
    group.finish();
}

fn bench_assemble(c: &mut Criterion) {
    let env = family_env();
    let result = translate(&parse(FAMILY).unwrap(), &env).unwrap();
    c.bench_function("assemble_and_render", |b| {
        b.iter(|| {
            translation_result_to_full_program(black_box(&result), &env)
                .unwrap()
                .to_string()
        });
    });
}

criterion_group!(benches, bench_parse, bench_translate, bench_assemble);
criterion_main!(benches);
