//! Dispatch benchmarks comparing strategies, with and without the optimizer.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

use ethvm::config::{DispatchStrategy, ExecutiveConfig, TraceLevel, VmConfig};
use ethvm::executive::{Env, Executive};
use ethvm::vm::{Engine, NullSink, Program, assemble};
use ethvm::Word;

const STRATEGIES: [(&str, DispatchStrategy); 2] = [
    ("loop", DispatchStrategy::LoopAndBranch),
    ("threaded", DispatchStrategy::IndirectThreaded),
];

fn load(name: &str) -> Vec<u8> {
    let path = format!("{}/bench/programs/{}.evm", env!("CARGO_MANIFEST_DIR"), name);
    let source = std::fs::read_to_string(&path).unwrap();
    assemble(&source).unwrap()
}

fn executive(n: u64) -> Executive {
    let config = ExecutiveConfig {
        gas_limit: u64::MAX,
        ..Default::default()
    };
    let env = Env {
        calldata: Word::from_u64(n).to_be_bytes().to_vec(),
        ..Env::default()
    };
    Executive::new(&config).with_env(env)
}

fn run_once(engine: &Engine<Executive>, program: &Program, n: u64) -> u64 {
    let mut host = executive(n);
    let report = engine.run(program, &mut host, &mut NullSink);
    assert!(report.outcome.is_success(), "benchmark should succeed: {:?}", report.outcome);
    report.steps
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategies");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    for (program_name, n) in [("sum_loop", 200_000), ("fibonacci", 200_000), ("memory_fill", 50_000)] {
        let code = load(program_name);
        for (strategy_name, dispatch) in STRATEGIES {
            for optimize in [false, true] {
                let engine = Engine::new(VmConfig {
                    dispatch,
                    optimize,
                    ..Default::default()
                });
                let program = engine.load(code.clone());
                let id = format!(
                    "{}{}",
                    strategy_name,
                    if optimize { "_optimized" } else { "" }
                );
                group.bench_with_input(BenchmarkId::new(program_name, id), &n, |b, n| {
                    b.iter(|| run_once(&engine, &program, black_box(*n)))
                });
            }
        }
    }

    group.finish();
}

fn bench_trace_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("trace_levels");
    group.sample_size(10);

    let code = load("sum_loop");
    for (name, trace) in [("off", TraceLevel::Off), ("minimal", TraceLevel::Minimal)] {
        let engine = Engine::new(VmConfig {
            trace,
            ..Default::default()
        });
        let program = engine.load(code.clone());
        group.bench_function(name, |b| b.iter(|| run_once(&engine, &program, black_box(100_000))));
    }

    group.finish();
}

fn bench_optimizer(c: &mut Criterion) {
    let code = load("fibonacci");
    c.bench_function("optimize_fibonacci", |b| {
        b.iter(|| Program::optimized(black_box(code.clone())))
    });
}

criterion_group!(benches, bench_strategies, bench_trace_levels, bench_optimizer);
criterion_main!(benches);
