use ethvm::config::{DispatchStrategy, ExecutiveConfig, VmConfig};
use ethvm::executive::{Env, Executive};
use ethvm::vm::{Engine, NullSink, assemble};
use ethvm::Word;
use serde::Serialize;
use std::time::Instant;

#[derive(Serialize)]
struct BenchmarkResult {
    name: String,
    steps_plain: u64,
    steps_optimized: u64,
    loop_secs: f64,
    loop_optimized_secs: f64,
    threaded_secs: f64,
    threaded_optimized_secs: f64,
}

#[derive(Serialize)]
struct BenchmarkOutput {
    results: Vec<BenchmarkResult>,
}

/// Timed runs per configuration; the fastest is reported.
const REPEATS: usize = 5;

/// Returns the best time in seconds and the step count.
fn run_ethvm_benchmark(code: &[u8], n: u64, dispatch: DispatchStrategy, optimize: bool) -> (f64, u64) {
    let engine = Engine::new(VmConfig {
        dispatch,
        optimize,
        ..Default::default()
    });
    let program = engine.load(code.to_vec());
    let config = ExecutiveConfig {
        gas_limit: u64::MAX,
        ..Default::default()
    };

    let mut best = f64::MAX;
    let mut steps = 0;
    for _ in 0..REPEATS {
        let env = Env {
            calldata: Word::from_u64(n).to_be_bytes().to_vec(),
            ..Env::default()
        };
        let mut host = Executive::new(&config).with_env(env);
        let start = Instant::now();
        let report = engine.run(&program, &mut host, &mut NullSink);
        best = best.min(start.elapsed().as_secs_f64());
        if !report.outcome.is_success() {
            eprintln!("benchmark failed: {:?}", report.outcome);
        }
        steps = report.steps;
    }
    (best, steps)
}

fn bench_program(name: &str, n: u64) -> BenchmarkResult {
    let path = format!(
        "{}/bench/programs/{}.evm",
        env!("CARGO_MANIFEST_DIR").trim_end_matches("/bench"),
        name
    );
    let source = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {}", path, e));
    let code = assemble(&source).unwrap_or_else(|e| panic!("{}: {}", path, e));

    let (loop_secs, steps_plain) = run_ethvm_benchmark(&code, n, DispatchStrategy::LoopAndBranch, false);
    let (loop_optimized_secs, steps_optimized) =
        run_ethvm_benchmark(&code, n, DispatchStrategy::LoopAndBranch, true);
    let (threaded_secs, _) = run_ethvm_benchmark(&code, n, DispatchStrategy::IndirectThreaded, false);
    let (threaded_optimized_secs, _) =
        run_ethvm_benchmark(&code, n, DispatchStrategy::IndirectThreaded, true);

    BenchmarkResult {
        name: name.to_string(),
        steps_plain,
        steps_optimized,
        loop_secs,
        loop_optimized_secs,
        threaded_secs,
        threaded_optimized_secs,
    }
}

fn main() {
    let results = vec![
        bench_program("sum_loop", 1_000_000),
        bench_program("fibonacci", 1_000_000),
        bench_program("memory_fill", 100_000),
    ];

    let output = BenchmarkOutput { results };
    println!("{}", serde_json::to_string_pretty(&output).unwrap());
}
