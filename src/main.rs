use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt};

use ethvm::config::{Config, DispatchStrategy, TraceLevel};
use ethvm::executive::{Env, Executive, LogEntry};
use ethvm::vm::asm::{self, AsmError, decode_hex, encode_hex};
use ethvm::vm::{Engine, Fault, NullSink, Outcome, Program, TracingSink, Word, WriterSink};

// Wrapper types for clap ValueEnum support
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DispatchArg {
    /// Loop-and-branch
    Loop,
    /// Indirect-threaded
    Threaded,
}

impl From<DispatchArg> for DispatchStrategy {
    fn from(arg: DispatchArg) -> Self {
        match arg {
            DispatchArg::Loop => DispatchStrategy::LoopAndBranch,
            DispatchArg::Threaded => DispatchStrategy::IndirectThreaded,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TraceArg {
    Off,
    Minimal,
    Verbose,
}

impl From<TraceArg> for TraceLevel {
    fn from(arg: TraceArg) -> Self {
        match arg {
            TraceArg::Off => TraceLevel::Off,
            TraceArg::Minimal => TraceLevel::Minimal,
            TraceArg::Verbose => TraceLevel::Verbose,
        }
    }
}

#[derive(Parser)]
#[command(name = "ethvm")]
#[command(about = "EVM-style bytecode interpreter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the program comes from. Exactly one must be given.
#[derive(Args)]
struct SourceArgs {
    /// Bytecode as hex (optional 0x prefix)
    code: Option<String>,

    /// Read the program from a file: assembly for .evm/.asm, hex otherwise
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Assemble the program from inline text
    #[arg(long)]
    asm: Option<String>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dispatch strategy (loop, threaded)
    #[arg(long, value_enum)]
    dispatch: Option<DispatchArg>,

    /// Run the bytecode optimizer before executing
    #[arg(long)]
    optimize: bool,

    /// Instrumentation level (off, minimal, verbose)
    #[arg(long, value_enum)]
    trace: Option<TraceArg>,

    /// Send verbose step records to the log instead of stderr lines
    #[arg(long)]
    trace_log: bool,

    /// Gas limit
    #[arg(long)]
    gas: Option<u64>,

    /// Call data as hex
    #[arg(long)]
    calldata: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a program
    Run(RunArgs),
    /// Print the instruction listing of a program
    Disasm {
        #[command(flatten)]
        source: SourceArgs,

        /// Show the optimizer's rewrites
        #[arg(long)]
        optimize: bool,
    },
    /// Assemble text to hex bytecode
    Asm {
        /// Assembly source
        text: Option<String>,

        /// Read the assembly source from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Machine-readable result of `ethvm run --json`.
#[derive(Serialize)]
struct Summary<'a> {
    outcome: &'static str,
    fault: Option<Fault>,
    output: Option<String>,
    steps: u64,
    traced: u64,
    gas_used: u64,
    stack: &'a [Word],
    logs: &'a [LogEntry],
    beneficiary: Option<Word>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = match &cli.command {
        Commands::Run(args) if args.trace_log => "warn,ethvm::step=trace",
        _ => "warn",
    };
    init_logging(default_filter);

    let result = match cli.command {
        Commands::Run(args) => run(args),
        Commands::Disasm { source, optimize } => disasm(&source, optimize),
        Commands::Asm { text, file } => assemble(text, file),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Install the stderr subscriber. `ETHVM_LOG` wins over `RUST_LOG`.
fn init_logging(default_filter: &str) {
    let filter = std::env::var("ETHVM_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .and_then(|expr| EnvFilter::try_new(expr).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter));

    let _ = fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .try_init();
}

fn run(args: RunArgs) -> Result<ExitCode> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(dispatch) = args.dispatch {
        config.vm.dispatch = dispatch.into();
    }
    if args.optimize {
        config.vm.optimize = true;
    }
    if let Some(trace) = args.trace {
        config.vm.trace = trace.into();
    }
    if let Some(gas) = args.gas {
        config.executive.gas_limit = gas;
    }

    let code = args.source.load()?;
    let calldata = match &args.calldata {
        Some(hex) => parse_hex(hex).context("invalid --calldata")?,
        None => Vec::new(),
    };

    let engine = Engine::new(config.vm);
    let program = engine.load(code.clone());
    let env = Env {
        calldata,
        code,
        ..Env::default()
    };
    let mut host = Executive::new(&config.executive).with_env(env);

    let report = match config.vm.trace {
        TraceLevel::Verbose if args.trace_log => engine.run(&program, &mut host, &mut TracingSink),
        TraceLevel::Verbose => {
            let mut sink = WriterSink::new(io::stderr().lock());
            let report = engine.run(&program, &mut host, &mut sink);
            sink.finish().context("failed to write trace")?;
            report
        }
        _ => engine.run(&program, &mut host, &mut NullSink),
    };

    let output = report.outcome.data().map(|data| format!("0x{}", encode_hex(data)));
    if args.json {
        let summary = Summary {
            outcome: report.outcome.label(),
            fault: report.outcome.fault(),
            output,
            steps: report.steps,
            traced: report.traced,
            gas_used: host.gas_used(),
            stack: host.stack(),
            logs: host.logs(),
            beneficiary: host.beneficiary(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        match &report.outcome {
            Outcome::Faulted(fault) => println!("outcome: faulted ({})", fault),
            outcome => println!("outcome: {}", outcome.label()),
        }
        if let Some(output) = output {
            println!("output: {}", output);
        }
        println!("steps: {}", report.steps);
        if config.vm.trace != TraceLevel::Off {
            println!("traced: {}", report.traced);
        }
        println!("gas used: {}", host.gas_used());
        let stack: Vec<String> = host.stack().iter().map(|w| format!("{:#x}", w)).collect();
        println!("stack: [{}]", stack.join(", "));
        for log in host.logs() {
            println!("log: topics={} data=0x{}", log.topics.len(), encode_hex(&log.data));
        }
    }

    Ok(if report.outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn disasm(source: &SourceArgs, optimize: bool) -> Result<ExitCode> {
    let program = Program::load(source.load()?, optimize);
    if let Some(stats) = program.optimizer_stats() {
        println!(
            "; pooled {} pushes, fused {} jumps, {} constant jumps left checked",
            stats.pushes_pooled, stats.jumps_rewritten, stats.jumps_checked
        );
    }
    print!("{}", asm::listing(&program));
    Ok(ExitCode::SUCCESS)
}

fn assemble(text: Option<String>, file: Option<PathBuf>) -> Result<ExitCode> {
    let source = match (text, file) {
        (Some(text), None) => text,
        (None, Some(path)) => read_text(&path)?,
        (None, None) => bail!("no assembly given: pass TEXT or --file"),
        (Some(_), Some(_)) => bail!("TEXT and --file are mutually exclusive"),
    };
    let code = asm::assemble(&source)?;
    println!("0x{}", encode_hex(&code));
    Ok(ExitCode::SUCCESS)
}

impl SourceArgs {
    fn load(&self) -> Result<Vec<u8>> {
        match (&self.code, &self.file, &self.asm) {
            (Some(hex), None, None) => Ok(parse_hex(hex).context("invalid bytecode")?),
            (None, Some(path), None) => read_program(path),
            (None, None, Some(text)) => Ok(asm::assemble(text)?),
            (None, None, None) => bail!("no program given: pass CODE, --file or --asm"),
            _ => bail!("CODE, --file and --asm are mutually exclusive"),
        }
    }
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_program(path: &Path) -> Result<Vec<u8>> {
    let text = read_text(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("evm" | "asm") => {
            asm::assemble(&text).with_context(|| format!("failed to assemble {}", path.display()))
        }
        _ => parse_hex(&text).with_context(|| format!("invalid bytecode in {}", path.display())),
    }
}

fn parse_hex(text: &str) -> Result<Vec<u8>, AsmError> {
    let text = text.trim();
    decode_hex(text.strip_prefix("0x").unwrap_or(text))
}
