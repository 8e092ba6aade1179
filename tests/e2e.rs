use std::io::Write;
use std::process::Command;

fn run_ethvm(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_ethvm"))
        .args(args)
        .env_remove("ETHVM_LOG")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute ethvm");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn assert_success(args: &[&str]) -> (String, String) {
    let (stdout, stderr, code) = run_ethvm(args);
    assert_eq!(code, 0, "ethvm should succeed, stderr:\n{}", stderr);
    (stdout, stderr)
}

fn assert_exit(args: &[&str], expected: i32) -> (String, String) {
    let (stdout, stderr, code) = run_ethvm(args);
    assert_eq!(code, expected, "stdout:\n{}\nstderr:\n{}", stdout, stderr);
    (stdout, stderr)
}

fn calldata_word(n: u64) -> String {
    format!("{:064x}", n)
}

#[test]
fn test_run_hex() {
    let (stdout, _) = assert_success(&["run", "0x600560030100"]);
    assert_eq!(stdout, "outcome: stopped\nsteps: 4\ngas used: 9\nstack: [0x8]\n");
}

#[test]
fn test_run_asm_threaded_json() {
    let (stdout, _) = assert_success(&[
        "run",
        "--asm",
        "PUSH1 5 PUSH1 3 ADD STOP",
        "--dispatch",
        "threaded",
        "--optimize",
        "--json",
    ]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["outcome"], "stopped");
    assert_eq!(json["fault"], serde_json::Value::Null);
    assert_eq!(json["steps"], 4);
    assert_eq!(json["gas_used"], 9);
    assert_eq!(json["stack"], serde_json::json!(["0x8"]));
}

#[test]
fn test_fault_json() {
    let (stdout, _) = assert_exit(&["run", "0x6001600256", "--json"], 1);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["outcome"], "faulted");
    assert_eq!(json["fault"], "bad_jump_destination");
}

#[test]
fn test_fault_exit_code() {
    let (stdout, _) = assert_exit(&["run", "0x6001600201"], 1);
    assert!(stdout.starts_with("outcome: faulted (bad instruction)\n"));
}

#[test]
fn test_revert_exit_code() {
    let (stdout, _) = assert_exit(&["run", "--asm", "PUSH 0 PUSH 0 REVERT"], 1);
    assert!(stdout.starts_with("outcome: reverted\noutput: 0x\n"));
}

#[test]
fn test_verbose_trace_on_stderr() {
    let (stdout, stderr) = assert_success(&["run", "0x600560030100", "--trace", "verbose"]);
    assert!(stdout.contains("traced: 4\n"));
    assert!(
        stderr.contains("### 0 @0 PUSH1\n### 1 @2 PUSH1\n### 2 @4 ADD\n### 3 @5 STOP\n"),
        "stderr:\n{}",
        stderr
    );
}

#[test]
fn test_verbose_trace_reports_fused_jump() {
    let (stdout, stderr) = assert_success(&["run", "0x600556fefe5b00", "--optimize", "--trace", "verbose"]);
    assert!(stdout.contains("steps: 3\n"));
    assert!(stderr.contains("### 0 @0 JUMPC\n### 1 @5 JUMPDEST\n### 2 @6 STOP\n"), "stderr:\n{}", stderr);
}

#[test]
fn test_trace_log() {
    let (_, stderr) = assert_success(&["run", "0x600560030100", "--trace", "verbose", "--trace-log"]);
    assert!(stderr.contains("ethvm::step"), "stderr:\n{}", stderr);
    assert!(stderr.contains("PUSH1"));
    assert!(!stderr.contains("###"));
}

#[test]
fn test_sum_loop_file() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/bench/programs/sum_loop.evm");
    let calldata = calldata_word(10);
    for dispatch in ["loop", "threaded"] {
        let (stdout, _) = assert_success(&["run", "--file", path, "--calldata", &calldata, "--dispatch", dispatch]);
        let expected = format!("output: 0x{}\n", calldata_word(55));
        assert!(stdout.contains(&expected), "stdout:\n{}", stdout);
    }
}

#[test]
fn test_gas_limit() {
    let (stdout, _) = assert_exit(&["run", "0x600560030100", "--gas", "8"], 1);
    assert!(stdout.contains("out of resource"));
}

#[test]
fn test_disasm_optimized() {
    let (stdout, _) = assert_success(&["disasm", "0x600556fefe5b00", "--optimize"]);
    let mut lines = stdout.lines();
    assert_eq!(
        lines.next(),
        Some("; pooled 0 pushes, fused 1 jumps, 0 constant jumps left checked")
    );
    assert_eq!(lines.next(), Some("0000: PUSH1 0x5    ; JUMPC 0x5"));
    assert!(stdout.contains("0005: JUMPDEST"));
}

#[test]
fn test_disasm_plain() {
    let (stdout, _) = assert_success(&["disasm", "--asm", "PUSH1 5 PUSH1 3 ADD STOP"]);
    assert_eq!(stdout, "0000: PUSH1 0x5\n0002: PUSH1 0x3\n0004: ADD\n0005: STOP\n");
}

#[test]
fn test_asm() {
    let (stdout, _) = assert_success(&["asm", "PUSH1 5 PUSH1 3 ADD STOP"]);
    assert_eq!(stdout, "0x600560030100\n");
}

#[test]
fn test_asm_error() {
    let (_, stderr) = assert_exit(&["asm", "PUSH1 0x100"], 2);
    assert!(stderr.contains("does not fit in 1 bytes"), "stderr:\n{}", stderr);
}

#[test]
fn test_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[vm]\ndispatch = \"threaded\"\ntrace = \"minimal\"\n\n[executive]\ngas_limit = 100"
    )
    .unwrap();
    let path = file.path().to_str().unwrap();

    let (stdout, _) = assert_success(&["run", "0x600560030100", "--config", path]);
    assert!(stdout.contains("traced: 4\n"));

    // flags override the file
    let (stdout, _) = assert_exit(&["run", "0x600560030100", "--config", path, "--gas", "5"], 1);
    assert!(stdout.contains("out of resource"));
}

#[test]
fn test_bad_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "bogus = 1").unwrap();
    let path = file.path().to_str().unwrap();

    let (_, stderr) = assert_exit(&["run", "0x00", "--config", path], 2);
    assert!(stderr.contains("failed to load config"), "stderr:\n{}", stderr);
}

#[test]
fn test_missing_program() {
    let (_, stderr) = assert_exit(&["run"], 2);
    assert!(stderr.contains("no program given"));
}

#[test]
fn test_bad_hex() {
    let (_, stderr) = assert_exit(&["run", "0x601"], 2);
    assert!(stderr.contains("invalid bytecode"));
}
