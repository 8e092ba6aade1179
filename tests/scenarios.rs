//! End-to-end runs of small programs through the engine and the reference
//! executive, under every strategy, optimization setting and trace level.

use ethvm::config::{DispatchStrategy, ExecutiveConfig, TraceLevel, VmConfig};
use ethvm::executive::Executive;
use ethvm::vm::{Engine, Fault, MemorySink, Opcode, Outcome, Report, Word, assemble};

fn configs() -> Vec<VmConfig> {
    let mut configs = Vec::new();
    for dispatch in [DispatchStrategy::LoopAndBranch, DispatchStrategy::IndirectThreaded] {
        for optimize in [false, true] {
            for trace in [TraceLevel::Off, TraceLevel::Minimal, TraceLevel::Verbose] {
                configs.push(VmConfig {
                    dispatch,
                    optimize,
                    trace,
                });
            }
        }
    }
    configs
}

fn executive() -> Executive {
    Executive::new(&ExecutiveConfig::default())
}

fn run_with(config: VmConfig, code: &[u8], mut host: Executive) -> (Report, Executive, MemorySink) {
    let engine = Engine::new(config);
    let program = engine.load(code.to_vec());
    let mut sink = MemorySink::new();
    let report = engine.run(&program, &mut host, &mut sink);
    (report, host, sink)
}

fn run(config: VmConfig, code: &[u8]) -> (Report, Executive) {
    let (report, host, _) = run_with(config, code, executive());
    (report, host)
}

fn w(v: u64) -> Word {
    Word::from_u64(v)
}

#[test]
fn test_add_and_stop() {
    let code = assemble("PUSH1 5 PUSH1 3 ADD STOP").unwrap();
    for config in configs() {
        let (report, host) = run(config, &code);
        assert_eq!(report.outcome, Outcome::Stopped, "{:?}", config);
        assert_eq!(report.steps, 4, "{:?}", config);
        assert_eq!(host.stack(), &[w(8)], "{:?}", config);
        assert_eq!(host.gas_used(), 9, "{:?}", config);
    }
}

#[test]
fn test_jump_to_non_destination() {
    // seeded stack holds a target that is not a JUMPDEST
    for config in configs() {
        let host = executive().with_stack([w(3)]);
        let (report, _, _) = run_with(config, &[0x56, 0x00, 0x00, 0x00], host);
        assert_eq!(report.outcome, Outcome::Faulted(Fault::BadJumpDestination), "{:?}", config);
        assert_eq!(report.steps, 1);
    }

    // constant target past the end of the stream
    let code = assemble("PUSH1 3 JUMP").unwrap();
    for config in configs() {
        let (report, _) = run(config, &code);
        assert_eq!(report.outcome, Outcome::Faulted(Fault::BadJumpDestination), "{:?}", config);
        assert_eq!(report.steps, 2);
    }
}

#[test]
fn test_jump_on_empty_stack_underflows() {
    for config in configs() {
        let (report, _) = run(config, &[0x56]);
        assert_eq!(report.outcome, Outcome::Faulted(Fault::StackUnderflow), "{:?}", config);
    }
}

#[test]
fn test_jump_into_push_data() {
    // PUSH1 4 JUMP PUSH1 0x5b STOP: byte 4 is operand data
    let code = [0x60, 0x04, 0x56, 0x60, 0x5b, 0x00];
    for config in configs() {
        let (report, _) = run(config, &code);
        assert_eq!(report.outcome, Outcome::Faulted(Fault::BadJumpDestination), "{:?}", config);
    }
}

#[test]
fn test_jump_over_invalid() {
    let code = assemble("PUSH1 5 JUMP INVALID INVALID JUMPDEST STOP").unwrap();
    assert_eq!(code, vec![0x60, 0x05, 0x56, 0xfe, 0xfe, 0x5b, 0x00]);

    for config in configs() {
        let (report, host, sink) = run_with(config, &code, executive());
        assert_eq!(report.outcome, Outcome::Stopped, "{:?}", config);
        assert!(host.stack().is_empty());
        assert_eq!(host.gas_used(), 12, "{:?}", config);

        let expected_steps = if config.optimize { 3 } else { 4 };
        assert_eq!(report.steps, expected_steps, "{:?}", config);

        if config.trace == TraceLevel::Verbose {
            let expected: &[&str] = if config.optimize {
                &["JUMPC", "JUMPDEST", "STOP"]
            } else {
                &["PUSH1", "JUMP", "JUMPDEST", "STOP"]
            };
            assert_eq!(sink.names(), expected);
            let pcs: Vec<usize> = sink.records.iter().map(|r| r.pc).collect();
            let expected_pcs: &[usize] = if config.optimize { &[0, 5, 6] } else { &[0, 2, 5, 6] };
            assert_eq!(pcs, expected_pcs);
        } else {
            assert!(sink.records.is_empty());
        }
    }
}

#[test]
fn test_undefined_opcode_keeps_prior_pushes() {
    let code = [0x60, 0x01, 0x60, 0x02, 0x0c];
    for config in configs() {
        let (report, host) = run(config, &code);
        assert_eq!(report.outcome, Outcome::Faulted(Fault::BadInstruction), "{:?}", config);
        assert_eq!(report.steps, 3);
        assert_eq!(host.stack(), &[w(1), w(2)]);
    }
}

#[test]
fn test_running_off_the_end_faults() {
    for config in configs() {
        let (report, _) = run(config, &[]);
        assert_eq!(report.outcome, Outcome::Faulted(Fault::BadInstruction));
        assert_eq!(report.steps, 0);

        let (report, host) = run(config, &[0x60, 0x07]);
        assert_eq!(report.outcome, Outcome::Faulted(Fault::BadInstruction));
        assert_eq!(report.steps, 1);
        assert_eq!(host.stack(), &[w(7)]);
    }
}

#[test]
fn test_truncated_push_is_zero_padded() {
    for config in configs() {
        let (report, host) = run(config, &[0x61, 0xaa]);
        assert_eq!(report.outcome, Outcome::Faulted(Fault::BadInstruction));
        assert_eq!(host.stack(), &[w(0xaa00)], "{:?}", config);
    }
}

#[test]
fn test_synthetic_opcodes_in_user_code_fault() {
    for byte in [Opcode::PUSHC, Opcode::JUMPC, Opcode::JUMPCI, Opcode::BAD] {
        for config in configs() {
            let host = executive().with_stack([w(0), w(0)]);
            let (report, _, _) = run_with(config, &[byte.0, 0x5b, 0x00], host);
            assert_eq!(report.outcome, Outcome::Faulted(Fault::BadInstruction), "{} {:?}", byte, config);
        }
    }
}

#[test]
fn test_out_of_gas() {
    let code = assemble("PUSH1 5 PUSH1 3 ADD STOP").unwrap();
    for config in configs() {
        let host = Executive::new(&ExecutiveConfig {
            gas_limit: 8,
            ..ExecutiveConfig::default()
        });
        let (report, host, _) = run_with(config, &code, host);
        assert_eq!(report.outcome, Outcome::Faulted(Fault::OutOfResource), "{:?}", config);
        assert_eq!(report.steps, 3);
        assert_eq!(host.stack(), &[w(5), w(3)]);
    }
}

#[test]
fn test_fused_jump_preserves_stack_overflow() {
    // PUSH1 1 PUSH1 6 JUMP INVALID JUMPDEST STOP
    let code = [0x60, 0x01, 0x60, 0x06, 0x56, 0xfe, 0x5b, 0x00];
    for config in configs() {
        let host = Executive::new(&ExecutiveConfig {
            stack_limit: 1,
            ..ExecutiveConfig::default()
        });
        let (report, _, _) = run_with(config, &code, host);
        assert_eq!(report.outcome, Outcome::Faulted(Fault::StackOverflow), "{:?}", config);
        assert_eq!(report.steps, 2);
    }
}

#[test]
fn test_fused_conditional_jump() {
    // PUSH1 5 JUMPI INVALID STOP JUMPDEST STOP
    let code = [0x60, 0x05, 0x57, 0xfe, 0x00, 0x5b, 0x00];
    for config in configs() {
        let (report, _) = run(config, &code);
        assert_eq!(report.outcome, Outcome::Faulted(Fault::StackUnderflow), "{:?}", config);

        let (taken, host, _) = run_with(config, &code, executive().with_stack([w(1)]));
        assert_eq!(taken.outcome, Outcome::Stopped, "{:?}", config);
        assert!(host.stack().is_empty());

        let (fallthrough, _, _) = run_with(config, &code, executive().with_stack([w(0)]));
        assert_eq!(fallthrough.outcome, Outcome::Faulted(Fault::BadInstruction), "{:?}", config);
    }
}

#[test]
fn test_conditional_jump_ignores_bad_target_when_not_taken() {
    // PUSH1 0 PUSH1 0xff JUMPI STOP
    let code = [0x60, 0x00, 0x60, 0xff, 0x57, 0x00];
    for config in configs() {
        let (report, _) = run(config, &code);
        assert_eq!(report.outcome, Outcome::Stopped, "{:?}", config);
    }
}

#[test]
fn test_return_and_revert() {
    let code = assemble("PUSH 0x2a PUSH 0 MSTORE PUSH 32 PUSH 0 RETURN").unwrap();
    let mut expected = vec![0u8; 32];
    expected[31] = 0x2a;
    for config in configs() {
        let (report, host) = run(config, &code);
        assert_eq!(report.outcome, Outcome::Returned(expected.clone()), "{:?}", config);
        assert_eq!(host.gas_used(), 18);
    }

    let code = assemble("PUSH 1 PUSH 0 MSTORE8 PUSH 1 PUSH 0 REVERT").unwrap();
    for config in configs() {
        let (report, _) = run(config, &code);
        assert_eq!(report.outcome, Outcome::Reverted(vec![1]), "{:?}", config);
        assert!(!report.outcome.is_success());
    }
}

#[test]
fn test_suicide_stops() {
    let code = assemble("PUSH 0x42 SUICIDE INVALID").unwrap();
    for config in configs() {
        let (report, host) = run(config, &code);
        assert_eq!(report.outcome, Outcome::Stopped);
        assert_eq!(host.beneficiary(), Some(w(0x42)));
    }
}

#[test]
fn test_pc_pushes_offset() {
    let code = assemble("PUSH1 0 POP PC PC STOP").unwrap();
    for config in configs() {
        let (_, host) = run(config, &code);
        assert_eq!(host.stack(), &[w(3), w(4)], "{:?}", config);
    }
}

#[test]
fn test_world_state_opcodes_are_rejected() {
    let code = assemble("PUSH 0 SLOAD STOP").unwrap();
    for config in configs() {
        let (report, _) = run(config, &code);
        assert_eq!(report.outcome, Outcome::Faulted(Fault::InvalidOperation));
    }
}

#[test]
fn test_trace_counters() {
    let code = assemble("PUSH1 5 PUSH1 3 ADD STOP").unwrap();
    for config in configs() {
        let (report, _, sink) = run_with(config, &code, executive());
        match config.trace {
            TraceLevel::Off => assert_eq!(report.traced, 0),
            TraceLevel::Minimal => {
                assert_eq!(report.traced, report.steps);
                assert!(sink.records.is_empty());
            }
            TraceLevel::Verbose => {
                assert_eq!(report.traced, report.steps);
                let steps: Vec<u64> = sink.records.iter().map(|r| r.step).collect();
                assert_eq!(steps, vec![0, 1, 2, 3]);
            }
        }
    }
}
