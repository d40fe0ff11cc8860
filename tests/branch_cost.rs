//! Branch cost and path recording integration tests.
//!
//! A fuzzer reads two things back from a run: the branch distances of tainted comparisons
//! that fed a conditional jump, and the conditional jumps that were taken. These tests check
//! both through the public API, including the JSON rendering handed to external drivers.

use std::sync::Arc;

use alloy_primitives::Address;
use taintscope::{
    assembly::{opcodes::*, Bytecode, BytecodeEncoder},
    emulation::{
        AnalysisConfig, AnalysisSession, InMemoryHost, Message, PathEntry, ProcessBuilder,
        TaintFlags, Word, SOLC_SELECTOR_LOAD_PC,
    },
    Result,
};

fn target() -> Address {
    Address::repeat_byte(0xCC)
}

fn word(value: u64) -> Word {
    Word::from(value)
}

fn analyze(code: Bytecode, input: Vec<u8>, config: AnalysisConfig) -> Result<AnalysisSession> {
    let host = Arc::new(InMemoryHost::new());
    host.insert_account(target(), Word::ZERO, code);
    let process = ProcessBuilder::new().host(host).config(config).build()?;
    let (_, session) = process.analyze(&Message::call(Address::ZERO, target()).with_input(input))?;
    Ok(session)
}

/// `if (calldata[0] <op> 10) goto taken; stop; taken: stop`
///
/// The comparison sits at pc 5 and the `JUMPI` at pc 9; `taken` is pc 11.
fn compare_with_ten(op: u8) -> Result<Bytecode> {
    let mut encoder = BytecodeEncoder::new();
    encoder
        .push_u64(10)
        .push_u64(0)
        .emit(CALLDATALOAD)
        .emit(op)
        .jumpi("taken")
        .emit(STOP)
        .label("taken")
        .emit(STOP);
    encoder.finalize()
}

fn argument(value: u64) -> Vec<u8> {
    word(value).to_be_bytes::<32>().to_vec()
}

#[test]
fn test_lt_true_distances() -> Result<()> {
    let session = analyze(compare_with_ten(LT)?, argument(5), AnalysisConfig::default())?;

    let entries: Vec<_> = session.cost().at(5).map(|entry| entry.distance).collect();
    assert_eq!(entries, vec![word(5), Word::ZERO]);
    assert_eq!(
        session.path().entries(),
        &[PathEntry {
            source: 9,
            destination: 11
        }]
    );
    Ok(())
}

#[test]
fn test_gt_true_distances() -> Result<()> {
    // 15 > 10: five steps from false
    let session = analyze(compare_with_ten(GT)?, argument(15), AnalysisConfig::default())?;

    let branch = session.cost().branches().next().unwrap();
    assert_eq!(branch.if_false, word(5));
    assert_eq!(branch.if_true, Word::ZERO);
    assert_eq!(branch.flip_distance(), word(5));
    assert_eq!(session.path().len(), 1);
    Ok(())
}

#[test]
fn test_lt_false_not_taken() -> Result<()> {
    let session = analyze(compare_with_ten(LT)?, argument(10), AnalysisConfig::default())?;

    let branch = session.cost().branches().next().unwrap();
    assert_eq!(branch.if_false, Word::ZERO);
    assert_eq!(branch.if_true, word(1));
    assert!(session.path().is_empty());
    assert!(session.flags().contains(TaintFlags::BRANCH));
    Ok(())
}

#[test]
fn test_single_tainted_branch_single_path_entry() -> Result<()> {
    let session = analyze(compare_with_ten(EQ)?, argument(10), AnalysisConfig::default())?;

    assert_eq!(session.path().len(), 1);
    assert_eq!(session.cost().len(), 2);
    assert_eq!(session.report().tainted_branches, 1);
    Ok(())
}

#[test]
fn test_loop_records_each_iteration() -> Result<()> {
    // for (i = calldata[0]; i != 0; i--)
    let mut encoder = BytecodeEncoder::new();
    encoder
        .push_u64(0)
        .emit(CALLDATALOAD)
        .label("head")
        .emit(DUP1)
        .push_u64(0)
        .emit(EQ)
        .jumpi("exit")
        .push_u64(1)
        .emit(SWAP1)
        .emit(SUB)
        .jump("head")
        .label("exit")
        .emit(STOP);
    let code = encoder.finalize()?;
    let eq_pc = 7;

    let session = analyze(code, argument(3), AnalysisConfig::default())?;

    // four comparisons: i = 3, 2, 1, 0
    let branches: Vec<_> = session.cost().branches().collect();
    assert_eq!(branches.len(), 4);
    assert!(branches.iter().all(|branch| branch.pc == eq_pc));
    assert_eq!(branches[0].if_true, word(3));
    assert_eq!(branches[3].if_true, Word::ZERO);
    // only the exit jump is conditional and taken
    assert_eq!(session.path().len(), 1);
    Ok(())
}

#[test]
fn test_selector_load_excluded() -> Result<()> {
    // pad the selector load to the solc dispatcher offset
    let mut encoder = BytecodeEncoder::new();
    encoder.push_u64(10);
    while encoder.position() < SOLC_SELECTOR_LOAD_PC - 2 {
        encoder.emit(JUMPDEST);
    }
    encoder
        .push_u64(0)
        .emit(CALLDATALOAD)
        .emit(LT)
        .jumpi("taken")
        .emit(STOP)
        .label("taken")
        .emit(STOP);
    let code = encoder.finalize()?;

    let fuzzing = analyze(code.clone(), argument(5), AnalysisConfig::fuzzing())?;
    assert!(fuzzing.cost().is_empty());
    assert_eq!(fuzzing.path().len(), 1);

    let plain = analyze(code, argument(5), AnalysisConfig::analysis())?;
    assert_eq!(plain.cost().len(), 2);
    Ok(())
}

#[test]
fn test_session_renders() -> Result<()> {
    let session = analyze(compare_with_ten(LT)?, argument(5), AnalysisConfig::default())?;

    let json = session.to_json()?;
    assert!(json.contains("\"path\""));
    assert!(json.contains("\"cost\""));

    let table = session.cost().to_string();
    assert!(table.contains("if_false"));
    assert_eq!(session.path().to_string().lines().count(), 2);
    Ok(())
}
