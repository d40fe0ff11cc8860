//! Overflow detection integration tests.
//!
//! These tests drive the public API end to end:
//! 1. Assemble a contract with `BytecodeEncoder`
//! 2. Install it in an `InMemoryHost`
//! 3. Run a message through an `EmulationProcess`
//! 4. Check the aggregated flags of the session

use std::sync::Arc;

use alloy_primitives::Address;
use proptest::prelude::*;
use taintscope::{
    assembly::{opcodes::*, Bytecode, BytecodeEncoder},
    emulation::{
        guard, AbortSignal, AnalysisConfig, AnalysisSession, CallFrame, ExecutionResult,
        InMemoryHost, Interpreter, Message, ProcessBuilder, StepResult, TaintFlags, Word,
        DEFAULT_GAS_LIMIT,
    },
    Result,
};

fn target() -> Address {
    Address::repeat_byte(0xCC)
}

fn input(word: Word) -> Vec<u8> {
    word.to_be_bytes::<32>().to_vec()
}

/// Runs `code` installed at [`target`] with `data` as call data.
fn run(code: Bytecode, data: Vec<u8>) -> Result<(ExecutionResult, AnalysisSession)> {
    let host = Arc::new(InMemoryHost::new());
    host.insert_account(target(), Word::ZERO, code);
    let process = ProcessBuilder::new().host(host).build()?;
    process.analyze(&Message::call(Address::ZERO, target()).with_input(data))
}

/// `constant <op> calldata[0]`
fn tainted_binary(op: u8, constant: Word) -> Result<Bytecode> {
    let mut encoder = BytecodeEncoder::new();
    encoder
        .push(constant)
        .push_u64(0)
        .emit(CALLDATALOAD)
        .emit(op)
        .emit(STOP);
    encoder.finalize()
}

/// `a <op> b` with both operands constant.
fn constant_binary(op: u8, a: Word, b: Word) -> Result<Bytecode> {
    let mut encoder = BytecodeEncoder::new();
    encoder.push(b).push(a).emit(op).emit(STOP);
    encoder.finalize()
}

fn any_word() -> impl Strategy<Value = Word> {
    prop_oneof![
        any::<[u8; 32]>().prop_map(Word::from_be_bytes),
        any::<u64>().prop_map(Word::from),
        any::<u64>().prop_map(|low| Word::MAX - Word::from(low)),
    ]
}

#[test]
fn test_unguarded_sum_overflows() -> Result<()> {
    let (result, session) = run(tainted_binary(ADD, Word::from(1u64))?, input(Word::MAX))?;

    assert!(result.is_success());
    assert!(session
        .flags()
        .contains(TaintFlags::OVERFLOW | TaintFlags::POTENTIAL_OVERFLOW));
    assert!(!session.flags().contains(TaintFlags::PROTECTED_OVERFLOW));
    Ok(())
}

#[test]
fn test_guarded_sum_is_protected() -> Result<()> {
    // c = a + 1; require(c >= a)
    let mut encoder = BytecodeEncoder::new();
    encoder
        .push_u64(0)
        .emit(CALLDATALOAD)
        .emit(DUP1)
        .push_u64(1)
        .emit(ADD)
        .emit(LT)
        .emit(ISZERO)
        .jumpi("ok")
        .push_u64(0)
        .emit(DUP1)
        .emit(REVERT)
        .label("ok")
        .emit(STOP);

    let (_, session) = run(encoder.finalize()?, input(Word::MAX))?;

    assert!(session
        .flags()
        .contains(TaintFlags::PROTECTED_OVERFLOW | TaintFlags::POTENTIAL_OVERFLOW));
    assert!(!session.flags().contains(TaintFlags::OVERFLOW));
    let report = session.report();
    assert!(report.protected_overflow);
    assert!(!report.unprotected_overflow);
    Ok(())
}

#[test]
fn test_guarded_overflow_reverts() -> Result<()> {
    // same guard, but the require fails for a wrapping sum
    let mut encoder = BytecodeEncoder::new();
    encoder
        .push_u64(0)
        .emit(CALLDATALOAD)
        .emit(DUP1)
        .push_u64(1)
        .emit(ADD)
        .emit(LT)
        .emit(ISZERO)
        .jumpi("ok")
        .push_u64(0)
        .emit(DUP1)
        .emit(REVERT)
        .label("ok")
        .emit(STOP);
    let code = encoder.finalize()?;

    let (wrapped, _) = run(code.clone(), input(Word::MAX))?;
    let (fine, _) = run(code, input(Word::from(7u64)))?;

    assert!(wrapped.status.is_revert());
    assert!(fine.is_success());
    Ok(())
}

#[test]
fn test_untainted_sum_is_silent() -> Result<()> {
    let (_, session) = run(
        constant_binary(ADD, Word::MAX, Word::from(1u64))?,
        Vec::new(),
    )?;
    assert!(session.flags().is_empty());
    Ok(())
}

#[test]
fn test_scanner_on_public_api() -> Result<()> {
    let mut guarded = BytecodeEncoder::new();
    guarded.emit_all(&[ADD, LT, ISZERO]);
    let guarded = guarded.finalize()?;
    assert!(guard::is_protected(ADD, 0, guarded.bytes()));

    let mut unrelated = BytecodeEncoder::new();
    unrelated.emit_all(&[ADD, POP, CALLER, POP]);
    let unrelated = unrelated.finalize()?;
    assert!(!guard::is_protected(ADD, 0, unrelated.bytes()));
    Ok(())
}

#[test]
fn test_aggregate_flags_only_grow() -> Result<()> {
    let mut encoder = BytecodeEncoder::new();
    encoder
        .push_u64(1)
        .push_u64(0)
        .emit(CALLDATALOAD)
        .emit(ADD)
        .push_u64(10)
        .emit(SWAP1)
        .emit(LT)
        .jumpi("end")
        .label("end")
        .push_u64(32)
        .push_u64(0)
        .emit(RETURN);
    let code = encoder.finalize()?;

    let host = InMemoryHost::new();
    let config = AnalysisConfig::default();
    let abort = AbortSignal::new();
    let mut session = AnalysisSession::new();
    let mut interpreter = Interpreter::new(&host, &mut session, &config, &abort, None);
    let mut frame = CallFrame::new(
        code,
        input(Word::MAX),
        target(),
        target(),
        Address::ZERO,
        Word::ZERO,
        DEFAULT_GAS_LIMIT,
        false,
        0,
    );

    let mut seen = Vec::new();
    loop {
        let step = interpreter.step(&mut frame)?;
        seen.push(interpreter.session().flags());
        match step {
            StepResult::Continue => frame.pc.advance_current(),
            StepResult::Jump { target } => frame.pc.jump_to(target),
            StepResult::Halt(_) => break,
        }
    }

    assert!(seen.windows(2).all(|pair| pair[1].contains(pair[0])));
    let last = seen.last().copied().unwrap_or_default();
    assert!(last.contains(TaintFlags::OVERFLOW | TaintFlags::BRANCH));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_add_flags_iff_wrapped(a in any_word(), b in any_word()) {
        let (_, session) = run(tainted_binary(ADD, b).unwrap(), input(a)).unwrap();
        let sum = a.wrapping_add(b);
        prop_assert_eq!(
            session.flags().contains(TaintFlags::POTENTIAL_OVERFLOW),
            sum < a || sum < b
        );
    }

    #[test]
    fn prop_mul_flags_iff_wrapped(a in any_word(), b in any_word()) {
        prop_assume!(!a.is_zero());
        let (_, session) = run(tainted_binary(MUL, b).unwrap(), input(a)).unwrap();
        let product = a.wrapping_mul(b);
        prop_assert_eq!(
            session.flags().contains(TaintFlags::POTENTIAL_OVERFLOW),
            product / a != b
        );
    }

    #[test]
    fn prop_untainted_never_flags(a in any_word(), b in any_word()) {
        let (_, session) = run(constant_binary(ADD, a, b).unwrap(), Vec::new()).unwrap();
        prop_assert!(session.flags().is_empty());
    }
}
