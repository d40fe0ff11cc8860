//! Benchmarks for the taint-tracking interpreter.
//!
//! Measures dispatch throughput for a few program shapes:
//! - A tight counting loop driven by call data (branch recording on every iteration)
//! - Unguarded and guarded overflow detection
//! - Memory traffic with per-byte taint
//! - A nested call that copies tainted return data back

extern crate taintscope;

use criterion::{criterion_group, criterion_main, Criterion};
use std::{hint::black_box, sync::Arc};
use taintscope::prelude::*;

fn target() -> Address {
    Address::repeat_byte(0xCC)
}

fn argument(value: u64) -> Vec<u8> {
    Word::from(value).to_be_bytes::<32>().to_vec()
}

fn process_for(code: Bytecode) -> EmulationProcess {
    let host = Arc::new(InMemoryHost::new());
    host.insert_account(target(), Word::ZERO, code);
    ProcessBuilder::new().host(host).build().unwrap()
}

/// for (i = calldata[0]; i != 0; i--)
fn counting_loop() -> Bytecode {
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
    encoder.finalize().unwrap()
}

/// Benchmark 1000 loop iterations, each recording a branch cost pair.
fn bench_counting_loop(c: &mut Criterion) {
    let process = process_for(counting_loop());
    let message = Message::call(Address::ZERO, target()).with_input(argument(1000));

    c.bench_function("interpreter_counting_loop_1000", |b| {
        b.iter(|| {
            let (result, session) = process.analyze(black_box(&message)).unwrap();
            black_box((result, session.cost().len()))
        });
    });
}

/// Benchmark an unguarded wrapping sum of a call data argument.
fn bench_unguarded_overflow(c: &mut Criterion) {
    let mut encoder = BytecodeEncoder::new();
    encoder
        .push_u64(1)
        .push_u64(0)
        .emit(CALLDATALOAD)
        .emit(ADD)
        .emit(STOP);
    let process = process_for(encoder.finalize().unwrap());
    let message = Message::call(Address::ZERO, target()).with_input(vec![0xFF; 32]);

    c.bench_function("interpreter_unguarded_overflow", |b| {
        b.iter(|| {
            let (_, session) = process.analyze(black_box(&message)).unwrap();
            black_box(session.flags())
        });
    });
}

/// Benchmark a sum followed by the solc `require(c >= a)` guard, which runs the template scan.
fn bench_guarded_overflow(c: &mut Criterion) {
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
    let process = process_for(encoder.finalize().unwrap());
    let message = Message::call(Address::ZERO, target()).with_input(vec![0xFF; 32]);

    c.bench_function("interpreter_guarded_overflow", |b| {
        b.iter(|| {
            let (result, session) = process.analyze(black_box(&message)).unwrap();
            black_box((result, session.flags()))
        });
    });
}

/// Benchmark copying 4 KiB of call data into memory and hashing it.
fn bench_memory_taint(c: &mut Criterion) {
    let mut encoder = BytecodeEncoder::new();
    encoder
        .emit(CALLDATASIZE)
        .push_u64(0)
        .push_u64(0)
        .emit(CALLDATACOPY)
        .emit(CALLDATASIZE)
        .push_u64(0)
        .emit(KECCAK256)
        .emit(POP)
        .emit(STOP);
    let process = process_for(encoder.finalize().unwrap());
    let message = Message::call(Address::ZERO, target()).with_input(vec![0xAB; 4096]);

    c.bench_function("interpreter_memory_taint_4k", |b| {
        b.iter(|| {
            let (result, _) = process.analyze(black_box(&message)).unwrap();
            black_box(result)
        });
    });
}

/// Benchmark a call into a contract that echoes its call data.
fn bench_nested_call(c: &mut Criterion) {
    let echo = Address::repeat_byte(0xEE);

    let mut callee = BytecodeEncoder::new();
    callee
        .emit(CALLDATASIZE)
        .push_u64(0)
        .push_u64(0)
        .emit(CALLDATACOPY)
        .emit(CALLDATASIZE)
        .push_u64(0)
        .emit(RETURN);

    // call(gas, echo, 0, 0, 32, 0, 32) with calldata[0] stored at 0
    let mut caller = BytecodeEncoder::new();
    caller
        .push_u64(0)
        .emit(CALLDATALOAD)
        .push_u64(0)
        .emit(MSTORE)
        .push_u64(32)
        .push_u64(0)
        .push_u64(32)
        .push_u64(0)
        .push_u64(0)
        .push(Word::from_be_slice(echo.as_slice()))
        .emit(GAS)
        .emit(CALL)
        .emit(POP)
        .push_u64(32)
        .push_u64(0)
        .emit(RETURN);

    let host = Arc::new(InMemoryHost::new());
    host.insert_account(echo, Word::ZERO, callee.finalize().unwrap());
    host.insert_account(target(), Word::ZERO, caller.finalize().unwrap());
    let process = ProcessBuilder::new().host(host).build().unwrap();
    let message = Message::call(Address::ZERO, target()).with_input(argument(42));

    c.bench_function("interpreter_nested_call", |b| {
        b.iter(|| {
            let (result, _) = process.analyze(black_box(&message)).unwrap();
            black_box(result)
        });
    });
}

criterion_group!(
    benches,
    bench_counting_loop,
    bench_unguarded_overflow,
    bench_guarded_overflow,
    bench_memory_taint,
    bench_nested_call,
);
criterion_main!(benches);
