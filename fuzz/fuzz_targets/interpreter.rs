#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use taintscope::prelude::*;

// First byte picks the split between code and call data.
fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = usize::from(split).min(rest.len());
    let (code, input) = rest.split_at(split);

    let target = Address::repeat_byte(0xCC);
    let host = Arc::new(InMemoryHost::new());
    host.insert_account(target, Word::ZERO, Bytecode::new(code));

    let Ok(process) = ProcessBuilder::new()
        .host(host)
        .for_fuzzing()
        .build()
    else {
        return;
    };
    let message = Message::call(Address::ZERO, target)
        .with_input(input)
        .with_gas_limit(1_000_000);
    let _ = process.analyze(&message);
});
