//! EVM opcode byte constants.
//!
//! This module provides the raw byte values for the classic EVM instruction set.
//! Each constant is named after its mnemonic (e.g. [`ADD`] = `0x01`). Ranges of
//! related opcodes (`PUSH1..PUSH32`, `DUP1..DUP16`, `SWAP1..SWAP16`, `LOG0..LOG4`)
//! are laid out contiguously, so [`push_width`], [`dup_depth`] and [`swap_depth`]
//! derive their operand from the byte value.
#![allow(missing_docs)]

// ── Stop and arithmetic ──────────────────────────────────────────────────
pub const STOP: u8 = 0x00;
pub const ADD: u8 = 0x01;
pub const MUL: u8 = 0x02;
pub const SUB: u8 = 0x03;
pub const DIV: u8 = 0x04;
pub const SDIV: u8 = 0x05;
pub const MOD: u8 = 0x06;
pub const SMOD: u8 = 0x07;
pub const ADDMOD: u8 = 0x08;
pub const MULMOD: u8 = 0x09;
pub const EXP: u8 = 0x0A;
pub const SIGNEXTEND: u8 = 0x0B;

// ── Comparison and bitwise logic ─────────────────────────────────────────
pub const LT: u8 = 0x10;
pub const GT: u8 = 0x11;
pub const SLT: u8 = 0x12;
pub const SGT: u8 = 0x13;
pub const EQ: u8 = 0x14;
pub const ISZERO: u8 = 0x15;
pub const AND: u8 = 0x16;
pub const OR: u8 = 0x17;
pub const XOR: u8 = 0x18;
pub const NOT: u8 = 0x19;
pub const BYTE: u8 = 0x1A;
pub const SHL: u8 = 0x1B;
pub const SHR: u8 = 0x1C;
pub const SAR: u8 = 0x1D;

// ── Hashing ──────────────────────────────────────────────────────────────
pub const KECCAK256: u8 = 0x20;

// ── Environment ──────────────────────────────────────────────────────────
pub const ADDRESS: u8 = 0x30;
pub const BALANCE: u8 = 0x31;
pub const ORIGIN: u8 = 0x32;
pub const CALLER: u8 = 0x33;
pub const CALLVALUE: u8 = 0x34;
pub const CALLDATALOAD: u8 = 0x35;
pub const CALLDATASIZE: u8 = 0x36;
pub const CALLDATACOPY: u8 = 0x37;
pub const CODESIZE: u8 = 0x38;
pub const CODECOPY: u8 = 0x39;
pub const GASPRICE: u8 = 0x3A;
pub const EXTCODESIZE: u8 = 0x3B;
pub const EXTCODECOPY: u8 = 0x3C;
pub const RETURNDATASIZE: u8 = 0x3D;
pub const RETURNDATACOPY: u8 = 0x3E;
pub const EXTCODEHASH: u8 = 0x3F;

// ── Block information ────────────────────────────────────────────────────
pub const BLOCKHASH: u8 = 0x40;
pub const COINBASE: u8 = 0x41;
pub const TIMESTAMP: u8 = 0x42;
pub const NUMBER: u8 = 0x43;
pub const PREVRANDAO: u8 = 0x44;
pub const GASLIMIT: u8 = 0x45;
pub const CHAINID: u8 = 0x46;
pub const SELFBALANCE: u8 = 0x47;
pub const BASEFEE: u8 = 0x48;

// ── Stack, memory, storage and flow ──────────────────────────────────────
pub const POP: u8 = 0x50;
pub const MLOAD: u8 = 0x51;
pub const MSTORE: u8 = 0x52;
pub const MSTORE8: u8 = 0x53;
pub const SLOAD: u8 = 0x54;
pub const SSTORE: u8 = 0x55;
pub const JUMP: u8 = 0x56;
pub const JUMPI: u8 = 0x57;
pub const PC: u8 = 0x58;
pub const MSIZE: u8 = 0x59;
pub const GAS: u8 = 0x5A;
pub const JUMPDEST: u8 = 0x5B;
pub const PUSH0: u8 = 0x5F;

// ── Push ─────────────────────────────────────────────────────────────────
pub const PUSH1: u8 = 0x60;
pub const PUSH2: u8 = 0x61;
pub const PUSH3: u8 = 0x62;
pub const PUSH4: u8 = 0x63;
pub const PUSH5: u8 = 0x64;
pub const PUSH6: u8 = 0x65;
pub const PUSH7: u8 = 0x66;
pub const PUSH8: u8 = 0x67;
pub const PUSH9: u8 = 0x68;
pub const PUSH10: u8 = 0x69;
pub const PUSH11: u8 = 0x6A;
pub const PUSH12: u8 = 0x6B;
pub const PUSH13: u8 = 0x6C;
pub const PUSH14: u8 = 0x6D;
pub const PUSH15: u8 = 0x6E;
pub const PUSH16: u8 = 0x6F;
pub const PUSH17: u8 = 0x70;
pub const PUSH18: u8 = 0x71;
pub const PUSH19: u8 = 0x72;
pub const PUSH20: u8 = 0x73;
pub const PUSH21: u8 = 0x74;
pub const PUSH22: u8 = 0x75;
pub const PUSH23: u8 = 0x76;
pub const PUSH24: u8 = 0x77;
pub const PUSH25: u8 = 0x78;
pub const PUSH26: u8 = 0x79;
pub const PUSH27: u8 = 0x7A;
pub const PUSH28: u8 = 0x7B;
pub const PUSH29: u8 = 0x7C;
pub const PUSH30: u8 = 0x7D;
pub const PUSH31: u8 = 0x7E;
pub const PUSH32: u8 = 0x7F;

// ── Duplicate ────────────────────────────────────────────────────────────
pub const DUP1: u8 = 0x80;
pub const DUP2: u8 = 0x81;
pub const DUP3: u8 = 0x82;
pub const DUP4: u8 = 0x83;
pub const DUP5: u8 = 0x84;
pub const DUP6: u8 = 0x85;
pub const DUP7: u8 = 0x86;
pub const DUP8: u8 = 0x87;
pub const DUP9: u8 = 0x88;
pub const DUP10: u8 = 0x89;
pub const DUP11: u8 = 0x8A;
pub const DUP12: u8 = 0x8B;
pub const DUP13: u8 = 0x8C;
pub const DUP14: u8 = 0x8D;
pub const DUP15: u8 = 0x8E;
pub const DUP16: u8 = 0x8F;

// ── Exchange ─────────────────────────────────────────────────────────────
pub const SWAP1: u8 = 0x90;
pub const SWAP2: u8 = 0x91;
pub const SWAP3: u8 = 0x92;
pub const SWAP4: u8 = 0x93;
pub const SWAP5: u8 = 0x94;
pub const SWAP6: u8 = 0x95;
pub const SWAP7: u8 = 0x96;
pub const SWAP8: u8 = 0x97;
pub const SWAP9: u8 = 0x98;
pub const SWAP10: u8 = 0x99;
pub const SWAP11: u8 = 0x9A;
pub const SWAP12: u8 = 0x9B;
pub const SWAP13: u8 = 0x9C;
pub const SWAP14: u8 = 0x9D;
pub const SWAP15: u8 = 0x9E;
pub const SWAP16: u8 = 0x9F;

// ── Logging ──────────────────────────────────────────────────────────────
pub const LOG0: u8 = 0xA0;
pub const LOG1: u8 = 0xA1;
pub const LOG2: u8 = 0xA2;
pub const LOG3: u8 = 0xA3;
pub const LOG4: u8 = 0xA4;

// ── System ───────────────────────────────────────────────────────────────
pub const CREATE: u8 = 0xF0;
pub const CALL: u8 = 0xF1;
pub const CALLCODE: u8 = 0xF2;
pub const RETURN: u8 = 0xF3;
pub const DELEGATECALL: u8 = 0xF4;
pub const CREATE2: u8 = 0xF5;
pub const STATICCALL: u8 = 0xFA;
pub const REVERT: u8 = 0xFD;
pub const INVALID: u8 = 0xFE;
pub const SELFDESTRUCT: u8 = 0xFF;

// ── Classification ──────────────────────────────────────────────────────────

/// Number of immediate bytes following `opcode` in the instruction stream.
///
/// Returns `0` for every opcode outside `PUSH1..=PUSH32`.
#[must_use]
pub const fn push_width(opcode: u8) -> usize {
    if opcode >= PUSH1 && opcode <= PUSH32 {
        (opcode - PUSH0) as usize
    } else {
        0
    }
}

/// Stack depth copied by a `DUPn` opcode (1-based), if `opcode` is one.
#[must_use]
pub const fn dup_depth(opcode: u8) -> Option<usize> {
    if opcode >= DUP1 && opcode <= DUP16 {
        Some((opcode - DUP1) as usize + 1)
    } else {
        None
    }
}

/// Stack depth exchanged with the top by a `SWAPn` opcode (1-based), if `opcode` is one.
#[must_use]
pub const fn swap_depth(opcode: u8) -> Option<usize> {
    if opcode >= SWAP1 && opcode <= SWAP16 {
        Some((opcode - SWAP1) as usize + 1)
    } else {
        None
    }
}

/// Number of topics carried by a `LOGn` opcode, if `opcode` is one.
#[must_use]
pub const fn log_topics(opcode: u8) -> Option<usize> {
    if opcode >= LOG0 && opcode <= LOG4 {
        Some((opcode - LOG0) as usize)
    } else {
        None
    }
}

/// Returns `true` if `opcode` ends the local basic-block horizon used by the guard scanner.
///
/// Jumps, jump targets, the call/create family, `RETURN`, `REVERT` and `SELFDESTRUCT`
/// terminate a scan. `STOP` does not.
#[must_use]
pub const fn is_block_boundary(opcode: u8) -> bool {
    matches!(
        opcode,
        JUMP | JUMPI
            | JUMPDEST
            | CREATE
            | CREATE2
            | CALL
            | CALLCODE
            | RETURN
            | DELEGATECALL
            | STATICCALL
            | REVERT
            | SELFDESTRUCT
    )
}

/// Returns the mnemonic for a defined opcode, or `None` for unassigned bytes.
#[must_use]
pub const fn mnemonic(opcode: u8) -> Option<&'static str> {
    let name = match opcode {
        STOP => "STOP",
        ADD => "ADD",
        MUL => "MUL",
        SUB => "SUB",
        DIV => "DIV",
        SDIV => "SDIV",
        MOD => "MOD",
        SMOD => "SMOD",
        ADDMOD => "ADDMOD",
        MULMOD => "MULMOD",
        EXP => "EXP",
        SIGNEXTEND => "SIGNEXTEND",
        LT => "LT",
        GT => "GT",
        SLT => "SLT",
        SGT => "SGT",
        EQ => "EQ",
        ISZERO => "ISZERO",
        AND => "AND",
        OR => "OR",
        XOR => "XOR",
        NOT => "NOT",
        BYTE => "BYTE",
        SHL => "SHL",
        SHR => "SHR",
        SAR => "SAR",
        KECCAK256 => "KECCAK256",
        ADDRESS => "ADDRESS",
        BALANCE => "BALANCE",
        ORIGIN => "ORIGIN",
        CALLER => "CALLER",
        CALLVALUE => "CALLVALUE",
        CALLDATALOAD => "CALLDATALOAD",
        CALLDATASIZE => "CALLDATASIZE",
        CALLDATACOPY => "CALLDATACOPY",
        CODESIZE => "CODESIZE",
        CODECOPY => "CODECOPY",
        GASPRICE => "GASPRICE",
        EXTCODESIZE => "EXTCODESIZE",
        EXTCODECOPY => "EXTCODECOPY",
        RETURNDATASIZE => "RETURNDATASIZE",
        RETURNDATACOPY => "RETURNDATACOPY",
        EXTCODEHASH => "EXTCODEHASH",
        BLOCKHASH => "BLOCKHASH",
        COINBASE => "COINBASE",
        TIMESTAMP => "TIMESTAMP",
        NUMBER => "NUMBER",
        PREVRANDAO => "PREVRANDAO",
        GASLIMIT => "GASLIMIT",
        CHAINID => "CHAINID",
        SELFBALANCE => "SELFBALANCE",
        BASEFEE => "BASEFEE",
        POP => "POP",
        MLOAD => "MLOAD",
        MSTORE => "MSTORE",
        MSTORE8 => "MSTORE8",
        SLOAD => "SLOAD",
        SSTORE => "SSTORE",
        JUMP => "JUMP",
        JUMPI => "JUMPI",
        PC => "PC",
        MSIZE => "MSIZE",
        GAS => "GAS",
        JUMPDEST => "JUMPDEST",
        PUSH0 => "PUSH0",
        PUSH1 => "PUSH1",
        PUSH2 => "PUSH2",
        PUSH3 => "PUSH3",
        PUSH4 => "PUSH4",
        PUSH5 => "PUSH5",
        PUSH6 => "PUSH6",
        PUSH7 => "PUSH7",
        PUSH8 => "PUSH8",
        PUSH9 => "PUSH9",
        PUSH10 => "PUSH10",
        PUSH11 => "PUSH11",
        PUSH12 => "PUSH12",
        PUSH13 => "PUSH13",
        PUSH14 => "PUSH14",
        PUSH15 => "PUSH15",
        PUSH16 => "PUSH16",
        PUSH17 => "PUSH17",
        PUSH18 => "PUSH18",
        PUSH19 => "PUSH19",
        PUSH20 => "PUSH20",
        PUSH21 => "PUSH21",
        PUSH22 => "PUSH22",
        PUSH23 => "PUSH23",
        PUSH24 => "PUSH24",
        PUSH25 => "PUSH25",
        PUSH26 => "PUSH26",
        PUSH27 => "PUSH27",
        PUSH28 => "PUSH28",
        PUSH29 => "PUSH29",
        PUSH30 => "PUSH30",
        PUSH31 => "PUSH31",
        PUSH32 => "PUSH32",
        DUP1 => "DUP1",
        DUP2 => "DUP2",
        DUP3 => "DUP3",
        DUP4 => "DUP4",
        DUP5 => "DUP5",
        DUP6 => "DUP6",
        DUP7 => "DUP7",
        DUP8 => "DUP8",
        DUP9 => "DUP9",
        DUP10 => "DUP10",
        DUP11 => "DUP11",
        DUP12 => "DUP12",
        DUP13 => "DUP13",
        DUP14 => "DUP14",
        DUP15 => "DUP15",
        DUP16 => "DUP16",
        SWAP1 => "SWAP1",
        SWAP2 => "SWAP2",
        SWAP3 => "SWAP3",
        SWAP4 => "SWAP4",
        SWAP5 => "SWAP5",
        SWAP6 => "SWAP6",
        SWAP7 => "SWAP7",
        SWAP8 => "SWAP8",
        SWAP9 => "SWAP9",
        SWAP10 => "SWAP10",
        SWAP11 => "SWAP11",
        SWAP12 => "SWAP12",
        SWAP13 => "SWAP13",
        SWAP14 => "SWAP14",
        SWAP15 => "SWAP15",
        SWAP16 => "SWAP16",
        LOG0 => "LOG0",
        LOG1 => "LOG1",
        LOG2 => "LOG2",
        LOG3 => "LOG3",
        LOG4 => "LOG4",
        CREATE => "CREATE",
        CALL => "CALL",
        CALLCODE => "CALLCODE",
        RETURN => "RETURN",
        DELEGATECALL => "DELEGATECALL",
        CREATE2 => "CREATE2",
        STATICCALL => "STATICCALL",
        REVERT => "REVERT",
        INVALID => "INVALID",
        SELFDESTRUCT => "SELFDESTRUCT",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_contiguous() {
        assert_eq!(PUSH32, 0x7F);
        assert_eq!(DUP16, 0x8F);
        assert_eq!(SWAP16, 0x9F);
        assert_eq!(LOG4, 0xA4);
    }

    #[test]
    fn push_widths() {
        assert_eq!(push_width(PUSH0), 0);
        assert_eq!(push_width(PUSH1), 1);
        assert_eq!(push_width(PUSH20), 20);
        assert_eq!(push_width(PUSH32), 32);
        assert_eq!(push_width(ADD), 0);
    }

    #[test]
    fn stack_depths() {
        assert_eq!(dup_depth(DUP1), Some(1));
        assert_eq!(dup_depth(DUP16), Some(16));
        assert_eq!(dup_depth(SWAP1), None);
        assert_eq!(swap_depth(SWAP4), Some(4));
        assert_eq!(log_topics(LOG2), Some(2));
        assert_eq!(log_topics(CREATE), None);
    }

    #[test]
    fn boundaries() {
        assert!(is_block_boundary(JUMPI));
        assert!(is_block_boundary(JUMPDEST));
        assert!(is_block_boundary(STATICCALL));
        assert!(!is_block_boundary(STOP));
        assert!(!is_block_boundary(ADD));
    }

    #[test]
    fn mnemonics() {
        assert_eq!(mnemonic(ADD), Some("ADD"));
        assert_eq!(mnemonic(PUSH7), Some("PUSH7"));
        assert_eq!(mnemonic(0x0C), None);
        assert_eq!(mnemonic(0xEF), None);
    }
}
