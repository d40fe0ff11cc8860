//! Simplified gas schedule and per-frame gas meter.
//!
//! The schedule follows the tiered layout of the virtual machine (zero, base, very-low, low,
//! mid, high) with flat costs for state access, calls and creation. It is not fork-accurate;
//! its job is to make out-of-gas faults, call gas forwarding and refunds of unused child gas
//! behave the way contracts expect.
//!
//! Dynamic costs (memory expansion, copies, hashing, `EXP` exponent bytes, logs) are charged by
//! the individual handlers on top of [`static_cost`].

use crate::{
    assembly::opcodes::*,
    emulation::EmulationError,
    Result,
};

/// Default gas limit of a top-level message.
pub const DEFAULT_GAS_LIMIT: u64 = 30_000_000;

pub(crate) const ZERO: u64 = 0;
pub(crate) const BASE: u64 = 2;
pub(crate) const VERY_LOW: u64 = 3;
pub(crate) const LOW: u64 = 5;
pub(crate) const MID: u64 = 8;
pub(crate) const HIGH: u64 = 10;

pub(crate) const JUMPDEST_COST: u64 = 1;
pub(crate) const EXP_BYTE: u64 = 50;
pub(crate) const KECCAK256_BASE: u64 = 30;
pub(crate) const KECCAK256_WORD: u64 = 6;
pub(crate) const COPY_WORD: u64 = 3;
pub(crate) const ACCOUNT_ACCESS: u64 = 2600;
pub(crate) const BLOCKHASH_COST: u64 = 20;
pub(crate) const SLOAD_COST: u64 = 2100;
pub(crate) const SSTORE_SET: u64 = 20_000;
pub(crate) const SSTORE_RESET: u64 = 2900;
pub(crate) const LOG_BASE: u64 = 375;
pub(crate) const LOG_TOPIC: u64 = 375;
pub(crate) const LOG_BYTE: u64 = 8;
pub(crate) const CALL_VALUE: u64 = 9000;
pub(crate) const CALL_STIPEND: u64 = 2300;
pub(crate) const NEW_ACCOUNT: u64 = 25_000;
pub(crate) const CREATE_COST: u64 = 32_000;
pub(crate) const CODE_DEPOSIT_BYTE: u64 = 200;
pub(crate) const SELFDESTRUCT_COST: u64 = 5000;
pub(crate) const MEMORY_WORD: u64 = 3;
pub(crate) const QUADRATIC_DIVISOR: u64 = 512;

/// Static cost of `opcode`, charged before it executes.
///
/// Unassigned opcodes cost nothing; they fault right after.
#[must_use]
pub fn static_cost(opcode: u8) -> u64 {
    match opcode {
        STOP | RETURN | REVERT | INVALID => ZERO,
        ADDRESS | ORIGIN | CALLER | CALLVALUE | CALLDATASIZE | CODESIZE | GASPRICE
        | RETURNDATASIZE | COINBASE | TIMESTAMP | NUMBER | PREVRANDAO | GASLIMIT | CHAINID
        | BASEFEE | POP | PC | MSIZE | GAS | PUSH0 => BASE,
        ADD | SUB | LT | GT | SLT | SGT | EQ | ISZERO | AND | OR | XOR | NOT | BYTE | SHL
        | SHR | SAR | CALLDATALOAD | MLOAD | MSTORE | MSTORE8 | CALLDATACOPY | CODECOPY
        | RETURNDATACOPY => VERY_LOW,
        PUSH1..=PUSH32 | DUP1..=DUP16 | SWAP1..=SWAP16 => VERY_LOW,
        MUL | DIV | SDIV | MOD | SMOD | SIGNEXTEND | SELFBALANCE => LOW,
        ADDMOD | MULMOD | JUMP => MID,
        EXP | JUMPI => HIGH,
        JUMPDEST => JUMPDEST_COST,
        KECCAK256 => KECCAK256_BASE,
        BALANCE | EXTCODESIZE | EXTCODECOPY | EXTCODEHASH => ACCOUNT_ACCESS,
        BLOCKHASH => BLOCKHASH_COST,
        SLOAD => SLOAD_COST,
        LOG0..=LOG4 => LOG_BASE,
        CALL | CALLCODE | DELEGATECALL | STATICCALL => ACCOUNT_ACCESS,
        CREATE | CREATE2 => CREATE_COST,
        SELFDESTRUCT => SELFDESTRUCT_COST,
        _ => ZERO,
    }
}

/// Number of 32-byte words needed to hold `len` bytes.
#[must_use]
pub fn words(len: usize) -> u64 {
    u64::try_from(len.div_ceil(32)).unwrap_or(u64::MAX)
}

/// Total cost of a memory of `words` words: linear plus quadratic part.
#[must_use]
pub fn memory_cost(words: u64) -> u64 {
    words
        .saturating_mul(MEMORY_WORD)
        .saturating_add(words.saturating_mul(words) / QUADRATIC_DIVISOR)
}

/// Per-word cost of copying `len` bytes.
#[must_use]
pub fn copy_cost(len: usize) -> u64 {
    words(len).saturating_mul(COPY_WORD)
}

/// Largest amount of gas a call may forward: all but one 64th of what is left.
#[must_use]
pub fn max_call_gas(remaining: u64) -> u64 {
    remaining - remaining / 64
}

/// Gas accounting for one call frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    used: u64,
}

impl GasMeter {
    /// Creates a meter with `limit` gas available.
    #[must_use]
    pub fn new(limit: u64) -> Self {
        GasMeter { limit, used: 0 }
    }

    /// Gas the frame started with.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Gas consumed so far.
    #[must_use]
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Gas still available.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }

    /// Consumes `amount` gas.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::OutOfGas`] if less than `amount` is left; nothing is consumed
    /// in that case.
    pub fn charge(&mut self, amount: u64) -> Result<()> {
        let remaining = self.remaining();
        if amount > remaining {
            return Err(EmulationError::OutOfGas {
                required: amount,
                remaining,
            }
            .into());
        }
        self.used += amount;
        Ok(())
    }

    /// Charges the expansion of memory from `current_len` to `new_len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::OutOfGas`] if the expansion is not affordable.
    pub fn charge_memory(&mut self, current_len: usize, new_len: usize) -> Result<()> {
        if new_len <= current_len {
            return Ok(());
        }
        let cost = memory_cost(words(new_len)).saturating_sub(memory_cost(words(current_len)));
        self.charge(cost)
    }

    /// Returns unused gas of a child frame to this frame.
    pub fn refund(&mut self, amount: u64) {
        self.used = self.used.saturating_sub(amount);
    }

    /// Consumes everything that is left, as a fault does.
    pub fn exhaust(&mut self) {
        self.used = self.limit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn tiers() {
        assert_eq!(static_cost(ADD), VERY_LOW);
        assert_eq!(static_cost(MUL), LOW);
        assert_eq!(static_cost(PUSH32), VERY_LOW);
        assert_eq!(static_cost(JUMPI), HIGH);
        assert_eq!(static_cost(0x0C), ZERO);
    }

    #[test]
    fn memory_expansion() {
        assert_eq!(memory_cost(0), 0);
        assert_eq!(memory_cost(1), 3);
        // 3 * 1024 + 1024^2 / 512
        assert_eq!(memory_cost(1024), 3072 + 2048);
        assert_eq!(words(33), 2);
        assert_eq!(copy_cost(64), 6);
    }

    #[test]
    fn meter_charge_and_refund() {
        let mut meter = GasMeter::new(100);
        meter.charge(60).unwrap();
        assert_eq!(meter.remaining(), 40);

        let err = meter.charge(41).unwrap_err();
        assert!(matches!(
            err,
            Error::Emulation(EmulationError::OutOfGas {
                required: 41,
                remaining: 40
            })
        ));
        assert_eq!(meter.used(), 60);

        meter.refund(20);
        assert_eq!(meter.remaining(), 60);

        meter.exhaust();
        assert_eq!(meter.remaining(), 0);
    }

    #[test]
    fn memory_charge_is_incremental() {
        let mut meter = GasMeter::new(1000);
        meter.charge_memory(0, 32).unwrap();
        assert_eq!(meter.used(), 3);
        meter.charge_memory(32, 32).unwrap();
        assert_eq!(meter.used(), 3);
        meter.charge_memory(32, 64).unwrap();
        assert_eq!(meter.used(), 6);
    }

    #[test]
    fn call_forwarding() {
        assert_eq!(max_call_gas(6400), 6300);
        assert_eq!(max_call_gas(0), 0);
    }
}
