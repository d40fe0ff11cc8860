//! World state seen by executing code.
//!
//! The interpreter never owns accounts or storage. Everything outside the running frame is
//! reached through the [`Host`] trait, whose methods take `&self` so that one world state can
//! back several independent runs at once. [`InMemoryHost`] is the provided implementation,
//! built on concurrent maps.
//!
//! Reads through the host are taint-opaque: balances, code, storage and block data always
//! enter the stack untainted.
//!
//! State changes are journaled between [`Host::checkpoint`] and [`Host::commit`] /
//! [`Host::revert`], so a frame that reverts or faults leaves the world as it found it.

use std::thread::{self, ThreadId};

use alloy_primitives::{keccak256, Address, B256};
use dashmap::{DashMap, DashSet};
use serde::Serialize;

use crate::{
    assembly::Bytecode,
    emulation::{TaintFlags, Word},
};

/// Block and transaction values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Environment {
    /// `ORIGIN`.
    pub origin: Address,
    /// `GASPRICE`.
    pub gas_price: Word,
    /// `COINBASE`.
    pub coinbase: Address,
    /// `TIMESTAMP`.
    pub timestamp: u64,
    /// `NUMBER`.
    pub number: u64,
    /// `PREVRANDAO`.
    pub prevrandao: B256,
    /// `GASLIMIT`.
    pub gas_limit: u64,
    /// `CHAINID`.
    pub chain_id: u64,
    /// `BASEFEE`.
    pub base_fee: Word,
}

impl Default for Environment {
    fn default() -> Self {
        Environment {
            origin: Address::ZERO,
            gas_price: Word::from(1u64),
            coinbase: Address::ZERO,
            timestamp: 1_700_000_000,
            number: 18_000_000,
            prevrandao: B256::ZERO,
            gas_limit: crate::emulation::DEFAULT_GAS_LIMIT,
            chain_id: 1,
            base_fee: Word::from(7u64),
        }
    }
}

/// A log record emitted by `LOG0`..`LOG4`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Log {
    /// Emitting account.
    pub address: Address,
    /// Indexed topics.
    pub topics: Vec<B256>,
    /// Data bytes.
    pub data: Vec<u8>,
    /// OR of the tags of the data bytes and topics.
    pub taint: TaintFlags,
}

/// Position in a host's change journal, returned by [`Host::checkpoint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    changes: usize,
    depth: usize,
}

/// Access to accounts, storage and block data.
///
/// All methods take `&self`; implementations use interior mutability. Checkpoints nest and
/// belong to the thread that opened them: every frame of a run executes on one thread, and
/// concurrent runs on a shared host never undo each other's changes.
pub trait Host: Send + Sync {
    /// Block and transaction values.
    fn environment(&self) -> &Environment;

    /// Returns `true` if the account exists.
    fn exists(&self, address: Address) -> bool;

    /// Balance of `address`, zero for unknown accounts.
    fn balance(&self, address: Address) -> Word;

    /// Code of `address`, empty for unknown accounts.
    fn code(&self, address: Address) -> Bytecode;

    /// `EXTCODEHASH` of `address`: zero for missing accounts, the hash of the code otherwise.
    fn code_hash(&self, address: Address) -> Word {
        if self.exists(address) {
            self.code(address).hash()
        } else {
            Word::ZERO
        }
    }

    /// Storage slot `key` of `address`.
    fn storage(&self, address: Address, key: Word) -> Word;

    /// Writes a storage slot and returns the previous value.
    fn set_storage(&self, address: Address, key: Word, value: Word) -> Word;

    /// Moves `value` from `from` to `to`. Returns `false` and changes nothing if `from` cannot
    /// afford it.
    fn transfer(&self, from: Address, to: Address, value: Word) -> bool;

    /// Returns the current nonce of `address` and increments it.
    fn bump_nonce(&self, address: Address) -> u64;

    /// Installs `code` as the code of `address`, creating the account if needed.
    fn install_code(&self, address: Address, code: Bytecode);

    /// Hash of block `number`. Only called for the 256 most recent blocks.
    fn block_hash(&self, number: u64) -> B256;

    /// Records a log.
    fn emit_log(&self, log: Log);

    /// Destroys `address`, moving its balance to `beneficiary`.
    fn self_destruct(&self, address: Address, beneficiary: Address);

    /// Opens a checkpoint. Changes made after it are kept by [`commit`](Host::commit) or undone
    /// by [`revert`](Host::revert).
    fn checkpoint(&self) -> Checkpoint;

    /// Keeps the changes made since `checkpoint` and closes it, along with any checkpoint
    /// opened after it.
    fn commit(&self, checkpoint: Checkpoint);

    /// Undoes the changes made since `checkpoint` and closes it, along with any checkpoint
    /// opened after it.
    fn revert(&self, checkpoint: Checkpoint);
}

/// One undoable state change.
#[derive(Clone, Debug)]
enum Change {
    Account {
        address: Address,
        previous: Option<Account>,
    },
    Storage {
        address: Address,
        key: Word,
        previous: Option<Word>,
    },
    Destroyed(Address),
    Log(usize),
}

#[derive(Debug, Default)]
struct Journal {
    open: usize,
    changes: Vec<Change>,
}

#[derive(Clone, Debug, Default)]
struct Account {
    balance: Word,
    nonce: u64,
    code: Bytecode,
}

/// Concurrent in-memory world state.
///
/// # Examples
///
/// ```rust
/// use alloy_primitives::Address;
/// use taintscope::{
///     assembly::Bytecode,
///     emulation::{Host, InMemoryHost, Word},
/// };
///
/// let host = InMemoryHost::new();
/// let contract = Address::repeat_byte(0xCC);
/// host.insert_account(contract, Word::from(100u64), Bytecode::new(vec![0x00]));
///
/// assert!(host.exists(contract));
/// assert_eq!(host.balance(contract), Word::from(100u64));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryHost {
    environment: Environment,
    accounts: DashMap<Address, Account>,
    storage: DashMap<(Address, Word), Word>,
    block_hashes: DashMap<u64, B256>,
    destroyed: DashSet<Address>,
    logs: boxcar::Vec<Log>,
    reverted_logs: DashSet<usize>,
    journals: DashMap<ThreadId, Journal>,
}

impl InMemoryHost {
    /// Creates an empty world with the default environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the environment.
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Creates or replaces an account.
    pub fn insert_account(&self, address: Address, balance: Word, code: Bytecode) {
        self.accounts.insert(
            address,
            Account {
                balance,
                nonce: 0,
                code,
            },
        );
    }

    /// Sets the balance of `address`, creating the account if needed.
    pub fn set_balance(&self, address: Address, balance: Word) {
        self.accounts.entry(address).or_default().balance = balance;
    }

    /// Overrides the hash of block `number`.
    pub fn set_block_hash(&self, number: u64, hash: B256) {
        self.block_hashes.insert(number, hash);
    }

    /// Logs emitted so far and not reverted, in order.
    #[must_use]
    pub fn logs(&self) -> Vec<Log> {
        self.logs
            .iter()
            .filter(|(index, _)| !self.reverted_logs.contains(index))
            .map(|(_, log)| log.clone())
            .collect()
    }

    /// Returns `true` if `address` self-destructed.
    #[must_use]
    pub fn is_destroyed(&self, address: Address) -> bool {
        self.destroyed.contains(&address)
    }

    /// Appends the change built by `change` if this thread has a checkpoint open.
    fn record(&self, change: impl FnOnce() -> Change) {
        let thread = thread::current().id();
        if !self
            .journals
            .get(&thread)
            .is_some_and(|journal| journal.open > 0)
        {
            return;
        }
        let change = change();
        if let Some(mut journal) = self.journals.get_mut(&thread) {
            journal.changes.push(change);
        }
    }

    /// Journals the current state of `address` before it is modified.
    fn touch_account(&self, address: Address) {
        self.record(|| Change::Account {
            address,
            previous: self.accounts.get(&address).map(|account| account.clone()),
        });
    }

    /// Closes `checkpoint` and returns the changes made after it, oldest first.
    fn close(&self, checkpoint: Checkpoint) -> Vec<Change> {
        let Some(mut journal) = self.journals.get_mut(&thread::current().id()) else {
            return Vec::new();
        };
        journal.open = checkpoint.depth;
        let start = checkpoint.changes.min(journal.changes.len());
        let undone = journal.changes.split_off(start);
        if journal.open == 0 {
            journal.changes.clear();
        }
        undone
    }

    fn undo(&self, change: Change) {
        match change {
            Change::Account { address, previous } => match previous {
                Some(account) => {
                    self.accounts.insert(address, account);
                }
                None => {
                    self.accounts.remove(&address);
                }
            },
            Change::Storage {
                address,
                key,
                previous,
            } => match previous {
                Some(value) => {
                    self.storage.insert((address, key), value);
                }
                None => {
                    self.storage.remove(&(address, key));
                }
            },
            Change::Destroyed(address) => {
                self.destroyed.remove(&address);
            }
            Change::Log(index) => {
                self.reverted_logs.insert(index);
            }
        }
    }
}

impl Host for InMemoryHost {
    fn environment(&self) -> &Environment {
        &self.environment
    }

    fn exists(&self, address: Address) -> bool {
        self.accounts.contains_key(&address)
    }

    fn balance(&self, address: Address) -> Word {
        self.accounts
            .get(&address)
            .map_or(Word::ZERO, |account| account.balance)
    }

    fn code(&self, address: Address) -> Bytecode {
        self.accounts
            .get(&address)
            .map(|account| account.code.clone())
            .unwrap_or_default()
    }

    fn storage(&self, address: Address, key: Word) -> Word {
        self.storage
            .get(&(address, key))
            .map_or(Word::ZERO, |value| *value)
    }

    fn set_storage(&self, address: Address, key: Word, value: Word) -> Word {
        let previous = self.storage.insert((address, key), value);
        self.record(|| Change::Storage {
            address,
            key,
            previous,
        });
        previous.unwrap_or(Word::ZERO)
    }

    fn transfer(&self, from: Address, to: Address, value: Word) -> bool {
        if value.is_zero() {
            return true;
        }
        if self.balance(from) < value {
            return false;
        }
        self.touch_account(from);
        self.touch_account(to);
        {
            let Some(mut sender) = self.accounts.get_mut(&from) else {
                return false;
            };
            if sender.balance < value {
                return false;
            }
            sender.balance -= value;
        }
        let mut recipient = self.accounts.entry(to).or_default();
        recipient.balance = recipient.balance.saturating_add(value);
        true
    }

    fn bump_nonce(&self, address: Address) -> u64 {
        self.touch_account(address);
        let mut account = self.accounts.entry(address).or_default();
        let nonce = account.nonce;
        account.nonce = nonce.saturating_add(1);
        nonce
    }

    fn install_code(&self, address: Address, code: Bytecode) {
        self.touch_account(address);
        let mut account = self.accounts.entry(address).or_default();
        account.code = code;
        account.nonce = account.nonce.max(1);
    }

    fn block_hash(&self, number: u64) -> B256 {
        self.block_hashes
            .get(&number)
            .map_or_else(|| keccak256(number.to_be_bytes()), |hash| *hash)
    }

    fn emit_log(&self, log: Log) {
        let index = self.logs.push(log);
        self.record(|| Change::Log(index));
    }

    fn self_destruct(&self, address: Address, beneficiary: Address) {
        let balance = self.balance(address);
        if address != beneficiary {
            self.transfer(address, beneficiary, balance);
        }
        if self.destroyed.insert(address) {
            self.record(|| Change::Destroyed(address));
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        let mut journal = self.journals.entry(thread::current().id()).or_default();
        let checkpoint = Checkpoint {
            changes: journal.changes.len(),
            depth: journal.open,
        };
        journal.open += 1;
        checkpoint
    }

    fn commit(&self, checkpoint: Checkpoint) {
        let mut journal = self.journals.entry(thread::current().id()).or_default();
        journal.open = checkpoint.depth;
        if journal.open == 0 {
            journal.changes.clear();
        }
    }

    fn revert(&self, checkpoint: Checkpoint) {
        for change in self.close(checkpoint).into_iter().rev() {
            self.undo(change);
        }
    }
}

/// Converts a block hash to the word pushed by `BLOCKHASH`.
pub(crate) fn hash_word(hash: B256) -> Word {
    Word::from_be_bytes(hash.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn storage_roundtrip() {
        let host = InMemoryHost::new();
        let key = Word::from(1u64);
        assert_eq!(host.storage(address(1), key), Word::ZERO);
        assert_eq!(host.set_storage(address(1), key, Word::from(5u64)), Word::ZERO);
        assert_eq!(
            host.set_storage(address(1), key, Word::from(6u64)),
            Word::from(5u64)
        );
        assert_eq!(host.storage(address(1), key), Word::from(6u64));
        assert_eq!(host.storage(address(2), key), Word::ZERO);
    }

    #[test]
    fn transfer_checks_balance() {
        let host = InMemoryHost::new();
        host.set_balance(address(1), Word::from(10u64));

        assert!(!host.transfer(address(1), address(2), Word::from(11u64)));
        assert!(host.transfer(address(1), address(2), Word::from(4u64)));
        assert_eq!(host.balance(address(1)), Word::from(6u64));
        assert_eq!(host.balance(address(2)), Word::from(4u64));
        assert!(host.transfer(address(3), address(2), Word::ZERO));
    }

    #[test]
    fn nonce_and_code() {
        let host = InMemoryHost::new();
        assert_eq!(host.bump_nonce(address(1)), 0);
        assert_eq!(host.bump_nonce(address(1)), 1);

        assert_eq!(host.code_hash(address(9)), Word::ZERO);
        host.install_code(address(9), Bytecode::new(vec![0x00]));
        assert_eq!(host.code(address(9)).len(), 1);
        assert_eq!(host.code_hash(address(9)), host.code(address(9)).hash());
    }

    #[test]
    fn logs_and_self_destruct() {
        let host = InMemoryHost::new();
        host.set_balance(address(1), Word::from(3u64));
        host.emit_log(Log {
            address: address(1),
            topics: vec![B256::ZERO],
            data: vec![1, 2],
            taint: TaintFlags::EXTERNAL,
        });
        host.self_destruct(address(1), address(2));

        assert_eq!(host.logs().len(), 1);
        assert!(host.is_destroyed(address(1)));
        assert_eq!(host.balance(address(2)), Word::from(3u64));
    }

    #[test]
    fn revert_restores_state() {
        let host = InMemoryHost::new();
        let key = Word::from(1u64);
        host.set_balance(address(1), Word::from(10u64));
        host.set_storage(address(1), key, Word::from(5u64));

        let checkpoint = host.checkpoint();
        host.set_storage(address(1), key, Word::from(6u64));
        host.set_storage(address(1), Word::from(2u64), Word::from(9u64));
        assert!(host.transfer(address(1), address(2), Word::from(4u64)));
        assert_eq!(host.bump_nonce(address(1)), 0);
        host.emit_log(Log {
            address: address(1),
            topics: Vec::new(),
            data: Vec::new(),
            taint: TaintFlags::SAFE,
        });
        host.self_destruct(address(1), address(3));
        host.revert(checkpoint);

        assert_eq!(host.storage(address(1), key), Word::from(5u64));
        assert_eq!(host.storage(address(1), Word::from(2u64)), Word::ZERO);
        assert_eq!(host.balance(address(1)), Word::from(10u64));
        assert!(!host.exists(address(2)));
        assert!(!host.exists(address(3)));
        assert_eq!(host.bump_nonce(address(1)), 0);
        assert!(host.logs().is_empty());
        assert!(!host.is_destroyed(address(1)));
    }

    #[test]
    fn nested_checkpoints() {
        let host = InMemoryHost::new();
        let key = Word::ZERO;

        let outer = host.checkpoint();
        host.set_storage(address(1), key, Word::from(1u64));
        let inner = host.checkpoint();
        host.set_storage(address(1), key, Word::from(2u64));
        host.commit(inner);
        assert_eq!(host.storage(address(1), key), Word::from(2u64));

        let failed = host.checkpoint();
        host.set_storage(address(1), key, Word::from(3u64));
        host.revert(failed);
        assert_eq!(host.storage(address(1), key), Word::from(2u64));

        host.revert(outer);
        assert_eq!(host.storage(address(1), key), Word::ZERO);
    }

    #[test]
    fn revert_closes_abandoned_checkpoints() {
        let host = InMemoryHost::new();
        let key = Word::ZERO;

        let outer = host.checkpoint();
        let _abandoned = host.checkpoint();
        host.set_storage(address(1), key, Word::from(4u64));
        host.revert(outer);
        assert_eq!(host.storage(address(1), key), Word::ZERO);

        // nothing is journaled once every checkpoint is closed
        host.set_storage(address(1), key, Word::from(5u64));
        let checkpoint = host.checkpoint();
        host.commit(checkpoint);
        assert_eq!(host.storage(address(1), key), Word::from(5u64));
    }

    #[test]
    fn commit_keeps_state() {
        let host = InMemoryHost::new();
        let checkpoint = host.checkpoint();
        host.install_code(address(4), Bytecode::new(vec![0x00]));
        host.commit(checkpoint);
        assert_eq!(host.code(address(4)).len(), 1);
    }

    #[test]
    fn block_hash_override() {
        let host = InMemoryHost::new();
        host.set_block_hash(7, B256::repeat_byte(0xAB));
        assert_eq!(host.block_hash(7), B256::repeat_byte(0xAB));
        assert_ne!(host.block_hash(8), B256::ZERO);
        assert_eq!(hash_word(B256::repeat_byte(0xFF)), Word::MAX);
    }
}
