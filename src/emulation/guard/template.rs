//! The guard idiom catalogue.
//!
//! Each [`GuardTemplate`] is a short list of `(relative offset, opcode)` pairs. A template
//! matches at scan position `n` when, for every pair, the byte at `n + offset` equals the opcode.
//! The pairs are anchored at offset 0, so the scan position is always one of the matched bytes.
//!
//! The idioms are the checks emitted by the classic `SafeMath` library and by hand-written
//! `require`/`assert` guards, as compiled by solc:
//!
//! | Family         | Source idiom                          | Direction |
//! |----------------|---------------------------------------|-----------|
//! | Addition       | `assert(c >= a)`                      | forward   |
//! | Addition       | `if (a + b >= a)`                     | both      |
//! | Addition       | `if (a + b > a)` across a `JUMPDEST`  | forward   |
//! | Addition       | `if (a > MAX - b) throw`              | backward  |
//! | Subtraction    | `assert(b <= a)`                      | backward  |
//! | Subtraction    | `if (a >= b)`                         | backward  |
//! | Subtraction    | `if (a < b) throw`                    | backward  |
//! | Multiplication | `assert(a == 0 \|\| c / a == b)`      | forward   |
//! | Multiplication | `if (x > MAX / y) throw`              | backward  |

use strum::{EnumCount, EnumIter};

use crate::assembly::opcodes::*;

/// The arithmetic operation a template protects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum ArithmeticFamily {
    /// `ADD` and `ADDMOD`.
    Addition,
    /// `SUB`.
    Subtraction,
    /// `MUL`.
    Multiplication,
}

impl ArithmeticFamily {
    /// Family of an arithmetic opcode, `None` for opcodes without overflow detection.
    #[must_use]
    pub const fn of(opcode: u8) -> Option<ArithmeticFamily> {
        match opcode {
            ADD | ADDMOD => Some(ArithmeticFamily::Addition),
            SUB => Some(ArithmeticFamily::Subtraction),
            MUL => Some(ArithmeticFamily::Multiplication),
            _ => None,
        }
    }
}

/// Which way the scan walks from the arithmetic instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScanDirection {
    /// Towards higher offsets.
    Forward,
    /// Towards lower offsets.
    Backward,
}

/// A fixed-offset opcode pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GuardTemplate {
    /// Short identifier used in logs and traces.
    pub name: &'static str,
    /// Operation the idiom protects.
    pub family: ArithmeticFamily,
    /// Scan that evaluates the template.
    pub direction: ScanDirection,
    /// `(offset, opcode)` pairs relative to the scan position.
    pub pattern: &'static [(isize, u8)],
}

impl GuardTemplate {
    /// Returns `true` if every pair of the pattern matches around `position`.
    ///
    /// Offsets that fall before the start or past the end of `code` never match.
    #[must_use]
    pub fn matches_at(&self, code: &[u8], position: usize) -> bool {
        self.pattern.iter().all(|&(offset, opcode)| {
            position
                .checked_add_signed(offset)
                .and_then(|index| code.get(index))
                .is_some_and(|&byte| byte == opcode)
        })
    }
}

use ArithmeticFamily::{Addition, Multiplication, Subtraction};
use ScanDirection::{Backward, Forward};

/// Every known guard idiom.
pub const CATALOGUE: &[GuardTemplate] = &[
    GuardTemplate {
        name: "add-assert-ge",
        family: Addition,
        direction: Forward,
        pattern: &[(0, DUP4), (1, DUP2), (2, LT), (3, ISZERO)],
    },
    GuardTemplate {
        name: "add-require-ge",
        family: Addition,
        direction: Forward,
        pattern: &[(0, ADD), (1, LT), (2, ISZERO)],
    },
    GuardTemplate {
        name: "add-require-gt",
        family: Addition,
        direction: Forward,
        pattern: &[(0, ADD), (1, GT), (2, JUMPDEST), (3, ISZERO)],
    },
    GuardTemplate {
        name: "add-require-ge",
        family: Addition,
        direction: Backward,
        pattern: &[(0, ADD), (1, LT), (2, ISZERO)],
    },
    GuardTemplate {
        name: "add-max-minus",
        family: Addition,
        direction: Backward,
        pattern: &[(0, ADD), (-15, SUB), (-14, DUP4), (-13, GT), (-12, ISZERO)],
    },
    GuardTemplate {
        name: "sub-assert-le",
        family: Subtraction,
        direction: Backward,
        pattern: &[(0, SUB), (-14, DUP3), (-13, DUP3), (-12, GT), (-11, ISZERO)],
    },
    GuardTemplate {
        name: "sub-require-ge",
        family: Subtraction,
        direction: Backward,
        pattern: &[(0, SUB), (-11, DUP2), (-10, DUP4), (-9, LT), (-8, ISZERO)],
    },
    GuardTemplate {
        name: "sub-throw-lt",
        family: Subtraction,
        direction: Backward,
        pattern: &[(0, SUB), (-15, DUP2), (-14, DUP4), (-13, LT), (-12, ISZERO)],
    },
    GuardTemplate {
        name: "mul-assert-div",
        family: Multiplication,
        direction: Forward,
        pattern: &[(0, PUSH1), (2, DUP5), (3, EQ), (22, DIV), (23, EQ)],
    },
    GuardTemplate {
        name: "mul-max-div",
        family: Multiplication,
        direction: Backward,
        pattern: &[(0, MUL), (-15, DIV), (-14, DUP4), (-13, GT), (-12, ISZERO)],
    },
];

/// Templates of `family` evaluated by scans in `direction`.
pub fn templates(
    family: ArithmeticFamily,
    direction: ScanDirection,
) -> impl Iterator<Item = &'static GuardTemplate> {
    CATALOGUE
        .iter()
        .filter(move |template| template.family == family && template.direction == direction)
}
