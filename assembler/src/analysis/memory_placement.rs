use crate::catalog::InstructionCatalog;
use crate::constant::Constant;
use crate::parser::{Directive, Statement};
use crate::util::leading_decimal;
use crate::Addr;

/// First location past the 20-bit address space reachable by extended-format instructions.
pub const MAX_ADDRESS: u64 = 0x10_0000;

pub const WORD_BYTES: u64 = 3;

/// Operand of `EQU` meaning "the current location".
pub const CURRENT_LOCATION: &str = "*";

/// A two-term symbolic difference, `A-B`. Anything else, including a leading minus, is not one.
pub(crate) fn split_difference(operand: &str) -> Option<(&str, &str)> {
    let (minuend, subtrahend) = operand.split_once('-')?;
    if minuend.is_empty() || subtrahend.is_empty() {
        None
    } else {
        Some((minuend, subtrahend))
    }
}

/// Number of bytes the statement adds to the location counter, literal pool flushes excluded.
pub(crate) fn addresses_occupied(statement: &Statement, catalog: &InstructionCatalog) -> u64 {
    use Directive::*;

    if let Some(entry) = catalog.resolve_opcode(&statement.operator) {
        // `+` selects the 4-byte format whatever the catalog format is.
        return if statement.is_extended() { 4 } else { entry.format.bytes() as u64 };
    }

    let count = || statement.operand(0).map_or(0, leading_decimal).max(0) as u64;
    match statement.directive() {
        Some(Resw) => WORD_BYTES.saturating_mul(count()),
        Some(Resb) => count(),
        Some(Word) => WORD_BYTES,
        Some(Byte) => statement.operand(0)
            .and_then(Constant::parse)
            .map_or(0, |constant| constant.len() as u64),
        Some(Equ) => match statement.operand(0) {
            Some(CURRENT_LOCATION) => 0,
            Some(operand) if split_difference(operand).is_some() => 0,
            _ => WORD_BYTES,
        },
        _ => 0,
    }
}

/// Tracks which block the scan is in. Statements ahead of the first
/// `START`/`CSECT` belong to block 0, as does the block `START` opens.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BlockCursor {
    opened: Option<usize>,
}

impl BlockCursor {
    /// Moves to the next block and returns its index.
    pub(crate) fn open(&mut self) -> usize {
        let block = self.opened.map_or(0, |block| block + 1);
        self.opened = Some(block);
        block
    }

    pub(crate) fn current(&self) -> usize {
        self.opened.unwrap_or(0)
    }
}

/// Clamps a location that passed the overflow check to an address.
pub(crate) fn to_addr(location: u64) -> Addr {
    location.min(MAX_ADDRESS) as Addr
}
