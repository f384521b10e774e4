//! Pass 2: encoding statements into [`CodeEntry`]s against the tables pass 1 built.

use tracing::{debug, info, warn};

use crate::analysis::literal_pool::LiteralPool;
use crate::analysis::memory_placement::{addresses_occupied, split_difference, to_addr, BlockCursor};
use crate::analysis::symbol_table::{Scope, SymbolTable};
use crate::catalog::{Format, InstructionCatalog, InstructionEntry};
use crate::constant::Constant;
use crate::object::{AddressingMode, CodeEntry, Flags, InstructionWord, Modification, Payload, Sign, Text, WORD_MASK};
use crate::parser::{Directive, Statement, IMMEDIATE_MARKER, INDEX_REGISTER, INDIRECT_MARKER};
use crate::util::{is_decimal, leading_decimal};
use crate::Addr;

/// Most bytes a single text record carries.
pub const MAX_TEXT_BYTES: usize = 30;

/// Register names as written in 2-byte format operands.
const REGISTERS: [(&str, u8); 9] = [
    ("A", 0), ("X", 1), ("L", 2), ("B", 3), ("S", 4), ("T", 5), ("F", 6), ("PC", 8), ("SW", 9),
];

fn register_number(name: &str) -> u8 {
    REGISTERS.iter()
        .find(|(register, _)| *register == name)
        .map_or(0, |&(_, number)| number)
}

/// Runs pass 2 over statements whose addresses pass 1 fixed, recording each instruction's
/// flags on its statement and returning the code entries in scan order.
pub fn encode(
    catalog: &InstructionCatalog,
    symbols: &SymbolTable,
    literals: &LiteralPool,
    statements: &mut [Statement],
) -> Vec<CodeEntry> {
    info!(statements = statements.len(), "pass 2 started");
    let mut encoder = Encoder::new(catalog, symbols, literals);
    for (index, statement) in statements.iter_mut().enumerate() {
        encoder.statement(index, statement);
    }
    let code = encoder.finish(statements.len().saturating_sub(1));
    info!(entries = code.len(), "pass 2 finished");
    code
}

struct Encoder<'a> {
    catalog: &'a InstructionCatalog,
    symbols: &'a SymbolTable,
    literals: &'a LiteralPool,
    cursor: BlockCursor,
    location: u64,
    /// Names the current block declared with `EXTREF`.
    external: Vec<String>,
    header: Option<usize>,
    /// The `END` statement and its operand.
    end: Option<(usize, Option<String>)>,
    code: Vec<CodeEntry>,
}

impl<'a> Encoder<'a> {
    fn new(catalog: &'a InstructionCatalog, symbols: &'a SymbolTable, literals: &'a LiteralPool) -> Self {
        Encoder {
            catalog,
            symbols,
            literals,
            cursor: BlockCursor::default(),
            location: 0,
            external: Vec::new(),
            header: None,
            end: None,
            code: Vec::new(),
        }
    }

    fn address(&self) -> Addr {
        to_addr(self.location)
    }

    fn block(&self) -> usize {
        self.cursor.current()
    }

    fn push(&mut self, statement: usize, address: Addr, payload: Payload) {
        self.code.push(CodeEntry::new(statement, address, payload));
    }

    fn statement(&mut self, index: usize, statement: &mut Statement) {
        if statement.is_comment() {
            return;
        }

        let directive = statement.directive();
        if directive.map_or(false, Directive::opens_block) {
            self.open_block(index, statement);
        }
        let address = self.address();
        let catalog = self.catalog;

        if let Some(entry) = catalog.resolve_opcode(&statement.operator) {
            let word = self.instruction(index, statement, entry, address);
            statement.flags = Some(word.flags);
            self.push(index, address, Payload::Text(Text::Instruction(word)));
        } else {
            match directive {
                Some(Directive::Extdef) => {
                    self.push(index, address, Payload::Define { names: statement.operands.clone() });
                }
                Some(Directive::Extref) => {
                    self.external.extend(statement.operands.iter().cloned());
                    self.push(index, address, Payload::Refer { names: statement.operands.clone() });
                }
                Some(Directive::Word) => self.word(index, statement, address),
                Some(Directive::Byte) => {
                    if let Some(constant) = statement.operand(0).and_then(Constant::parse) {
                        self.data(index, address, &constant.bytes());
                    }
                }
                Some(Directive::End) => {
                    self.end = Some((index, statement.operand(0).map(str::to_string)));
                }
                _ => {}
            }
        }

        self.location = self.location.saturating_add(addresses_occupied(statement, catalog));

        if directive.map_or(false, Directive::flushes_literals) {
            let literals = self.literals;
            for literal in literals.flushed_at(index) {
                let address = literal.address.unwrap_or_else(|| self.address());
                let bytes = literal.constant.bytes();
                self.data(index, address, &bytes);
                self.location = address as u64 + bytes.len() as u64;
            }
        }
    }

    fn open_block(&mut self, index: usize, statement: &Statement) {
        self.close_block();
        let block = self.cursor.open();
        self.location = 0;
        self.external.clear();
        self.header = Some(self.code.len());
        let name = statement.label.clone().unwrap_or_default();
        debug!(block, name = %name, "encoding block");
        self.push(index, 0, Payload::Header { name, length: 0 });
    }

    /// Writes the final location counter into the open block's header.
    fn close_block(&mut self) {
        let length = self.address();
        if let Some(header) = self.header.take() {
            if let Payload::Header { length: slot, .. } = &mut self.code[header].payload {
                *slot = length;
            }
        }
    }

    /// Closes the last block and appends the terminator. Without an `END` the terminator
    /// is attributed to `fallback`.
    fn finish(mut self, fallback: usize) -> Vec<CodeEntry> {
        self.close_block();
        let address = self.address();
        let (statement, entry) = self.end.take().unwrap_or((fallback, None));
        self.push(statement, address, Payload::End { entry });
        self.code
    }

    fn instruction(&mut self, index: usize, statement: &Statement, entry: &InstructionEntry, address: Addr) -> InstructionWord {
        match entry.format {
            Format::One if !statement.is_extended() => InstructionWord::format1(entry.opcode),
            Format::Two if !statement.is_extended() => {
                let r1 = statement.operand(0).map_or(0, register_number);
                let r2 = statement.operand(1).map_or(0, register_number);
                InstructionWord::format2(entry.opcode, r1, r2)
            }
            _ => self.memory_instruction(index, statement, entry, address),
        }
    }

    fn memory_instruction(&mut self, index: usize, statement: &Statement, entry: &InstructionEntry, address: Addr) -> InstructionWord {
        let extended = statement.is_extended();
        let operand = match statement.operand(0) {
            Some(operand) if entry.operand_count > 0 => operand,
            _ => {
                let flags = Flags { extended, ..Flags::new(AddressingMode::Simple) };
                return InstructionWord::format3(entry.opcode, flags, 0);
            }
        };

        let (mode, name) = if let Some(name) = operand.strip_prefix(IMMEDIATE_MARKER) {
            (AddressingMode::Immediate, name)
        } else if let Some(name) = operand.strip_prefix(INDIRECT_MARKER) {
            (AddressingMode::Indirect, name)
        } else {
            (AddressingMode::Simple, operand)
        };
        let mut flags = Flags {
            indexed: statement.operand(1) == Some(INDEX_REGISTER),
            extended,
            ..Flags::new(mode)
        };

        let external = self.external.iter().any(|external| external == name);
        flags.pc_relative = mode != AddressingMode::Immediate && !external;

        let payload = if mode == AddressingMode::Immediate {
            leading_decimal(name) as u32
        } else if external {
            if extended {
                self.push(index, address + 1, Payload::Modification(Modification::extended(name)));
            }
            0
        } else if extended {
            if is_decimal(name) {
                leading_decimal(name) as u32
            } else {
                warn!(line = statement.line, symbol = name, "extended operand is not an external reference, using 0");
                0
            }
        } else {
            let next = address + 3;
            let target = self.symbols.resolve(name, Scope::Block(self.block()))
                .or_else(|| self.literals.find(operand).and_then(|literal| literal.address));
            match target {
                Some(target) => target.wrapping_sub(next),
                None => {
                    warn!(line = statement.line, symbol = name, "unresolved operand, using displacement 0");
                    0
                }
            }
        };

        InstructionWord::format3(entry.opcode, flags, payload)
    }

    fn word(&mut self, index: usize, statement: &Statement, address: Addr) {
        let operand = statement.operand(0).unwrap_or("");
        let block = Scope::Block(self.block());

        let value = if is_decimal(operand) {
            leading_decimal(operand) as u32
        } else if let Some((minuend, subtrahend)) = split_difference(operand) {
            match (self.symbols.resolve(minuend, block), self.symbols.resolve(subtrahend, block)) {
                (Some(a), Some(b)) => a.wrapping_sub(b),
                _ => {
                    self.push(index, address + 1, Payload::Modification(Modification::word(Sign::Plus, minuend)));
                    self.push(index, address + 1, Payload::Modification(Modification::word(Sign::Minus, subtrahend)));
                    0
                }
            }
        } else {
            self.symbols.resolve(operand, block).unwrap_or_else(|| {
                warn!(line = statement.line, symbol = operand, "unresolved WORD operand, using 0");
                0
            })
        };

        let bytes = (value & WORD_MASK).to_be_bytes()[1..].to_vec();
        self.push(index, address, Payload::Text(Text::Data(bytes)));
    }

    /// Emits `bytes` as text entries no longer than a text record.
    fn data(&mut self, index: usize, address: Addr, bytes: &[u8]) {
        let mut address = address;
        for chunk in bytes.chunks(MAX_TEXT_BYTES) {
            self.push(index, address, Payload::Text(Text::Data(chunk.to_vec())));
            address += chunk.len() as Addr;
        }
    }
}
