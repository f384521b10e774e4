//! A two-pass assembler for SIC/XE control sections.
//!
//! Pass 1 ([`analysis::assign_locations`]) fixes the address of every statement and builds
//! the symbol table and literal pool. Pass 2 ([`assemble::encode`]) encodes instructions
//! and data into code entries, which [`records::build`] turns into an object deck.

pub mod analysis;
pub mod assemble;
pub mod catalog;
pub mod constant;
pub mod error;
pub mod object;
pub mod output;
pub mod parser;
pub mod records;

mod util;

use tracing::info;

use crate::analysis::literal_pool::LiteralPool;
use crate::analysis::symbol_table::SymbolTable;
use crate::catalog::InstructionCatalog;
use crate::error::ParseError;
use crate::object::CodeEntry;
use crate::parser::Statement;
use crate::records::ObjectDeck;

/// A location within a block.
pub type Addr = u32;

/// Everything both passes produced for one source.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub statements: Vec<Statement>,
    pub symbols: SymbolTable,
    pub literals: LiteralPool,
    pub code: Vec<CodeEntry>,
}

impl Assembly {
    pub fn deck(&self) -> ObjectDeck {
        records::build(&self.code, &self.symbols)
    }
}

pub struct Assembler {
    catalog: InstructionCatalog,
}

impl Assembler {
    pub fn new(catalog: InstructionCatalog) -> Self {
        Assembler { catalog }
    }

    pub fn catalog(&self) -> &InstructionCatalog {
        &self.catalog
    }

    pub fn assemble(&self, source: &str) -> Result<Assembly, ParseError> {
        assemble(&self.catalog, source)
    }
}

/// Parses `source` and runs both passes. Nothing is produced if any line fails to parse.
pub fn assemble(catalog: &InstructionCatalog, source: &str) -> Result<Assembly, ParseError> {
    let mut statements = parser::parse_source(catalog, source)?;
    let (symbols, literals) = analysis::assign_locations(catalog, &mut statements)?;
    let code = assemble::encode(catalog, &symbols, &literals, &mut statements);
    info!(statements = statements.len(), entries = code.len(), "assembled");
    Ok(Assembly { statements, symbols, literals, code })
}
