//! Rendering code entries as the H/D/R/T/M/E records of an object deck.

use std::fmt::{self, Display, Formatter};

use itertools::Itertools;
use tracing::{debug, warn};

use crate::analysis::symbol_table::{Scope, SymbolTable};
use crate::assemble::MAX_TEXT_BYTES;
use crate::object::{CodeEntry, Payload, RecordKind, Sign};
use crate::Addr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Header { name: String, start: Addr, length: Addr },
    Define(Vec<(String, Addr)>),
    Refer(Vec<String>),
    Text { start: Addr, bytes: Vec<u8> },
    Modification { address: Addr, half_bytes: u8, sign: Sign, name: String },
    /// Only the first block names its entry point.
    End { entry: Option<Addr> },
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Header { .. } => RecordKind::Header,
            Record::Define(_) => RecordKind::Define,
            Record::Refer(_) => RecordKind::Refer,
            Record::Text { .. } => RecordKind::Text,
            Record::Modification { .. } => RecordKind::Modification,
            Record::End { .. } => RecordKind::End,
        }
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind().tag())?;
        match self {
            Record::Header { name, start, length } => write!(f, "{:<6}{:06X}{:06X}", name, start, length),
            Record::Define(definitions) => definitions.iter()
                .try_for_each(|(name, address)| write!(f, "{:<6}{:06X}", name, address)),
            Record::Refer(names) => names.iter()
                .try_for_each(|name| write!(f, "{:<6}", name)),
            Record::Text { start, bytes } => {
                write!(f, "{:06X}{:02X}", start, bytes.len())?;
                bytes.iter().try_for_each(|byte| write!(f, "{:02X}", byte))
            }
            Record::Modification { address, half_bytes, sign, name } => {
                write!(f, "{:06X}{:02X}{}{}", address, half_bytes, sign, name)
            }
            Record::End { entry: Some(entry) } => write!(f, "{:06X}", entry),
            Record::End { entry: None } => Ok(()),
        }
    }
}

/// Records grouped by block, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectDeck {
    pub blocks: Vec<Vec<Record>>,
}

impl ObjectDeck {
    pub fn records(&self) -> impl Iterator<Item=&Record> {
        self.blocks.iter().flatten()
    }
}

/// One record per line, a blank line between blocks.
impl Display for ObjectDeck {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for record in block {
                writeln!(f, "{}", record)?;
            }
        }
        Ok(())
    }
}

/// Builds the deck for `code`, looking up exported names and the entry point in `symbols`.
pub fn build(code: &[CodeEntry], symbols: &SymbolTable) -> ObjectDeck {
    let entry = entry_address(code, symbols);
    let mut builder = DeckBuilder::new(symbols, entry);
    for entry in code {
        builder.entry(entry);
    }
    builder.finish()
}

fn entry_address(code: &[CodeEntry], symbols: &SymbolTable) -> Addr {
    let name = code.iter().find_map(|entry| match &entry.payload {
        Payload::End { entry: Some(name) } => Some(name.as_str()),
        _ => None,
    });
    match name {
        Some(name) => symbols.resolve(name, Scope::Block(0)).unwrap_or_else(|| {
            warn!(symbol = name, "entry point is not defined in the first block, using 0");
            0
        }),
        None => 0,
    }
}

struct DeckBuilder<'a> {
    symbols: &'a SymbolTable,
    entry: Addr,
    blocks: Vec<Vec<Record>>,
    /// Block being built, `None` until something is emitted.
    current: Option<Vec<Record>>,
    run: Vec<&'a CodeEntry>,
    modifications: Vec<Record>,
}

impl<'a> DeckBuilder<'a> {
    fn new(symbols: &'a SymbolTable, entry: Addr) -> Self {
        DeckBuilder {
            symbols,
            entry,
            blocks: Vec::new(),
            current: None,
            run: Vec::new(),
            modifications: Vec::new(),
        }
    }

    fn block_index(&self) -> usize {
        self.blocks.len()
    }

    fn emit(&mut self, record: Record) {
        self.current.get_or_insert_with(Vec::new).push(record);
    }

    fn entry(&mut self, entry: &'a CodeEntry) {
        match &entry.payload {
            Payload::Header { name, length } => {
                self.close_block();
                self.emit(Record::Header { name: name.clone(), start: 0, length: *length });
            }
            Payload::Define { names } => {
                let block = self.block_index();
                let definitions = names.iter()
                    .map(|name| {
                        let address = self.symbols.resolve(name, Scope::Block(block)).unwrap_or_else(|| {
                            warn!(symbol = %name, block, "exported name is not defined, using 0");
                            0
                        });
                        (name.clone(), address)
                    })
                    .collect();
                self.emit(Record::Define(definitions));
            }
            Payload::Refer { names } => self.emit(Record::Refer(names.clone())),
            Payload::Text(text) => {
                let (end, bytes) = self.run_extent();
                if !self.run.is_empty() && (end != entry.address || bytes + text.len() as usize > MAX_TEXT_BYTES) {
                    self.flush_run();
                }
                self.run.push(entry);
            }
            Payload::Modification(modification) => {
                self.modifications.push(Record::Modification {
                    address: entry.address,
                    half_bytes: modification.half_bytes,
                    sign: modification.sign,
                    name: modification.name.clone(),
                });
            }
            Payload::End { .. } => self.close_block(),
        }
    }

    /// First address past the pending text run and its size in bytes.
    fn run_extent(&self) -> (Addr, usize) {
        match (self.run.first(), self.run.last()) {
            (Some(_), Some(last)) => {
                let bytes = self.run.iter().map(|entry| entry.length() as usize).sum();
                (last.address + last.length(), bytes)
            }
            _ => (0, 0),
        }
    }

    fn flush_run(&mut self) {
        let start = match self.run.first() {
            Some(first) => first.address,
            None => return,
        };
        let bytes = self.run.drain(..)
            .filter_map(CodeEntry::text)
            .flat_map(|text| text.bytes())
            .collect_vec();
        debug!(start, length = bytes.len(), "text record");
        self.emit(Record::Text { start, bytes });
    }

    fn close_block(&mut self) {
        self.flush_run();
        let modifications = std::mem::take(&mut self.modifications);
        for record in modifications {
            self.emit(record);
        }
        if let Some(mut records) = self.current.take() {
            let entry = if self.blocks.is_empty() { Some(self.entry) } else { None };
            records.push(Record::End { entry });
            self.blocks.push(records);
        }
    }

    fn finish(mut self) -> ObjectDeck {
        self.close_block();
        ObjectDeck { blocks: self.blocks }
    }
}
