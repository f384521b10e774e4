//! The fixed instruction set the assembler encodes against.
//!
//! A catalog is loaded from a definitions file with one instruction per line:
//!
//! ```text
//! ADD     3   18  1
//! CLEAR   2   B4  1
//! RSUB    3   4C  0
//! ```
//!
//! The columns are the mnemonic, the byte format (1, 2 or 3), the opcode in hex,
//! and the number of operands the instruction takes. Format 4 is not listed separately;
//! it is selected per statement by prefixing a format-3 mnemonic with
//! [`EXTENDED_MARKER`](crate::parser::EXTENDED_MARKER).

use std::collections::HashMap;
use std::convert::TryFrom;
use std::fs;
use std::path::Path;

use itertools::Itertools;

use crate::error::CatalogError;
use crate::parser::EXTENDED_MARKER;
use crate::util::parse_number;
use crate::Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    One,
    Two,
    Three,
}

impl Format {
    pub fn bytes(self) -> Addr {
        match self {
            Format::One => 1,
            Format::Two => 2,
            Format::Three => 3,
        }
    }
}

impl TryFrom<u8> for Format {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Format::One),
            2 => Ok(Format::Two),
            3 => Ok(Format::Three),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionEntry {
    pub name: String,
    pub format: Format,
    pub opcode: u8,
    pub operand_count: usize,
}

impl InstructionEntry {
    pub fn new(name: impl Into<String>, format: Format, opcode: u8, operand_count: usize) -> Self {
        Self { name: name.into(), format, opcode, operand_count }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstructionCatalog {
    entries: Vec<InstructionEntry>,
    by_name: HashMap<String, usize>,
}

impl InstructionCatalog {
    pub fn from_entries(entries: impl IntoIterator<Item=InstructionEntry>) -> Self {
        let mut catalog = Self::default();
        for entry in entries {
            catalog.push(entry);
        }
        catalog
    }

    fn push(&mut self, entry: InstructionEntry) {
        // First definition of a mnemonic wins.
        let index = self.entries.len();
        self.by_name.entry(entry.name.clone()).or_insert(index);
        self.entries.push(entry);
    }

    pub fn parse(src: &str) -> Result<Self, CatalogError> {
        let entries = src.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| parse_entry(i + 1, line))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let src = fs::read_to_string(path)
            .map_err(|source| CatalogError::Io { path: path.display().to_string(), source })?;
        Self::parse(&src)
    }

    /// Looks up `mnemonic`, ignoring a leading extended-format marker.
    pub fn resolve_opcode(&self, mnemonic: &str) -> Option<&InstructionEntry> {
        let name = mnemonic.strip_prefix(EXTENDED_MARKER).unwrap_or(mnemonic);
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item=&InstructionEntry> {
        self.entries.iter()
    }
}

fn parse_entry(line: usize, text: &str) -> Result<InstructionEntry, CatalogError> {
    let (name, format, opcode, operand_count) = text.split_whitespace()
        .collect_tuple()
        .ok_or_else(|| CatalogError::Malformed { line, text: text.to_string() })?;

    let format = parse_number::<u8>(format, 10)
        .and_then(|f| Format::try_from(f).ok())
        .ok_or_else(|| CatalogError::BadFormat { line, format: format.to_string() })?;
    let opcode = parse_number::<u8>(opcode, 16)
        .ok_or_else(|| CatalogError::BadOpcode { line, opcode: opcode.to_string() })?;
    let operand_count = parse_number::<usize>(operand_count, 10)
        .ok_or_else(|| CatalogError::Malformed { line, text: text.to_string() })?;

    Ok(InstructionEntry::new(name, format, opcode, operand_count))
}
