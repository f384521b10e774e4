use std::fmt::{self, Display, Formatter};

use crate::Addr;

pub const MAX_SYMBOL_LEN: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub address: Addr,
    pub block: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Block(usize),
}

/// Symbols grouped by the block that defines them, in definition order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    blocks: Vec<Vec<Symbol>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// Makes sure `block` exists, even if it never defines a symbol.
    pub fn ensure_block(&mut self, block: usize) {
        if self.blocks.len() <= block {
            self.blocks.resize_with(block + 1, Vec::new);
        }
    }

    /// Defines `name` in `block`. Returns the existing symbol if the name is already taken there.
    pub fn insert(&mut self, block: usize, name: &str, address: Addr) -> Result<(), &Symbol> {
        self.ensure_block(block);
        if let Some(i) = self.blocks[block].iter().position(|s| s.name == name) {
            return Err(&self.blocks[block][i]);
        }
        self.blocks[block].push(Symbol { name: name.to_string(), address, block });
        Ok(())
    }

    /// Finds `name` in `scope`. With [`Scope::All`] the earliest block defining the name wins.
    pub fn resolve(&self, name: &str, scope: Scope) -> Option<Addr> {
        let found = match scope {
            Scope::All => self.blocks.iter().flatten().find(|s| s.name == name),
            Scope::Block(block) => self.blocks.get(block)?.iter().find(|s| s.name == name),
        };
        found.map(|s| s.address)
    }

    pub fn block(&self, block: usize) -> &[Symbol] {
        self.blocks.get(block).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn iter(&self) -> impl Iterator<Item=&Symbol> {
        self.blocks.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.blocks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dump format: `NAME\t\tADDR` per symbol, a blank line between blocks.
impl Display for SymbolTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for symbol in block {
                writeln!(f, "{}\t\t{:04X}", symbol.name, symbol.address)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.insert(0, "FIRST", 0x0).unwrap();
        table.insert(0, "MAXLEN", 0x1000).unwrap();
        table.insert(1, "RDREC", 0x0).unwrap();
        table.insert(1, "MAXLEN", 0x28).unwrap();
        table
    }

    #[test]
    fn scoped_lookup() {
        let table = table();
        assert_eq!(Some(0x28), table.resolve("MAXLEN", Scope::Block(1)));
        assert_eq!(Some(0x1000), table.resolve("MAXLEN", Scope::Block(0)));
        assert_eq!(None, table.resolve("FIRST", Scope::Block(1)));
        assert_eq!(None, table.resolve("FIRST", Scope::Block(7)));
    }

    #[test]
    fn global_lookup_prefers_earliest_block() {
        let table = table();
        assert_eq!(Some(0x1000), table.resolve("MAXLEN", Scope::All));
        assert_eq!(Some(0x0), table.resolve("RDREC", Scope::All));
        assert_eq!(None, table.resolve("NOWHERE", Scope::All));
    }

    #[test]
    fn duplicate_in_block_is_rejected() {
        let mut table = table();
        let existing = table.insert(1, "RDREC", 0x10).unwrap_err();
        assert_eq!(0x0, existing.address);
        assert_eq!(4, table.len());
    }

    #[test]
    fn dump_separates_blocks() {
        assert_eq!(
            "FIRST\t\t0000\nMAXLEN\t\t1000\n\nRDREC\t\t0000\nMAXLEN\t\t0028\n",
            table().to_string());
    }

    #[test]
    fn empty_blocks_are_kept() {
        let mut table = SymbolTable::new();
        table.ensure_block(2);
        assert_eq!(3, table.block_count());
        assert!(table.is_empty());
        assert!(table.block(1).is_empty());
    }
}
