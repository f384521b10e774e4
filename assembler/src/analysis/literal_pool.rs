use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::ops::Range;

use crate::constant::Constant;
use crate::Addr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    /// The literal exactly as written, e.g. `=C'EOF'`.
    pub text: String,
    pub constant: Constant,
    /// Fixed when the pool is flushed.
    pub address: Option<Addr>,
}

/// Literals in first-seen order. Everything registered since the previous flush
/// is placed at the next `LTORG` or `END`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiteralPool {
    literals: Vec<Literal>,
    flushed: usize,
    flushes: HashMap<usize, Range<usize>>,
}

impl LiteralPool {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a literal unless one with identical text was seen before. Returns whether it was new.
    pub fn register(&mut self, text: &str, constant: Constant) -> bool {
        if self.find(text).is_some() {
            return false;
        }
        self.literals.push(Literal { text: text.to_string(), constant, address: None });
        true
    }

    /// Places every pending literal back to back starting at `location`, and remembers them
    /// as the ones flushed by `statement`. Returns the location following the last literal.
    pub fn flush(&mut self, statement: usize, mut location: Addr) -> Addr {
        let pending = self.flushed..self.literals.len();
        for literal in &mut self.literals[pending.clone()] {
            literal.address = Some(location);
            location += literal.constant.len();
        }
        self.flushed = pending.end;
        self.flushes.insert(statement, pending);
        location
    }

    pub fn pending(&self) -> &[Literal] {
        &self.literals[self.flushed..]
    }

    /// The literals placed by the flush at `statement`, in placement order.
    pub fn flushed_at(&self, statement: usize) -> &[Literal] {
        match self.flushes.get(&statement) {
            Some(range) => &self.literals[range.clone()],
            None => &[],
        }
    }

    pub fn find(&self, text: &str) -> Option<&Literal> {
        self.literals.iter().find(|literal| literal.text == text)
    }

    pub fn iter(&self) -> impl Iterator<Item=&Literal> {
        self.literals.iter()
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }
}

/// Dump format: `PAYLOAD\t\tADDR` per literal, decoration stripped.
impl Display for LiteralPool {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for literal in &self.literals {
            match literal.address {
                Some(address) => writeln!(f, "{}\t\t{:04X}", literal.constant.payload, address)?,
                None => writeln!(f, "{}\t\t----", literal.constant.payload)?,
            }
        }
        Ok(())
    }
}
