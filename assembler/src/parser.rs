//! Splitting raw source lines into statements.
//!
//! A source line holds up to four tab-separated fields: label, operator, operands, comment.
//! A line that begins with a tab has no label. The operand field is split on commas into
//! at most [`MAX_OPERANDS`] operands. A line beginning with `.` is a comment.
//!
//! ```
//! # use sicxe_assembler::catalog::InstructionCatalog;
//! # use sicxe_assembler::parser::parse_line;
//! let catalog = InstructionCatalog::parse("STCH 3 54 1").unwrap();
//! let statement = parse_line(&catalog, 1, "FIRST\tSTCH\tBUFFER,X\tstore char").unwrap();
//!
//! assert_eq!(Some("FIRST"), statement.label.as_deref());
//! assert_eq!("STCH", statement.operator);
//! assert_eq!(vec!["BUFFER", "X"], statement.operands);
//! assert_eq!(Some("store char"), statement.comment.as_deref());
//! ```

use crate::analysis::symbol_table::MAX_SYMBOL_LEN;
use crate::catalog::InstructionCatalog;
use crate::error::{ParseError, Span};
use crate::object::Flags;
use crate::util::span_within;
use crate::Addr;

pub const MAX_OPERANDS: usize = 3;

pub const EXTENDED_MARKER: char = '+';
pub const LITERAL_MARKER: char = '=';
pub const IMMEDIATE_MARKER: char = '#';
pub const INDIRECT_MARKER: char = '@';
pub const COMMENT_MARKER: char = '.';

/// Name of the index register as written in operands.
pub const INDEX_REGISTER: &str = "X";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Start,
    Csect,
    Extdef,
    Extref,
    Resw,
    Resb,
    Word,
    Byte,
    Equ,
    Ltorg,
    End,
}

impl Directive {
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        use Directive::*;
        let directive = match mnemonic {
            "START"  => Start,
            "CSECT"  => Csect,
            "EXTDEF" => Extdef,
            "EXTREF" => Extref,
            "RESW"   => Resw,
            "RESB"   => Resb,
            "WORD"   => Word,
            "BYTE"   => Byte,
            "EQU"    => Equ,
            "LTORG"  => Ltorg,
            "END"    => End,
            _ => return None,
        };
        Some(directive)
    }

    /// Whether the directive begins a new block.
    pub fn opens_block(self) -> bool {
        matches!(self, Directive::Start | Directive::Csect)
    }

    /// Whether the directive flushes the literal pool.
    pub fn flushes_literals(self) -> bool {
        matches!(self, Directive::Ltorg | Directive::End)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Statement {
    /// 1-based source line.
    pub line: usize,
    /// The raw line, used to point diagnostics at the offending text.
    pub text: String,
    pub label: Option<String>,
    /// Empty for comment lines.
    pub operator: String,
    pub operands: Vec<String>,
    pub comment: Option<String>,
    /// Location counter value before this statement, assigned in pass 1.
    pub address: Addr,
    /// Addressing flags, assigned in pass 2 for catalog instructions.
    pub flags: Option<Flags>,
}

impl Statement {
    pub fn is_extended(&self) -> bool {
        self.operator.starts_with(EXTENDED_MARKER)
    }

    /// The operator without its extended-format marker.
    pub fn mnemonic(&self) -> &str {
        self.operator.strip_prefix(EXTENDED_MARKER).unwrap_or(&self.operator)
    }

    pub fn directive(&self) -> Option<Directive> {
        Directive::from_mnemonic(&self.operator)
    }

    pub fn operand(&self, index: usize) -> Option<&str> {
        self.operands.get(index).map(String::as_str)
    }

    pub fn is_comment(&self) -> bool {
        self.label.is_none() && self.operator.is_empty() && self.operands.is_empty()
    }

    /// Byte range of `fragment` within the raw line, or the whole line if it does not occur there.
    pub fn span_of(&self, fragment: &str) -> Span {
        match self.text.find(fragment) {
            Some(start) if !fragment.is_empty() => start..(start + fragment.len()),
            _ => 0..self.text.len(),
        }
    }
}

pub fn parse_line(catalog: &InstructionCatalog, line: usize, text: &str) -> Result<Statement, ParseError> {
    let text = text.trim_end_matches(|c| c == '\r' || c == '\n');

    if let Some(rest) = text.strip_prefix(COMMENT_MARKER) {
        let comment = rest.trim();
        return Ok(Statement {
            line,
            text: text.to_string(),
            comment: if comment.is_empty() { None } else { Some(comment.to_string()) },
            ..Default::default()
        });
    }

    let has_label = !text.starts_with('\t');
    let mut fields = text.split('\t').filter(|field| !field.is_empty());

    let label = if has_label { fields.next() } else { None };
    let operator = fields.next().unwrap_or("");
    let mut operand_field = fields.next();
    let rest = fields.collect::<Vec<_>>();
    let mut comment = if rest.is_empty() { None } else { Some(rest.join("\t")) };

    if let Some(label) = label {
        if label.len() > MAX_SYMBOL_LEN {
            return Err(ParseError::LabelTooLong {
                line,
                label: label.to_string(),
                span: span_within(text, label),
            });
        }
    }

    // Instructions without operands have no operand syntax; whatever sits in that field is commentary.
    let takes_no_operands = catalog.resolve_opcode(operator)
        .map_or(false, |entry| entry.operand_count == 0);
    if takes_no_operands {
        if let Some(field) = operand_field.take() {
            comment = Some(match comment {
                Some(comment) => format!("{}\t{}", field, comment),
                None => field.to_string(),
            });
        }
    }

    let operands = match operand_field {
        Some(field) => {
            let operands = field.split(',')
                .filter(|operand| !operand.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>();
            if operands.len() > MAX_OPERANDS {
                return Err(ParseError::TooManyOperands {
                    line,
                    found: operands.len(),
                    span: span_within(text, field),
                });
            }
            operands
        }
        None => Vec::new(),
    };

    Ok(Statement {
        line,
        text: text.to_string(),
        label: label.map(str::to_string),
        operator: operator.to_string(),
        operands,
        comment,
        ..Default::default()
    })
}

/// Parses every non-blank line of `source`. The first malformed line aborts parsing.
pub fn parse_source(catalog: &InstructionCatalog, source: &str) -> Result<Vec<Statement>, ParseError> {
    source.lines()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(i, text)| parse_line(catalog, i + 1, text))
        .collect()
}
