//! Character and hex constants, as written in `BYTE` operands (`C'EOF'`, `X'F1'`)
//! and in literals (`=C'EOF'`, `=X'05'`).

use std::sync::OnceLock;

use regex::Regex;

use crate::parser::LITERAL_MARKER;
use crate::util::parse_number;
use crate::Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantKind {
    Char,
    Hex,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constant {
    pub kind: ConstantKind,
    /// Text between the quotes.
    pub payload: String,
}

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([CX])'([^']*)'$").expect("Invalid regex"))
}

impl Constant {
    /// Parses a `BYTE`-style constant. Hex payloads must be an even number of hex digits.
    pub fn parse(text: &str) -> Option<Self> {
        let captures = pattern().captures(text)?;
        let kind = match &captures[1] {
            "X" => ConstantKind::Hex,
            _ => ConstantKind::Char,
        };
        let payload = captures[2].to_string();
        let constant = Constant { kind, payload };
        match kind {
            ConstantKind::Hex if constant.hex_bytes().is_none() => None,
            _ => Some(constant),
        }
    }

    /// Parses a literal operand, a constant preceded by the literal marker.
    pub fn parse_literal(text: &str) -> Option<Self> {
        text.strip_prefix(LITERAL_MARKER).and_then(Self::parse)
    }

    pub fn from_bytes(kind: ConstantKind, bytes: &[u8]) -> Self {
        let payload = match kind {
            ConstantKind::Char => bytes.iter().map(|&b| b as char).collect(),
            ConstantKind::Hex => bytes.iter().map(|b| format!("{:02X}", b)).collect(),
        };
        Constant { kind, payload }
    }

    /// Number of bytes the constant occupies.
    pub fn len(&self) -> Addr {
        match self.kind {
            ConstantKind::Char => self.payload.len() as Addr,
            ConstantKind::Hex => (self.payload.len() / 2) as Addr,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn bytes(&self) -> Vec<u8> {
        match self.kind {
            ConstantKind::Char => self.payload.bytes().collect(),
            ConstantKind::Hex => self.hex_bytes().unwrap_or_default(),
        }
    }

    fn hex_bytes(&self) -> Option<Vec<u8>> {
        if self.payload.len() % 2 != 0 || !self.payload.is_ascii() {
            return None;
        }
        self.payload.as_bytes()
            .chunks(2)
            .map(|pair| std::str::from_utf8(pair).ok().and_then(|digits| parse_number::<u8>(digits, 16)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_constant() {
        let constant = Constant::parse("C'EOF'").unwrap();
        assert_eq!(ConstantKind::Char, constant.kind);
        assert_eq!(3, constant.len());
        assert_eq!(vec![0x45, 0x4F, 0x46], constant.bytes());
    }

    #[test]
    fn hex_constant() {
        let constant = Constant::parse("X'F1'").unwrap();
        assert_eq!(ConstantKind::Hex, constant.kind);
        assert_eq!(1, constant.len());
        assert_eq!(vec![0xF1], constant.bytes());
    }

    #[test]
    fn literal() {
        let constant = Constant::parse_literal("=X'05'").unwrap();
        assert_eq!("05", constant.payload);
        assert_eq!(None, Constant::parse_literal("X'05'"));
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(None, Constant::parse("X'F'"));
        assert_eq!(None, Constant::parse("X'GG'"));
        assert_eq!(None, Constant::parse("C'EOF"));
        assert_eq!(None, Constant::parse("Z'00'"));
    }

    #[test]
    fn decoding_emitted_bytes_restores_payload() {
        for text in &["=C'EOF'", "=X'05'", "=X'F1A0'", "=C'HELLO WORLD'"] {
            let constant = Constant::parse_literal(text).unwrap();
            let decoded = Constant::from_bytes(constant.kind, &constant.bytes());
            assert_eq!(constant, decoded);
        }
    }
}
