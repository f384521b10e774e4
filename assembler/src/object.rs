//! What pass 2 produces: one [`CodeEntry`] per piece of the object deck, in scan order.

use std::fmt::{self, Display, Formatter};

use crate::Addr;

pub const FORMAT3_PAYLOAD_MASK: u32 = 0xFFF;
pub const FORMAT4_PAYLOAD_MASK: u32 = 0xF_FFFF;
pub const WORD_MASK: u32 = 0xFF_FFFF;

/// The n and i bits of an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// Used by 1- and 2-byte formats, which have no addressing bits.
    Register,
    Immediate,
    Indirect,
    Simple,
}

impl AddressingMode {
    fn bits(self) -> u8 {
        use AddressingMode::*;
        match self {
            Register  => 0b00,
            Immediate => 0b01,
            Indirect  => 0b10,
            Simple    => 0b11,
        }
    }
}

impl Default for AddressingMode {
    fn default() -> Self {
        AddressingMode::Register
    }
}

/// The six addressing and format bits, `nixbpe`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Flags {
    pub mode: AddressingMode,
    pub indexed: bool,
    pub base_relative: bool,
    pub pc_relative: bool,
    pub extended: bool,
}

impl Flags {
    pub fn new(mode: AddressingMode) -> Self {
        Flags { mode, ..Default::default() }
    }

    pub fn bits(&self) -> u8 {
        let bit = |set: bool, value: u8| if set { value } else { 0 };
        self.mode.bits() << 4
            | bit(self.indexed, 0b1000)
            | bit(self.base_relative, 0b0100)
            | bit(self.pc_relative, 0b0010)
            | bit(self.extended, 0b0001)
    }
}

/// An encoded instruction, kept as its parts until emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionWord {
    pub opcode: u8,
    pub flags: Flags,
    /// Displacement, address, immediate value, or packed register pair depending on the format.
    pub payload: u32,
    /// 1 to 4 bytes.
    pub length: Addr,
}

impl InstructionWord {
    pub fn format1(opcode: u8) -> Self {
        InstructionWord { opcode, flags: Flags::default(), payload: 0, length: 1 }
    }

    pub fn format2(opcode: u8, r1: u8, r2: u8) -> Self {
        let payload = ((r1 & 0xF) as u32) << 4 | (r2 & 0xF) as u32;
        InstructionWord { opcode, flags: Flags::default(), payload, length: 2 }
    }

    /// A 3-byte word, or a 4-byte one when `flags.extended` is set.
    pub fn format3(opcode: u8, flags: Flags, payload: u32) -> Self {
        let length = if flags.extended { 4 } else { 3 };
        InstructionWord { opcode, flags, payload, length }
    }

    pub fn value(&self) -> u32 {
        let opcode = self.opcode as u32;
        let flags = self.flags.bits() as u32;
        match self.length {
            1 => opcode,
            2 => opcode << 8 | self.payload & 0xFF,
            3 => opcode << 16 | flags << 12 | self.payload & FORMAT3_PAYLOAD_MASK,
            _ => opcode << 24 | flags << 20 | self.payload & FORMAT4_PAYLOAD_MASK,
        }
    }

    /// Big-endian bytes of [`value`](Self::value).
    pub fn bytes(&self) -> Vec<u8> {
        let length = self.length.min(4) as usize;
        self.value().to_be_bytes()[4 - length..].to_vec()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Text {
    Instruction(InstructionWord),
    Data(Vec<u8>),
}

impl Text {
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            Text::Instruction(word) => word.bytes(),
            Text::Data(bytes) => bytes.clone(),
        }
    }

    pub fn len(&self) -> Addr {
        match self {
            Text::Instruction(word) => word.length,
            Text::Data(bytes) => bytes.len() as Addr,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

impl Display for Sign {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Sign::Plus => write!(f, "+"),
            Sign::Minus => write!(f, "-"),
        }
    }
}

/// A fix-up the loader applies once `name` has an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    /// Length of the patched field in half-bytes.
    pub half_bytes: u8,
    pub sign: Sign,
    pub name: String,
}

impl Modification {
    /// The 20-bit address field of an extended instruction.
    pub fn extended(name: &str) -> Self {
        Modification { half_bytes: 5, sign: Sign::Plus, name: name.to_string() }
    }

    /// A whole data word.
    pub fn word(sign: Sign, name: &str) -> Self {
        Modification { half_bytes: 6, sign, name: name.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Header { name: String, length: Addr },
    /// Exported names; their addresses are looked up when records are built.
    Define { names: Vec<String> },
    Refer { names: Vec<String> },
    Text(Text),
    Modification(Modification),
    /// Closes the program. `entry` is the operand of `END`.
    End { entry: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Header,
    Define,
    Refer,
    Text,
    Modification,
    End,
}

impl RecordKind {
    pub fn tag(self) -> char {
        use RecordKind::*;
        match self {
            Header       => 'H',
            Define       => 'D',
            Refer        => 'R',
            Text         => 'T',
            Modification => 'M',
            End          => 'E',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeEntry {
    /// Index of the statement that produced the entry.
    pub statement: usize,
    pub address: Addr,
    pub payload: Payload,
}

impl CodeEntry {
    pub fn new(statement: usize, address: Addr, payload: Payload) -> Self {
        CodeEntry { statement, address, payload }
    }

    pub fn kind(&self) -> RecordKind {
        match self.payload {
            Payload::Header { .. } => RecordKind::Header,
            Payload::Define { .. } => RecordKind::Define,
            Payload::Refer { .. } => RecordKind::Refer,
            Payload::Text(_) => RecordKind::Text,
            Payload::Modification(_) => RecordKind::Modification,
            Payload::End { .. } => RecordKind::End,
        }
    }

    /// Bytes occupied for text entries, half-bytes patched for modifications, 0 otherwise.
    pub fn length(&self) -> Addr {
        match &self.payload {
            Payload::Text(text) => text.len(),
            Payload::Modification(modification) => modification.half_bytes as Addr,
            _ => 0,
        }
    }

    pub fn text(&self) -> Option<&Text> {
        match &self.payload {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn instruction(&self) -> Option<&InstructionWord> {
        match self.text() {
            Some(Text::Instruction(word)) => Some(word),
            _ => None,
        }
    }
}
