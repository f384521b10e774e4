extern crate sicxe_assembler;

use pretty_assertions::assert_eq;

use sicxe_assembler::analysis::assign_locations;
use sicxe_assembler::catalog::InstructionCatalog;
use sicxe_assembler::constant::{Constant, ConstantKind};
use sicxe_assembler::error::ParseError;
use sicxe_assembler::object::{Payload, Text};
use sicxe_assembler::output::Sink;
use sicxe_assembler::parser::parse_source;
use sicxe_assembler::records::Record;
use sicxe_assembler::{Assembler, Assembly};

const CATALOG: &str = include_str!("inputs/inst.data");
const COPY: &str = include_str!("inputs/copy.asm");

fn assembler() -> Assembler {
    Assembler::new(InstructionCatalog::parse(CATALOG).unwrap())
}

fn copy() -> Assembly {
    assembler().assemble(COPY).unwrap()
}

#[test]
fn object_deck() {
    let expected = "\
HCOPY  000000001033
DBUFFER000033BUFEND001033LENGTH00002D
RRDREC WRREC\x20
T0000001D1720274B1000000320232900003320074B1000003F2FEC0320160F2016
T00001D0D0100030F200A4B1000003E2000
T00003003454F46
M00000405+RDREC
M00001105+WRREC
M00002405+WRREC
E000000

HRDREC 00000000002B
RBUFFERLENGTHBUFEND
T0000001DB410B400B44077201FE3201B332FFADB2015A00433200957900000B850
T00001D0E3B2FE9131000004F0000F1000000
M00001805+BUFFER
M00002105+LENGTH
M00002906+BUFEND
M00002906-BUFFER
E

HWRREC 00000000001C
RLENGTHBUFFER
T0000001CB41077100000E32012332FFA53900000DF2008B8503B2FEE4F000005
M00000305+LENGTH
M00000D05+BUFFER
E
";
    assert_eq!(expected, copy().deck().to_string());
}

#[test]
fn symbol_table_dump() {
    let expected = "\
COPY\t\t0000
FIRST\t\t0000
CLOOP\t\t0003
ENDFIL\t\t0017
RETADR\t\t002A
LENGTH\t\t002D
BUFFER\t\t0033
BUFEND\t\t1033
MAXLEN\t\t1000

RDREC\t\t0000
RLOOP\t\t0009
EXIT\t\t0020
INPUT\t\t0027
MAXLEN\t\t0028

WRREC\t\t0000
WLOOP\t\t0006
";
    assert_eq!(expected, copy().symbols.to_string());
}

#[test]
fn literal_table_dump() {
    assert_eq!("EOF\t\t0030\n05\t\t001B\n", copy().literals.to_string());
}

#[test]
fn tables_written_through_sinks() {
    let assembly = copy();
    let mut buffer = Vec::new();
    {
        let mut sink = Sink::from_writer("littab", &mut buffer);
        sink.write(&assembly.literals).unwrap();
    }
    assert_eq!(assembly.literals.to_string().into_bytes(), buffer);
}

#[test]
fn pass_one_is_repeatable() {
    let catalog = InstructionCatalog::parse(CATALOG).unwrap();
    let mut statements = parse_source(&catalog, COPY).unwrap();
    let (symbols, literals) = assign_locations(&catalog, &mut statements).unwrap();
    let (again_symbols, again_literals) = assign_locations(&catalog, &mut statements).unwrap();

    assert_eq!(symbols.to_string(), again_symbols.to_string());
    assert_eq!(literals.to_string(), again_literals.to_string());
}

#[test]
fn extended_instructions_are_four_bytes() {
    let assembly = copy();
    let mut extended = 0;
    for entry in &assembly.code {
        if let Some(word) = entry.instruction() {
            let statement = &assembly.statements[entry.statement];
            if statement.is_extended() {
                extended += 1;
                assert_eq!(4, word.length);
                assert!(word.flags.extended);
                assert!(statement.flags.unwrap().extended);
            }
        }
    }
    assert_eq!(7, extended);
}

#[test]
fn text_records_cover_every_byte_once() {
    let assembly = copy();
    let mut covered = 0;
    for record in assembly.deck().records() {
        if let Record::Text { bytes, .. } = record {
            assert!(bytes.len() <= 30);
            assert_eq!(format!("{:02X}", bytes.len()), &record.to_string()[7..9]);
            covered += bytes.len() as u32;
        }
    }
    let emitted = assembly.code.iter()
        .filter_map(|entry| entry.text())
        .map(Text::len)
        .sum::<u32>();
    assert_eq!(emitted, covered);
}

#[test]
fn modifications_point_past_the_opcode() {
    let assembly = copy();
    for entry in &assembly.code {
        if let Payload::Modification(modification) = &entry.payload {
            let statement = &assembly.statements[entry.statement];
            assert_eq!(statement.address + 1, entry.address);
            if statement.is_extended() {
                assert_eq!(5, modification.half_bytes);
            }
        }
    }
}

#[test]
fn literals_decode_to_their_payload() {
    let assembly = copy();
    for literal in assembly.literals.iter() {
        let address = literal.address.unwrap();
        let emitted = assembly.code.iter()
            .filter(|entry| entry.address == address)
            .find_map(|entry| match &entry.payload {
                Payload::Text(Text::Data(bytes)) => Some(bytes.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(literal.constant, Constant::from_bytes(literal.constant.kind, &emitted));
    }
    assert_eq!(ConstantKind::Char, assembly.literals.find("=C'EOF'").unwrap().constant.kind);
}

#[test]
fn unresolved_operand_keeps_going() {
    let source = "P\tSTART\t0\n\tEXTREF\tOTHER\n\tADD\tNOWHERE\n\tEND\tP\n";
    let deck = assembler().assemble(source).unwrap().deck().to_string();
    assert_eq!("HP     000000000003\nROTHER \nT000000031B2000\nE000000\n", deck);
}

#[test]
fn malformed_source_produces_nothing() {
    let source = "P\tSTART\t0\n\tLDA\tA,B,C,D\n\tEND\tP\n";
    let error = assembler().assemble(source).unwrap_err();
    assert_eq!(ParseError::TooManyOperands { line: 2, found: 4, span: 5..12 }, error);

    let rendered = error.render(source, Some("bad.asm"), false);
    assert!(rendered.contains("bad.asm"));
    assert!(rendered.contains("A,B,C,D"));
}
