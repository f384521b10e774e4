//! Pass 1: sizing every statement, fixing its address, and building the tables pass 2 reads.

use tracing::{debug, info, warn};

use crate::catalog::InstructionCatalog;
use crate::constant::Constant;
use crate::error::ParseError;
use crate::object::WORD_MASK;
use crate::parser::{Directive, Statement, LITERAL_MARKER};

use self::literal_pool::LiteralPool;
use self::memory_placement::{addresses_occupied, split_difference, to_addr, BlockCursor, CURRENT_LOCATION, MAX_ADDRESS};
use self::symbol_table::{Scope, SymbolTable};

/// Per-block location assignment shared by both passes.
pub mod memory_placement;

/// Block-scoped label addresses.
pub mod symbol_table;

/// Literals and the points where they are placed.
pub mod literal_pool;

/// Runs pass 1 over `statements`, recording each statement's address and returning the
/// symbol table and literal pool. The first malformed statement aborts the pass.
///
/// The tables depend on nothing but the statements, so running this twice over the same
/// source produces identical tables.
pub fn assign_locations(
    catalog: &InstructionCatalog,
    statements: &mut [Statement],
) -> Result<(SymbolTable, LiteralPool), ParseError> {
    info!(statements = statements.len(), "pass 1 started");

    let mut symbols = SymbolTable::new();
    let mut literals = LiteralPool::new();
    let mut cursor = BlockCursor::default();
    let mut location: u64 = 0;

    for (index, statement) in statements.iter_mut().enumerate() {
        if statement.is_comment() {
            statement.address = to_addr(location);
            continue;
        }

        let directive = statement.directive();
        if directive.map_or(false, Directive::opens_block) {
            let block = cursor.open();
            symbols.ensure_block(block);
            location = 0;
            debug!(block, name = statement.label.as_deref().unwrap_or(""), "block opened");
        }
        let block = cursor.current();
        statement.address = to_addr(location);

        if let Some(label) = &statement.label {
            let value = match directive {
                Some(Directive::Equ) => equ_value(statement, &symbols, location),
                _ => location,
            };
            if symbols.insert(block, label, to_addr(value) & WORD_MASK).is_err() {
                return Err(ParseError::DuplicateLabel {
                    line: statement.line,
                    label: label.clone(),
                    span: statement.span_of(label),
                });
            }
        }

        if directive == Some(Directive::Byte) {
            let operand = statement.operand(0).unwrap_or("");
            if Constant::parse(operand).is_none() {
                return Err(malformed_constant(statement, operand));
            }
        }

        for operand in statement.operands.iter().filter(|o| o.starts_with(LITERAL_MARKER)) {
            match Constant::parse_literal(operand) {
                Some(constant) => {
                    if literals.register(operand, constant) {
                        debug!(literal = %operand, line = statement.line, "literal registered");
                    }
                }
                None => return Err(malformed_constant(statement, operand)),
            }
        }

        location = location.saturating_add(addresses_occupied(statement, catalog));

        if directive.map_or(false, Directive::flushes_literals) {
            let start = location;
            location = literals.flush(index, to_addr(location)) as u64;
            debug!(
                line = statement.line,
                placed = literals.flushed_at(index).len(),
                from = start,
                "literal pool flushed"
            );
        }

        if location >= MAX_ADDRESS {
            return Err(ParseError::AddressOverflow {
                line: statement.line,
                location,
                span: statement.span_of(&statement.operator),
            });
        }
    }

    info!(symbols = symbols.len(), literals = literals.len(), blocks = symbols.block_count(), "pass 1 finished");
    Ok((symbols, literals))
}

fn equ_value(statement: &Statement, symbols: &SymbolTable, location: u64) -> u64 {
    let operand = statement.operand(0).unwrap_or("");
    if operand == CURRENT_LOCATION {
        return location;
    }
    match split_difference(operand) {
        Some((minuend, subtrahend)) => {
            let resolve = |name: &str| match symbols.resolve(name, Scope::All) {
                Some(address) => address as i64,
                None => {
                    warn!(line = statement.line, symbol = name, "unresolved symbol in EQU, using 0");
                    0
                }
            };
            ((resolve(minuend) - resolve(subtrahend)) & WORD_MASK as i64) as u64
        }
        None => location,
    }
}

fn malformed_constant(statement: &Statement, operand: &str) -> ParseError {
    ParseError::MalformedConstant {
        line: statement.line,
        text: operand.to_string(),
        span: statement.span_of(operand),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    const CATALOG: &str = "ADD 3 18 1\nLDA 3 00 1\nSTCH 3 54 1\nCLEAR 2 B4 1\nRSUB 3 4C 0\n";

    fn run(source: &str) -> Result<(Vec<Statement>, SymbolTable, LiteralPool), ParseError> {
        let catalog = InstructionCatalog::parse(CATALOG).unwrap();
        let mut statements = parse_source(&catalog, source)?;
        let (symbols, literals) = assign_locations(&catalog, &mut statements)?;
        Ok((statements, symbols, literals))
    }

    #[test]
    fn labels_get_pre_increment_addresses() {
        let source = "COPY\tSTART\t0\nFIRST\tSTCH\tBUFFER,X\n\tCLEAR\tX\nBUFFER\tRESB\t4\nNEXT\tRSUB\n";
        let (statements, symbols, _) = run(source).unwrap();

        assert_eq!(Some(0), symbols.resolve("FIRST", Scope::Block(0)));
        assert_eq!(Some(5), symbols.resolve("BUFFER", Scope::Block(0)));
        assert_eq!(Some(9), symbols.resolve("NEXT", Scope::Block(0)));
        assert_eq!(vec![0, 0, 3, 5, 9], statements.iter().map(|s| s.address).collect::<Vec<_>>());
    }

    #[test]
    fn each_block_restarts_at_zero() {
        let source = "A\tSTART\t0\n\tLDA\tX\nB\tCSECT\nINNER\tLDA\tX\n";
        let (_, symbols, _) = run(source).unwrap();

        assert_eq!(2, symbols.block_count());
        assert_eq!(Some(0), symbols.resolve("B", Scope::Block(1)));
        assert_eq!(Some(0), symbols.resolve("INNER", Scope::Block(1)));
    }

    #[test]
    fn equ_forms() {
        let source = "A\tSTART\t0\nBUF\tRESB\t16\nEND\tEQU\t*\nLEN\tEQU\tEND-BUF\nMISS\tEQU\tEND-NONE\n";
        let (statements, symbols, _) = run(source).unwrap();

        assert_eq!(Some(16), symbols.resolve("END", Scope::Block(0)));
        assert_eq!(Some(16), symbols.resolve("LEN", Scope::Block(0)));
        assert_eq!(Some(16), symbols.resolve("MISS", Scope::Block(0)));
        assert_eq!(16, statements[4].address);
    }

    #[test]
    fn literals_are_placed_at_flush_points() {
        let source = "A\tSTART\t0\n\tLDA\t=C'EOF'\n\tLTORG\n\tLDA\t=X'05'\n\tLDA\t=C'EOF'\n\tEND\tA\n";
        let (statements, _, literals) = run(source).unwrap();

        assert_eq!(2, literals.len());
        assert_eq!(Some(3), literals.find("=C'EOF'").unwrap().address);
        assert_eq!(Some(12), literals.find("=X'05'").unwrap().address);
        assert_eq!(12, statements[5].address);
        assert_eq!(1, literals.flushed_at(2).len());
        assert_eq!(1, literals.flushed_at(5).len());
    }

    #[test]
    fn rerunning_gives_identical_tables() {
        let source = "A\tSTART\t0\nX1\tLDA\t=C'EOF'\nX2\tRESW\t2\nB\tCSECT\nY\tADD\t=X'05'\n\tEND\tX1\n";
        let catalog = InstructionCatalog::parse(CATALOG).unwrap();
        let mut statements = parse_source(&catalog, source).unwrap();

        let first = assign_locations(&catalog, &mut statements).unwrap();
        let second = assign_locations(&catalog, &mut statements).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.0.to_string(), second.0.to_string());
        assert_eq!(first.1.to_string(), second.1.to_string());
    }

    #[test]
    fn duplicate_label_in_block() {
        let error = run("A\tSTART\t0\nX\tLDA\tX\nX\tLDA\tX\n").unwrap_err();
        assert_eq!(ParseError::DuplicateLabel { line: 3, label: "X".to_string(), span: 0..1 }, error);
    }

    #[test]
    fn same_label_in_different_blocks() {
        assert!(run("A\tSTART\t0\nX\tLDA\tX\nB\tCSECT\nX\tLDA\tX\n").is_ok());
    }

    #[test]
    fn malformed_constants() {
        let error = run("A\tSTART\t0\nB\tBYTE\tX'F'\n").unwrap_err();
        assert!(matches!(error, ParseError::MalformedConstant { line: 2, span, .. } if span == (7..11)));

        let error = run("A\tSTART\t0\n\tLDA\t=Q'1'\n").unwrap_err();
        assert!(matches!(error, ParseError::MalformedConstant { line: 2, .. }));
    }

    #[test]
    fn too_many_operands_aborts() {
        let error = run("A\tSTART\t0\n\tLDA\tA,B,C,D\n").unwrap_err();
        assert!(matches!(error, ParseError::TooManyOperands { line: 2, found: 4, .. }));
    }

    #[test]
    fn address_space_is_bounded() {
        let error = run("A\tSTART\t0\nBIG\tRESB\t1048576\n").unwrap_err();
        assert!(matches!(error, ParseError::AddressOverflow { line: 2, location: 0x10_0000, .. }));
        assert!(run("A\tSTART\t0\nBIG\tRESB\t1048575\n").is_ok());
    }

    #[test]
    fn huge_reservation_is_an_overflow_not_a_panic() {
        let error = run("A\tSTART\t0\n\tLDA\tX\nBIG\tRESW\t9999999999999999999\n").unwrap_err();
        assert!(matches!(error, ParseError::AddressOverflow { line: 3, location: u64::MAX, .. }));
    }
}
