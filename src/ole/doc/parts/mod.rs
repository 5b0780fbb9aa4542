/// Internal parts for parsing DOC file structures.
///
/// - FIB (File Information Block)
/// - Piece table (CLX)
/// - Text reconstruction
pub mod fib;
pub mod piece_table;
pub mod text;
