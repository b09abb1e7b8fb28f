pub mod xkb_symbols;

pub use xkb_symbols::{parse_symbols, SymbolEntry};
