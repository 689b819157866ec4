//! Z80 cross-assembler: parsing, address resolution and code emission.

pub use zxasm_common::*;

#[cfg(test)]
mod tests;
