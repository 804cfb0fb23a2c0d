//! Basalt - a safety-oriented, fixed-width-typed embedded language that
//! transpiles to readable, MISRA-style C
//!
//! This is the root workspace crate that provides integration tests.
//! The actual implementation is in the workspace member crates.

// Re-export main crates for convenience
pub use basalt_ast as ast;
pub use basalt_lexer as lexer;
pub use basalt_parser as parser;
