//! Parsing: source text to syntax tree.
//!
//! The grammar lives in `grammar.pest`; `parser` lowers pest's parse pairs
//! into the [`crate::ast`] types and enforces the selected grammar revision.

pub mod parser;

pub use parser::{parse_named, parse_program};

use std::fmt;

use serde::{Deserialize, Serialize};

/// The ECMAScript grammar revision to parse against.
///
/// Ordering follows publication order, so a feature gate is a simple `<`
/// comparison.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum EcmaVersion {
    Es3,
    Es5,
    #[default]
    Es6,
    Es7,
}

impl EcmaVersion {
    /// Maps the conventional version numbers (3, 5, 6, 7) to a revision.
    pub fn from_number(n: u32) -> Option<EcmaVersion> {
        match n {
            3 => Some(EcmaVersion::Es3),
            5 => Some(EcmaVersion::Es5),
            6 => Some(EcmaVersion::Es6),
            7 => Some(EcmaVersion::Es7),
            _ => None,
        }
    }
}

impl fmt::Display for EcmaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EcmaVersion::Es3 => "ES3",
            EcmaVersion::Es5 => "ES5",
            EcmaVersion::Es6 => "ES6",
            EcmaVersion::Es7 => "ES7",
        };
        f.write_str(name)
    }
}
