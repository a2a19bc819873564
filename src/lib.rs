//! Lucid rewrites machine-mangled ECMAScript into readable source.
//!
//! The core is a pure, bottom-up tree rewriter ([`rewrite::Rewriter`]):
//! comma and conditional expressions standing as statements become explicit
//! control flow, redundant unary wrappers fold away, comparison operands
//! canonicalize, and loop headers shed declarations they do not need. Around
//! it sit a pest-based parser ([`syntax`]) and a precedence-aware printer
//! ([`printer`]); the composed entry points chain all three.
//!
//! ```no_run
//! let out = lucid::prettify("test && (a = 1, b = 2);", &lucid::Options::default())?;
//! # Ok::<(), lucid::LucidError>(())
//! ```

pub mod ast;
pub mod cli;
pub mod errors;
pub mod printer;
pub mod rewrite;
pub mod syntax;

pub use ast::Program;
pub use errors::{print_error, LucidError};
pub use rewrite::{Rewriter, Rewritten};
pub use syntax::EcmaVersion;

/// Options for the composed source-to-source entry points.
#[derive(Debug, Clone)]
pub struct Options {
    /// Grammar revision to parse against.
    pub version: EcmaVersion,
    /// Indentation width of the printed output, in spaces.
    pub indent: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            version: EcmaVersion::default(),
            indent: 2,
        }
    }
}

/// The pure core entry point: canonicalize a tree into its more readable
/// equivalent. Total over well-formed trees; never fails.
pub fn transform(program: Program) -> Program {
    Rewriter::new().rewrite_program(program)
}

/// Composed convenience entry point: parse, transform, print.
pub fn prettify(source: &str, options: &Options) -> Result<String, LucidError> {
    let program = prettify_tree(source, options)?;
    Ok(printer::print_program(&program, options.indent))
}

/// Like [`prettify`], but returns the transformed tree instead of source
/// text.
pub fn prettify_tree(source: &str, options: &Options) -> Result<Program, LucidError> {
    let program = syntax::parse_program(source, options.version)?;
    Ok(transform(program))
}
