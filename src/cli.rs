//! The command-line interface: a thin layer over the library pipeline.
//!
//! Reads from a file argument or stdin, prints transformed source to stdout,
//! and maps every failure to exit status 1 with the diagnostic on stderr.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use thiserror::Error;

use crate::errors::print_error;
use crate::printer::print_program;
use crate::syntax::{parse_named, EcmaVersion};

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "lucid",
    version,
    about = "Rewrites machine-mangled ECMAScript into readable source."
)]
pub struct LucidArgs {
    /// Input file; stdin when omitted or `-`. Use `--` before a filename
    /// that starts with a dash.
    pub file: Option<PathBuf>,

    /// Parse as ECMAScript 3.
    #[arg(long = "ecma3", conflicts_with_all = ["ecma5", "ecma6", "ecma7"])]
    pub ecma3: bool,

    /// Parse as ECMAScript 5.
    #[arg(long = "ecma5", conflicts_with_all = ["ecma6", "ecma7"])]
    pub ecma5: bool,

    /// Parse as ECMAScript 6 (the default).
    #[arg(long = "ecma6", conflicts_with = "ecma7")]
    pub ecma6: bool,

    /// Parse as ECMAScript 7.
    #[arg(long = "ecma7")]
    pub ecma7: bool,

    /// Indentation width in spaces.
    #[arg(long, value_name = "N", default_value_t = 2)]
    pub indent: usize,

    /// Print the transformed tree as JSON instead of source text.
    #[arg(long)]
    pub ast: bool,
}

impl LucidArgs {
    fn version(&self) -> EcmaVersion {
        if self.ecma3 {
            EcmaVersion::Es3
        } else if self.ecma5 {
            EcmaVersion::Es5
        } else if self.ecma7 {
            EcmaVersion::Es7
        } else {
            EcmaVersion::Es6
        }
    }
}

#[derive(Debug, Error)]
enum InputError {
    #[error("cannot read input: {0}")]
    Io(#[from] std::io::Error),
}

/// The main entry point for the CLI.
pub fn run() {
    let args = match LucidArgs::try_parse() {
        Ok(args) => args,
        Err(error) => {
            // --help and --version are not failures; usage errors are.
            let status = if error.use_stderr() { 1 } else { 0 };
            let _ = error.print();
            process::exit(status);
        }
    };

    let (name, source) = match read_input(args.file.as_deref()) {
        Ok(input) => input,
        Err(error) => {
            eprintln!("{error}");
            process::exit(1);
        }
    };

    let program = match parse_named(&source, &name, args.version()) {
        Ok(program) => crate::transform(program),
        Err(error) => {
            print_error(error);
            process::exit(1);
        }
    };

    if args.ast {
        match serde_json::to_string_pretty(&program) {
            Ok(json) => println!("{json}"),
            Err(error) => {
                eprintln!("{error}");
                process::exit(1);
            }
        }
    } else {
        print!("{}", print_program(&program, args.indent));
    }
}

fn read_input(path: Option<&Path>) -> Result<(String, String), InputError> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            let text = std::fs::read_to_string(path)?;
            Ok((path.display().to_string(), text))
        }
        _ => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(("<stdin>".to_string(), text))
        }
    }
}
