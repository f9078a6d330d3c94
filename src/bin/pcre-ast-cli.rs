//! Command-line interface for pattern diagnostics.
//!
//! Reads a delimited PCRE pattern from an argument or stdin and runs the
//! requested pass, emitting JSON so editor tooling can consume the output.
//!
//! # Usage
//!
//! ```bash
//! pcre-ast-cli validate '/(a|b)c/'
//! pcre-ast-cli compile --stdin < pattern.txt
//! pcre-ast-cli modernize '/[0-9]{3}/'
//! pcre-ast-cli analyze '/^foo.*bar$/'
//! ```

use clap::{Parser, Subcommand};
use std::io::{self, Read};
use std::process;

use pcre_ast::{
    parse, validate, Compiler, LengthAnalyzer, LiteralExtractor, Metrics, Modernizer,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a pattern and print the validation result as JSON
    Validate {
        /// The delimited pattern (omit for stdin)
        pattern: Option<String>,

        /// Read the pattern from stdin
        #[arg(long)]
        stdin: bool,
    },

    /// Re-emit the canonical form of a pattern
    Compile {
        pattern: Option<String>,

        #[arg(long)]
        stdin: bool,
    },

    /// Apply modernization rewrites and emit the result
    Modernize {
        pattern: Option<String>,

        #[arg(long)]
        stdin: bool,
    },

    /// Print literal, width and metrics analyses as JSON
    Analyze {
        pattern: Option<String>,

        #[arg(long)]
        stdin: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { pattern, stdin } => {
            let input = read_pattern(pattern, stdin);
            let result = validate(&input);
            print_json(&result);
            if !result.ok {
                process::exit(1);
            }
        }
        Commands::Compile { pattern, stdin } => {
            let input = read_pattern(pattern, stdin);
            let regex = parse_or_exit(&input);
            println!("{}", Compiler::compile(&regex));
        }
        Commands::Modernize { pattern, stdin } => {
            let input = read_pattern(pattern, stdin);
            let regex = parse_or_exit(&input);
            println!("{}", Compiler::compile(&Modernizer::modernize(&regex)));
        }
        Commands::Analyze { pattern, stdin } => {
            let input = read_pattern(pattern, stdin);
            let regex = parse_or_exit(&input);
            let report = serde_json::json!({
                "literals": LiteralExtractor::extract(&regex),
                "length": LengthAnalyzer::analyze(&regex),
                "metrics": Metrics::measure(&regex),
            });
            print_json(&report);
        }
    }
}

fn read_pattern(pattern: Option<String>, stdin: bool) -> String {
    let raw = if stdin || pattern.is_none() {
        let mut buffer = String::new();
        if let Err(error) = io::stdin().read_to_string(&mut buffer) {
            eprintln!("Error reading input: {}", error);
            process::exit(2);
        }
        buffer
    } else {
        pattern.expect("pattern argument")
    };
    raw.trim_end_matches(&['\r', '\n'][..]).to_string()
}

fn parse_or_exit(input: &str) -> pcre_ast::Regex {
    match parse(input) {
        Ok(regex) => regex,
        Err(error) => {
            eprintln!("{}", error);
            process::exit(1);
        }
    }
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(error) => {
            eprintln!("Error serializing output: {}", error);
            process::exit(2);
        }
    }
}
