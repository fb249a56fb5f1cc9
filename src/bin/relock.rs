//! relock CLI - Self-reversing file encryption
//!
//! Encrypts the given file in place using scrypt key derivation and NaCl
//! secretbox (XSalsa20Poly1305); run again on the same file to decrypt it.

use clap::Parser;
use std::path::PathBuf;
use std::process;

use relock::cipher::Cipher;
use relock::error::Result;
use relock::file_ops;
use relock::keysource::{
    ChainedKeyResolver, ConfigKeyResolver, ExplicitKeyResolver, KeyResolver, ReaderKeyResolver,
    TerminalKeyResolver,
};
use relock::transform;

#[derive(Parser)]
#[command(name = "relock")]
#[command(version)]
#[command(
    about = "Encrypt a file in place; run again to decrypt it.",
    long_about = None
)]
struct Cli {
    /// File to encrypt or decrypt in place
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Key to use instead of the configured key
    #[arg(short, long, value_name = "KEY")]
    key: Option<String>,

    /// Read the key from stdin instead of configuration or terminal
    #[arg(long)]
    key_stdin: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut resolver = get_key_resolver(cli.key, cli.key_stdin);
    let key = resolver.resolve_key()?;
    let cipher = Cipher::new(&key)?;

    let file_name = cli
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let data = file_ops::read_file(&cli.file)?;
    let outcome = transform::process(&file_name, &cli.file, &data, &cipher)?;
    println!("{} {}", outcome, file_name);
    Ok(())
}

fn get_key_resolver(explicit: Option<String>, use_stdin: bool) -> Box<dyn KeyResolver> {
    if let Some(key) = explicit {
        Box::new(ExplicitKeyResolver::new(key))
    } else if use_stdin {
        Box::new(ReaderKeyResolver::new(Box::new(std::io::stdin())))
    } else {
        Box::new(ChainedKeyResolver::new(vec![
            Box::new(ConfigKeyResolver::standard()),
            Box::new(TerminalKeyResolver::new()),
        ]))
    }
}
