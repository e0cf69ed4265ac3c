//! Binario del operador.

use phase_cli::{dispatch, CliArgs};

fn main() {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = CliArgs::parse(&raw);
    match dispatch(&args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
