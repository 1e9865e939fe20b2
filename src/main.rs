//! Stylable Compiler Binary

use stylc::cli::StylcCli;
use std::process;

fn main() {
    match StylcCli::new().run() {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Compilation failed: {}", e);
            process::exit(1);
        }
    }
}
