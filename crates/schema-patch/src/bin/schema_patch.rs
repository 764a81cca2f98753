//! `schema-patch`: apply a schema patch to a table schema.
//!
//! Usage:
//!   schema-patch '<patch-array-json>' [--plain]
//!
//! The schema is read from stdin. `--plain` disables `required` syncing.

use std::io::{self, Read, Write};

use schema_patch::cli::apply_json_patch;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let patch = match args.get(1) {
        Some(p) => p.clone(),
        None => {
            eprintln!("First argument must be a JSON patch array.");
            std::process::exit(1);
        }
    };
    let schema_aware = !args.iter().skip(2).any(|a| a == "--plain");

    let mut buf = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut buf) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    match apply_json_patch(buf.trim(), &patch, schema_aware) {
        Ok(result) => {
            let mut out = io::stdout();
            if let Err(e) = out.write_all(result.as_bytes()).and_then(|_| out.write_all(b"\n")) {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
