//! Ember CLI — compile, verify, execute, and disassemble Ember programs.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Usage or compile error
//! - 2: Verification failure
//! - 3: Runtime error (fatal VM stop)

mod commands;

use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "check" => commands::check(&args[2..]),
        "run" => commands::run(&args[2..]),
        "disasm" => commands::disasm(&args[2..]),
        "--help" | "-h" | "help" => {
            print_usage();
            process::exit(0);
        }
        other => {
            eprintln!("error: unknown command '{other}'");
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    if let Err(code) = result {
        process::exit(code);
    }
}

fn print_usage() {
    eprintln!("Usage: ember <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  check <prog.emb>     Compile and verify, reporting diagnostics");
    eprintln!("  run <prog.emb>       Compile, verify, and execute");
    eprintln!("  disasm <prog.emb>    Compile and print the bytecode");
    eprintln!();
    eprintln!("Security flags (check/run/disasm):");
    eprintln!("  --max-instructions N   Executed-instruction budget [1000, 1000000]");
    eprintln!("  --stack-size N         Value stack capacity [16, 2048]");
    eprintln!("  --allow-pins LIST      Comma-separated allowed pins, e.g. 2,3,13");
}
