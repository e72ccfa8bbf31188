//! CLI command implementations.

use std::fs;

use ember_compiler::{compile, disassemble, CompileOutput};
use ember_security::SecurityConfig;
use ember_vm::io::{NullPins, StdClock, StdConsole};
use ember_vm::Vm;

/// Parse the argument list into a configured `SecurityConfig` plus the
/// positional arguments. Flag errors print and map to exit code 1.
fn parse_args(args: &[String]) -> Result<(SecurityConfig, Vec<String>), i32> {
    let mut config = SecurityConfig::default();
    let mut positional = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--max-instructions" => {
                let value = flag_value(iter.next(), "--max-instructions")?;
                let count: u32 = value.parse().map_err(|_| {
                    eprintln!("error: --max-instructions expects a number");
                    1
                })?;
                config.set_max_instructions(count).map_err(|e| {
                    eprintln!("error: {e}");
                    1
                })?;
            }
            "--stack-size" => {
                let value = flag_value(iter.next(), "--stack-size")?;
                let size: usize = value.parse().map_err(|_| {
                    eprintln!("error: --stack-size expects a number");
                    1
                })?;
                config.set_max_stack_size(size).map_err(|e| {
                    eprintln!("error: {e}");
                    1
                })?;
            }
            "--allow-pins" => {
                let value = flag_value(iter.next(), "--allow-pins")?;
                let mut pins = Vec::new();
                for part in value.split(',') {
                    let pin: u8 = part.trim().parse().map_err(|_| {
                        eprintln!("error: invalid pin '{part}' (pins are 0-255)");
                        1
                    })?;
                    pins.push(pin);
                }
                config.set_allowed_pins(pins);
            }
            _ => positional.push(arg.clone()),
        }
    }

    Ok((config, positional))
}

fn flag_value<'v>(value: Option<&'v String>, flag: &str) -> Result<&'v String, i32> {
    value.ok_or_else(|| {
        eprintln!("error: {flag} requires a value");
        1
    })
}

fn read_source(path: &str) -> Result<String, i32> {
    fs::read_to_string(path).map_err(|e| {
        eprintln!("error: cannot read '{path}': {e}");
        1
    })
}

/// Print diagnostics to stderr. Returns true if any were real errors.
fn report_diagnostics(output: &CompileOutput) -> bool {
    for error in &output.errors {
        if error.is_warning() {
            eprintln!("warning: {error}");
        } else {
            eprintln!("error: {error}");
        }
    }
    !output.is_clean()
}

/// Compile and verify a source file, reporting every diagnostic.
pub fn check(args: &[String]) -> Result<(), i32> {
    let (config, positional) = parse_args(args)?;
    let Some(input) = positional.first() else {
        eprintln!("error: check requires an input file");
        eprintln!("Usage: ember check <prog.emb>");
        return Err(1);
    };

    let source = read_source(input)?;
    let output = compile(&source, &config);
    let had_errors = report_diagnostics(&output);

    if let Err(errors) = config.verify_bytecode(&output.program) {
        for e in &errors {
            eprintln!("error: {e}");
        }
        return Err(2);
    }

    if had_errors {
        return Err(1);
    }

    println!(
        "OK: {input} ({} instructions, {} strings)",
        output.program.len(),
        output.program.strings.len()
    );
    Ok(())
}

/// Compile, verify, and execute a source file with std I/O.
///
/// Compile diagnostics go to stderr but do not stop the run — erroneous
/// lines were skipped, the rest of the program still executes.
pub fn run(args: &[String]) -> Result<(), i32> {
    let (config, positional) = parse_args(args)?;
    let Some(input) = positional.first() else {
        eprintln!("error: run requires an input file");
        eprintln!("Usage: ember run <prog.emb>");
        return Err(1);
    };

    let source = read_source(input)?;
    let output = compile(&source, &config);
    report_diagnostics(&output);

    let mut vm = Vm::new(&config, StdConsole, NullPins, StdClock);
    if let Err(errors) = vm.load_program(output.program) {
        for e in &errors {
            eprintln!("error: {e}");
        }
        return Err(2);
    }

    vm.run();
    if vm.last_error().is_some() {
        return Err(3);
    }
    Ok(())
}

/// Compile a source file and print its bytecode.
pub fn disasm(args: &[String]) -> Result<(), i32> {
    let (config, positional) = parse_args(args)?;
    let Some(input) = positional.first() else {
        eprintln!("error: disasm requires an input file");
        eprintln!("Usage: ember disasm <prog.emb>");
        return Err(1);
    };

    let source = read_source(input)?;
    let output = compile(&source, &config);
    if report_diagnostics(&output) {
        return Err(1);
    }

    print!("{}", disassemble(&output.program));
    Ok(())
}
