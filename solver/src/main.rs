use std::env;
use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::process::ExitCode;

use rill::Instance;

fn usage(program: &str) -> String {
    format!("usage: {program} [INPUT] [--dot PATH]\n\nReads the instance from INPUT (default: stdin), writes the command list to\nstdout. With --dot, also writes the solved network in Graphviz format to PATH.")
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "rill".to_owned());

    let mut input: Option<String> = None;
    let mut dot: Option<String> = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dot" => {
                dot = Some(args.next().ok_or_else(|| usage(&program))?);
            }
            "--help" | "-h" => {
                println!("{}", usage(&program));
                return Ok(());
            }
            _ if input.is_none() => input = Some(arg),
            _ => return Err(usage(&program).into()),
        }
    }

    let text = match input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let instance: Instance = text.parse()?;
    let solved = instance.solve()?;

    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    solved.write_commands(&mut writer)?;
    writer.flush()?;

    if let Some(path) = dot {
        let mut writer = BufWriter::new(File::create(path)?);
        solved.write_dot(&mut writer)?;
        writer.flush()?;
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("{failure}");
            ExitCode::FAILURE
        }
    }
}
