// jex command-line interface
// Decodes the JSON inputs, assembles the evaluation environment, runs the
// expression and prints the result.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use jex::{compile, decode, Environment, Error, Value};

#[derive(Parser)]
#[command(name = "jex")]
#[command(version)]
#[command(about = "Command-line JSON processor: evaluate a Python-flavored expression against JSON input")]
struct Cli {
    /// Expression to evaluate; the primary input is bound as `d`, all
    /// inputs as `inputs`, the placeholder identity as `_`
    expr: String,

    /// Input files; reads stdin when none are given
    files: Vec<PathBuf>,

    /// Do not read any input; `d` is None and `inputs` is empty
    #[arg(short = 'n', long)]
    null_input: bool,

    /// Bind NAME to the string VALUE in the environment (repeatable)
    #[arg(long, num_args = 2, value_names = ["NAME", "VALUE"], action = clap::ArgAction::Append)]
    arg: Vec<String>,

    /// Output on a single line without indentation
    #[arg(short = 'c', long)]
    compact_output: bool,

    /// Spaces per indentation level
    #[arg(long, default_value_t = 2, conflicts_with = "tab")]
    indent: usize,

    /// Indent with tabs instead of spaces
    #[arg(long)]
    tab: bool,

    /// Print string results without JSON quoting
    #[arg(short = 'r', long)]
    raw_output: bool,

    /// Escape non-ASCII characters in the output
    #[arg(short = 'a', long)]
    ascii_output: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("jex: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let expr = compile(&cli.expr)?;

    let inputs = read_inputs(cli)?;
    log::debug!("decoded {} input(s)", inputs.len());

    let mut env = Environment::with_inputs(inputs);
    for pair in cli.arg.chunks(2) {
        env.bind(pair[0].clone(), Value::from(pair[1].as_str()));
    }

    let result = expr.evaluate(&mut env)?;
    print_result(cli, &result)
}

/// Decode every input source; failures name the offending file.
fn read_inputs(cli: &Cli) -> Result<Vec<Value>, Error> {
    if cli.null_input {
        return Ok(Vec::new());
    }

    if cli.files.is_empty() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| Error::Data {
                name: "<stdin>".to_string(),
                reason: e.to_string(),
            })?;
        return Ok(vec![decode("<stdin>", &text)?]);
    }

    let mut inputs = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        let name = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|e| Error::Data {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        inputs.push(decode(&name, &text)?);
    }
    Ok(inputs)
}

fn print_result(cli: &Cli, result: &Value) -> anyhow::Result<()> {
    // Raw output prints bare strings; everything else falls through to JSON
    if cli.raw_output {
        if let Some(s) = result.as_str() {
            println!("{}", s);
            return Ok(());
        }
    }

    let mut text = to_json(cli, result)?;
    if cli.ascii_output {
        text = escape_non_ascii(&text);
    }
    println!("{}", text);
    Ok(())
}

fn to_json(cli: &Cli, value: &Value) -> anyhow::Result<String> {
    let mut buf = Vec::new();
    if cli.compact_output {
        let mut ser = serde_json::Serializer::new(&mut buf);
        value.serialize(&mut ser)?;
    } else {
        let indent: Vec<u8> = if cli.tab {
            vec![b'\t']
        } else {
            vec![b' '; cli.indent]
        };
        let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        value.serialize(&mut ser)?;
    }
    Ok(String::from_utf8(buf)?)
}

/// Replace every non-ASCII character with its `\uXXXX` escape (surrogate
/// pairs for astral codepoints), leaving the JSON structure untouched.
fn escape_non_ascii(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut units = [0u16; 2];
    for c in s.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}
