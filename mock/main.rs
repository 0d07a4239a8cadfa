#![forbid(unsafe_code)]

//! `exifmock`: stand-in for exiftool's `-stay_open True -@ -` mode.
//!
//! Reads one argument per line from stdin and executes the accumulated
//! command at each `-execute`, answering on stdout/stderr followed by the
//! `{ready}` sentinel. Tags live in memory per file; a file whose content is
//! a JSON object seeds that file's initial tags.
//!
//! Fixture behaviour keyed on the subject path:
//!
//! | Suffix   | Behaviour                                                    |
//! |----------|--------------------------------------------------------------|
//! | `.diag`  | a warning line on stderr before the JSON response            |
//! | `.crash` | an error line on stderr, then exit 3 without a sentinel      |
//! | `.big`   | a 256 KiB `Blob` tag in the extraction response              |
//! | `.slow`  | the extraction response is delayed by 500 ms                 |
//! | `.nojson` | an error line on stderr and no JSON before the sentinel     |
//! | `.ro`    | writes fail with `0 image files updated`                     |
//!
//! Tag names starting with `Bogus` are rejected like undefined exiftool tags.
//!
//! Test hooks, passed through `-common_args -api <Opt=Val>`:
//! - `MockLog=<path>` appends every executed command to `<path>`.
//! - `MockHangOnClose=1` sleeps instead of exiting on shutdown.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::time::Duration;

use serde_json::{Map, Value};

#[cfg(not(windows))]
const EOL: &str = "\n";
#[cfg(windows)]
const EOL: &str = "\r\n";

const READY: &str = "{ready}";

/// Options collected from `-api` common arguments.
#[derive(Debug, Default)]
struct Hooks {
    log_path: Option<String>,
    hang_on_close: bool,
}

/// In-memory tag storage keyed by subject path.
#[derive(Debug, Default)]
struct Store {
    files: HashMap<String, Map<String, Value>>,
}

impl Store {
    fn fields(&mut self, path: &str) -> &mut Map<String, Value> {
        self.files
            .entry(path.to_owned())
            .or_insert_with(|| initial_fields(path))
    }
}

enum Outcome {
    Continue,
    Exit(ExitCode),
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.starts_with(&["-stay_open", "True", "-@", "-"].map(String::from)) {
        eprintln!("exifmock: expected -stay_open True -@ -");
        return ExitCode::from(2);
    }
    let hooks = parse_hooks(&args);

    let mut store = Store::default();
    let mut pending: Vec<String> = Vec::new();

    for line in io::stdin().lock().lines() {
        let Ok(line) = line else {
            return ExitCode::from(1);
        };
        let line = line.trim_end_matches('\r').to_owned();
        if line != "-execute" {
            pending.push(line);
            continue;
        }

        let command = std::mem::take(&mut pending);
        log_command(&hooks, &command);

        match execute(&mut store, &hooks, &command) {
            Ok(Outcome::Continue) => {}
            Ok(Outcome::Exit(code)) => return code,
            Err(err) => {
                eprintln!("exifmock: {err}");
                return ExitCode::from(1);
            }
        }
    }

    ExitCode::SUCCESS
}

fn parse_hooks(args: &[String]) -> Hooks {
    let mut hooks = Hooks::default();
    let Some(start) = args.iter().position(|arg| arg == "-common_args") else {
        return hooks;
    };

    let mut common = args[start + 1..].iter();
    while let Some(arg) = common.next() {
        if arg != "-api" {
            continue;
        }
        match common.next().and_then(|opt| opt.split_once('=')) {
            Some(("MockLog", path)) => hooks.log_path = Some(path.to_owned()),
            Some(("MockHangOnClose", value)) => hooks.hang_on_close = value == "1",
            _ => {}
        }
    }
    hooks
}

fn log_command(hooks: &Hooks, command: &[String]) {
    let Some(path) = &hooks.log_path else {
        return;
    };
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{}", command.join(" "));
    }
}

fn execute(store: &mut Store, hooks: &Hooks, command: &[String]) -> io::Result<Outcome> {
    match command {
        [flag, value] if flag == "-stay_open" && value == "False" => {
            if hooks.hang_on_close {
                std::thread::sleep(Duration::from_secs(10));
            }
            Ok(Outcome::Exit(ExitCode::SUCCESS))
        }
        [] => {
            respond("")?;
            Ok(Outcome::Continue)
        }
        [flag, .., path] if flag == "-j" => extract(store, path),
        [directives @ .., path] => write(store, directives, path),
    }
}

fn extract(store: &mut Store, path: &str) -> io::Result<Outcome> {
    if path.ends_with(".crash") {
        eprint!("exifmock: fatal error while parsing {path}{EOL}");
        return Ok(Outcome::Exit(ExitCode::from(3)));
    }
    if path.ends_with(".diag") {
        eprint!("Warning: [minor] diagnostic output for {path}{EOL}");
    }
    if path.ends_with(".nojson") {
        eprint!("Error: Unknown file type - {path}{EOL}");
        respond("")?;
        return Ok(Outcome::Continue);
    }
    if path.ends_with(".slow") {
        std::thread::sleep(Duration::from_millis(500));
    }

    let mut object = Map::new();
    object.insert("SourceFile".into(), Value::String(path.to_owned()));
    for (name, value) in store.fields(path).iter() {
        object.insert(name.clone(), value.clone());
    }
    if path.ends_with(".big") {
        object.insert("Blob".into(), Value::String("x".repeat(256 * 1024)));
    }

    let body = serde_json::to_string(&object).map_err(io::Error::other)?;
    respond(&format!("[{body}]{EOL}"))?;
    Ok(Outcome::Continue)
}

fn write(store: &mut Store, directives: &[String], path: &str) -> io::Result<Outcome> {
    if path.ends_with(".ro") {
        eprint!("Error: File is read-only - {path}{EOL}");
        respond(&format!("    0 image files updated{EOL}"))?;
        return Ok(Outcome::Continue);
    }

    let mut overwrite = false;
    let mut clear_all = false;
    let mut deletions: Vec<String> = Vec::new();
    let mut assignments: Map<String, Value> = Map::new();
    let mut rejected = 0;

    for directive in directives {
        match directive.as_str() {
            "-overwrite_original" => overwrite = true,
            "-All=" => clear_all = true,
            other => {
                let Some((name, value)) = other.strip_prefix('-').and_then(|d| d.split_once('='))
                else {
                    continue;
                };
                if name.starts_with("Bogus") {
                    eprint!("Warning: Tag '{name}' is not defined{EOL}");
                    rejected += 1;
                } else if value.is_empty() {
                    deletions.push(name.to_owned());
                } else {
                    assign(&mut assignments, name, value);
                }
            }
        }
    }

    if rejected > 0 && deletions.is_empty() && assignments.is_empty() && !clear_all {
        respond(&format!("Nothing to do.{EOL}"))?;
        return Ok(Outcome::Continue);
    }

    if !overwrite {
        let _ = fs::copy(path, format!("{path}_original"));
    }

    let fields = store.fields(path);
    if clear_all {
        fields.clear();
    }
    for name in &deletions {
        fields.remove(name);
    }
    for (name, value) in assignments {
        fields.insert(name, value);
    }

    respond(&format!("    1 image files updated{EOL}"))?;
    Ok(Outcome::Continue)
}

/// Repeated assignments to one tag build a list.
fn assign(assignments: &mut Map<String, Value>, name: &str, value: &str) {
    let value = value
        .parse::<i64>()
        .map_or_else(|_| Value::String(value.to_owned()), Value::from);
    match assignments.get_mut(name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            assignments.insert(name.to_owned(), value);
        }
    }
}

fn initial_fields(path: &str) -> Map<String, Value> {
    fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<Map<String, Value>>(&raw).ok())
        .unwrap_or_default()
}

fn respond(body: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(body.as_bytes())?;
    stdout.write_all(format!("{READY}{EOL}").as_bytes())?;
    stdout.flush()
}
