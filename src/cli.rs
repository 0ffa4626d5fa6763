use std::io::{self, BufRead, Write};

use crate::config::AppConfig;
use crate::data::dataset::{Dataset, DatasetSummary};
use crate::data::history::HistoryStore;
use crate::data::import::{
    read_csv_file, Confirm, DeleteOutcome, ImportOutcome, Importer, Preapproved,
};
use crate::data::validate::validate;
use crate::server;

const USAGE: &str = "usage: csvault <serve|validate|import|history|delete|clear>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    Validate,
    Import,
    History,
    Delete,
    Clear,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("serve") => Some(Command::Serve),
        Some("validate") => Some(Command::Validate),
        Some("import") => Some(Command::Import),
        Some("history") => Some(Command::History),
        Some("delete") => Some(Command::Delete),
        Some("clear") => Some(Command::Clear),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    match parse_command(args) {
        Some(Command::Serve) => with_config(handle_serve),
        Some(Command::Validate) => handle_validate(args),
        Some(Command::Import) => with_config(|cfg| handle_import(cfg, args)),
        Some(Command::History) => with_config(handle_history),
        Some(Command::Delete) => with_config(|cfg| handle_delete(cfg, args)),
        Some(Command::Clear) => with_config(|cfg| handle_clear(cfg, args)),
        None => {
            eprintln!("{USAGE}");
            2
        }
    }
}

fn with_config(run: impl FnOnce(&AppConfig) -> i32) -> i32 {
    match AppConfig::load() {
        Ok(cfg) => run(&cfg),
        Err(err) => {
            eprintln!("configuration error: {err}");
            1
        }
    }
}

/// Asks on stderr and reads the answer from stdin. Anything but y/yes, including
/// a closed stdin, counts as no.
struct StdinConfirm;

impl StdinConfirm {
    fn ask(question: &str) -> bool {
        eprint!("{question} [y/N] ");
        let _ = io::stderr().flush();
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        }
    }
}

impl Confirm for StdinConfirm {
    fn confirm_replace(&mut self, filename: &str) -> bool {
        Self::ask(&format!("'{filename}' was already imported. Replace it?"))
    }

    fn confirm_delete(&mut self, filename: &str) -> bool {
        Self::ask(&format!("Delete '{filename}' from history?"))
    }

    fn confirm_clear(&mut self, entries: usize) -> bool {
        Self::ask(&format!("Remove all {entries} dataset(s) from history?"))
    }
}

fn confirmer(args: &[String]) -> Box<dyn Confirm> {
    if has_flag(args, "--yes") {
        Box::new(Preapproved(true))
    } else {
        Box::new(StdinConfirm)
    }
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().skip(2).any(|arg| arg == flag)
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .skip(2)
        .position(|arg| arg == flag)
        .and_then(|pos| args.get(pos + 3))
        .map(String::as_str)
}

/// First positional argument after the command, skipping flags and their values.
fn positional(args: &[String]) -> Option<&str> {
    let mut iter = args.iter().skip(2);
    while let Some(arg) = iter.next() {
        if arg == "--name" {
            iter.next();
        } else if !arg.starts_with("--") {
            return Some(arg.as_str());
        }
    }
    None
}

fn handle_serve(cfg: &AppConfig) -> i32 {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start runtime: {err}");
            return 1;
        }
    };
    match runtime.block_on(server::run_server(cfg)) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err}");
            1
        }
    }
}

fn handle_validate(args: &[String]) -> i32 {
    let Some(path) = positional(args) else {
        eprintln!("usage: csvault validate <file.csv>");
        return 2;
    };
    match read_csv_file(path) {
        Ok((_, rows)) => {
            let report = validate(&rows);
            println!("{report}");
            if report.is_valid {
                0
            } else {
                1
            }
        }
        Err(err) => {
            eprintln!("validation failed: {err}");
            1
        }
    }
}

fn handle_import(cfg: &AppConfig, args: &[String]) -> i32 {
    let Some(path) = positional(args) else {
        eprintln!("usage: csvault import <file.csv> [--name <filename>] [--yes]");
        return 2;
    };
    let (basename, rows) = match read_csv_file(path) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("import failed: {err}");
            return 1;
        }
    };
    let filename = flag_value(args, "--name").unwrap_or(&basename).to_string();

    let mut store = HistoryStore::open(cfg.history_backend());
    let mut confirm = confirmer(args);
    let outcome = Importer::new(&mut store, confirm.as_mut()).import_rows(&filename, rows);

    if let Some(report) = outcome.report() {
        println!("{report}");
    }
    match outcome {
        ImportOutcome::Declined { filename } => {
            eprintln!("import cancelled: '{filename}' left unchanged");
            1
        }
        ImportOutcome::Rejected { .. } => {
            eprintln!("import rejected: '{filename}' was not saved");
            1
        }
        ImportOutcome::Committed {
            dataset,
            replaced,
            persist_warning,
            ..
        } => {
            if let Some(warning) = persist_warning {
                eprintln!("warning: {warning}");
            }
            println!(
                "import complete: id={}, filename='{}', rows={}{}",
                dataset.id,
                dataset.filename,
                dataset.rows.len(),
                if replaced { " (replaced)" } else { "" }
            );
            0
        }
    }
}

fn handle_history(cfg: &AppConfig) -> i32 {
    let store = HistoryStore::open(cfg.history_backend());
    let summaries: Vec<DatasetSummary> = store.usage_history().iter().map(Dataset::summary).collect();
    match serde_json::to_string_pretty(&summaries) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize history: {err}");
            1
        }
    }
}

fn handle_delete(cfg: &AppConfig, args: &[String]) -> i32 {
    let Some(id) = positional(args) else {
        eprintln!("usage: csvault delete <id> [--yes]");
        return 2;
    };
    let mut store = HistoryStore::open(cfg.history_backend());
    let mut confirm = confirmer(args);
    match Importer::new(&mut store, confirm.as_mut()).delete(id) {
        DeleteOutcome::NotFound => println!("no dataset with id '{id}'"),
        DeleteOutcome::Declined => println!("delete cancelled"),
        DeleteOutcome::Deleted {
            filename,
            persist_warning,
        } => {
            if let Some(warning) = persist_warning {
                eprintln!("warning: {warning}");
            }
            println!("deleted '{filename}' ({id})");
        }
    }
    0
}

fn handle_clear(cfg: &AppConfig, args: &[String]) -> i32 {
    let mut store = HistoryStore::open(cfg.history_backend());
    let mut confirm = confirmer(args);
    match Importer::new(&mut store, confirm.as_mut()).clear() {
        None => println!("clear cancelled"),
        Some(warning) => {
            if let Some(warning) = warning {
                eprintln!("warning: {warning}");
            }
            println!("history cleared");
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn parses_known_commands_only() {
        assert_eq!(parse_command(&args(&["csvault", "import"])), Some(Command::Import));
        assert_eq!(parse_command(&args(&["csvault", "clear"])), Some(Command::Clear));
        assert_eq!(parse_command(&args(&["csvault", "simulate"])), None);
        assert_eq!(parse_command(&args(&["csvault"])), None);
    }

    #[test]
    fn positional_skips_flags_and_name_value() {
        let parsed = args(&["csvault", "import", "--yes", "--name", "x.csv", "data/in.csv"]);
        assert_eq!(positional(&parsed), Some("data/in.csv"));
        assert_eq!(flag_value(&parsed, "--name"), Some("x.csv"));
        assert!(has_flag(&parsed, "--yes"));
        assert_eq!(flag_value(&args(&["csvault", "import", "a.csv"]), "--name"), None);
    }
}
