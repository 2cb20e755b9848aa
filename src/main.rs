use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::BufReader;
use tracing::{debug, info, warn};

use shellhist::shell::{format_history, read_input_line, run_shell, Builtin};
use shellhist::{logging, Config, History, HistoryError, HistoryListener};

#[derive(Parser)]
#[command(name = "shellhist")]
#[command(about = "A small shell that remembers what you typed")]
#[command(version)]
struct Cli {
    /// History file to load from and save to
    #[arg(long, value_name = "FILE")]
    history_file: Option<PathBuf>,

    /// Number of history slots (one is kept free, so N-1 commands are retained)
    #[arg(long, value_name = "N")]
    history_size: Option<usize>,
}

/// Traces history changes; held for the whole session so it stays subscribed.
struct TraceListener;

impl HistoryListener for TraceListener {
    fn entry_added(&self, command: &str) {
        debug!(command, "history entry added");
    }

    fn history_cleared(&self) {
        info!("history cleared");
    }
}

fn build_history(cli: &Cli) -> History {
    let mut config = Config::load();
    if let Some(size) = cli.history_size {
        config.shell_history_size = size;
    }
    if let Some(file) = &cli.history_file {
        config.history_file = Some(file.clone());
    }
    let config = config.validated();

    let path = config.history_file();
    shellhist::config::ensure_parent_dir(&path);
    History::new(config.shell_history_size, path)
}

fn load_history(hist: &mut History) {
    match hist.load() {
        Ok(_) => {}
        Err(HistoryError::NotFound(path)) => {
            debug!(path = %path.display(), "no shell history yet");
        }
        Err(e) => warn!(error = %e, "starting with an empty shell history"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();

    let mut hist = build_history(&cli);
    let tracer = Arc::new(TraceListener);
    hist.subscribe(&tracer);
    load_history(&mut hist);

    let mut input = BufReader::new(tokio::io::stdin());
    loop {
        print!("> ");
        if let Err(e) = std::io::stdout().flush() {
            warn!(error = %e, "could not write prompt");
            break;
        }

        let line = match read_input_line(&mut input).await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "stopped reading input");
                break;
            }
        };

        match Builtin::parse(&line) {
            Some(Builtin::Exit) => break,
            Some(Builtin::List) => {
                for entry in format_history(&hist) {
                    println!("{entry}");
                }
            }
            Some(Builtin::Clear) => hist.clear(),
            Some(Builtin::Write) => {
                if !hist.save() {
                    eprintln!("history: could not write {}", hist.history_file().display());
                }
            }
            None => {
                if line.trim().is_empty() {
                    continue;
                }
                hist.add(&line);
                if let Err(e) = run_shell(&line).await {
                    eprintln!("shell error: {e}");
                }
            }
        }
    }

    if !hist.save() {
        eprintln!("warning: shell history was not saved to {}", hist.history_file().display());
    }
    Ok(())
}
