// src/shell.rs
use std::io;
use std::process::Stdio;

use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    process::Command,
};
use tracing::debug;

use crate::history::History;

/// Commands the shell handles itself instead of passing to `sh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `history`: list entries, oldest first.
    List,
    /// `history -c`
    Clear,
    /// `history -w`
    Write,
    Exit,
}

impl Builtin {
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let builtin = match (words.next()?, words.next()) {
            ("history", None) => Builtin::List,
            ("history", Some("-c")) => Builtin::Clear,
            ("history", Some("-w")) => Builtin::Write,
            ("exit", None) => Builtin::Exit,
            _ => return None,
        };
        if words.next().is_some() {
            return None;
        }
        Some(builtin)
    }
}

/// Numbered listing as printed by the `history` builtin.
pub fn format_history(history: &History) -> Vec<String> {
    history
        .iter()
        .enumerate()
        .map(|(i, cmd)| format!("{:5}  {}", i + 1, cmd))
        .collect()
}

/// Reads one line of input without the line ending. `None` at end of input.
///
/// Invalid UTF-8 is replaced rather than treated as an error, so a stray byte
/// cannot end the session before the history is saved.
pub async fn read_input_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// Forwards child output line by line, bytes unchanged, until end of stream.
pub async fn pump<R, W>(source: R, mut sink: W) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(source);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return sink.flush().await;
        }
        sink.write_all(&buf).await?;
        sink.flush().await?;
    }
}

/// Runs `cmdline` through `sh -c`, echoing its output line by line.
///
/// Ctrl-C kills the child instead of the shell. Returns the exit code, or -1
/// if the process was killed or ended by a signal.
pub async fn run_shell(cmdline: &str) -> anyhow::Result<i32> {
    debug!(cmdline, "running command");

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(cmdline)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // stdout
    let out_task = child
        .stdout
        .take()
        .map(|out| tokio::spawn(pump(out, tokio::io::stdout())));

    // stderr
    let err_task = child
        .stderr
        .take()
        .map(|err| tokio::spawn(pump(err, tokio::io::stderr())));

    // wait for completion OR ctrl-c
    let code = tokio::select! {
        status = child.wait() => status?.code().unwrap_or(-1),
        _ = tokio::signal::ctrl_c() => {
            let _ = child.kill().await;
            eprintln!("↯ process killed");
            -1
        }
    };

    // drain remaining output before the prompt comes back
    for task in [out_task, err_task].into_iter().flatten() {
        if let Ok(Err(e)) = task.await {
            debug!(error = %e, "lost command output");
        }
    }

    debug!(cmdline, code, "command finished");
    Ok(code)
}
