//! On-disk record format for the shell history.
//!
//! The persistence layer only relies on [`HistoryCodec`]: whatever `encode`
//! writes, `decode` must read back as the same commands in the same order.
//! Format problems are reported as [`io::ErrorKind::InvalidData`].
//!
//! The default [`JsonCodec`] writes:
//!
//! ```json
//! {
//!   "version": 1,
//!   "commands": ["ls", "cd .."]
//! }
//! ```

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

pub trait HistoryCodec: Send + Sync {
    /// Writes `commands`, oldest first.
    fn encode(&self, commands: &[&str], out: &mut dyn Write) -> io::Result<()>;

    /// Reads every stored command, oldest first.
    fn decode(&self, input: &mut dyn Read) -> io::Result<Vec<String>>;
}

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct HistoryFileOut<'a> {
    version: u32,
    commands: &'a [&'a str],
}

#[derive(Deserialize)]
struct HistoryFileIn {
    version: u32,
    commands: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl HistoryCodec for JsonCodec {
    fn encode(&self, commands: &[&str], out: &mut dyn Write) -> io::Result<()> {
        let file = HistoryFileOut {
            version: FORMAT_VERSION,
            commands,
        };
        serde_json::to_writer_pretty(&mut *out, &file).map_err(io::Error::from)?;
        out.write_all(b"\n")
    }

    fn decode(&self, input: &mut dyn Read) -> io::Result<Vec<String>> {
        let file: HistoryFileIn = serde_json::from_reader(input).map_err(|e| {
            if e.is_io() {
                io::Error::from(e)
            } else {
                io::Error::new(io::ErrorKind::InvalidData, e)
            }
        })?;

        if file.version != FORMAT_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "unsupported history file version: {} (expected {FORMAT_VERSION})",
                    file.version
                ),
            ));
        }
        Ok(file.commands)
    }
}
