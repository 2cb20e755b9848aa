//! Reading and writing the history file.
//!
//! Writes never touch the destination until the new contents are complete:
//! the commands go to a temporary file next to it, which is synced and then
//! renamed over the destination. If anything fails, the temporary file is
//! removed and the previous history file stays as it was.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::codec::HistoryCodec;
use crate::error::{HistoryError, Result};

/// Reads every command stored in `path`, oldest first.
///
/// A missing file is reported as [`HistoryError::NotFound`].
pub fn read_commands(path: &Path, codec: &dyn HistoryCodec) -> Result<Vec<String>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(HistoryError::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(HistoryError::io(path, e)),
    };

    let mut reader = BufReader::new(file);
    let commands = codec.decode(&mut reader).map_err(|e| match e.kind() {
        io::ErrorKind::InvalidData => HistoryError::Format {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
        _ => HistoryError::io(path, e),
    })?;

    debug!(path = %path.display(), count = commands.len(), "read history file");
    Ok(commands)
}

/// Atomically replaces `path` with `commands`.
pub fn write_commands(path: &Path, codec: &dyn HistoryCodec, commands: &[&str]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| HistoryError::io(dir, e))?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        codec
            .encode(commands, &mut writer)
            .and_then(|_| writer.flush())
            .map_err(|e| HistoryError::io(path, e))?;
    }
    temp.as_file()
        .sync_all()
        .map_err(|e| HistoryError::io(path, e))?;

    // On failure the returned temp file is dropped, which deletes it.
    temp.persist(path)
        .map_err(|e| HistoryError::io(path, e.error))?;

    debug!(path = %path.display(), count = commands.len(), "wrote history file");
    Ok(())
}
