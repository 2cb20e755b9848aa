// Shell history: bounded command buffer, listeners and the history file.
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::codec::{HistoryCodec, JsonCodec};
use crate::error::{HistoryError, Result};
use crate::listeners::{HistoryListener, Listeners, SubscriptionId};
use crate::persist;
use crate::ring::{HistoryIterator, RingBuffer};

/// History of commands typed into the shell.
///
/// One instance is created at startup and handed by reference to whatever
/// needs to record or browse commands. Mutation goes through `&mut self`, so
/// a single writer is enforced by the borrow checker.
pub struct History {
    ring: RingBuffer,
    listeners: Listeners,
    path: PathBuf,
    codec: Box<dyn HistoryCodec>,
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("ring", &self.ring)
            .field("listeners", &self.listeners)
            .field("path", &self.path)
            .finish()
    }
}

impl History {
    /// Creates an empty history persisted to `path` with the JSON codec.
    ///
    /// `capacity` follows [`RingBuffer::new`]: at most `capacity - 1`
    /// commands are retained.
    pub fn new(capacity: usize, path: PathBuf) -> Self {
        Self {
            ring: RingBuffer::new(capacity),
            listeners: Listeners::new(),
            path,
            codec: Box::new(JsonCodec),
        }
    }

    pub fn with_codec(mut self, codec: impl HistoryCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    pub fn add(&mut self, command: &str) -> bool {
        if !self.ring.add(command) {
            return false;
        }
        debug!(command, "added to shell history");
        self.listeners.notify_entry_added(command);
        true
    }

    pub fn clear(&mut self) {
        self.ring.clear();
        debug!("shell history cleared");
        self.listeners.notify_history_cleared();
    }

    /// Oldest to newest.
    pub fn iter(&self) -> HistoryIterator<'_> {
        self.ring.iter()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn last(&self) -> Option<&str> {
        self.ring.last()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.ring.to_vec()
    }

    /// The listener keeps receiving events until it is unsubscribed or its
    /// last `Arc` is dropped.
    pub fn subscribe<L: HistoryListener + 'static>(&mut self, listener: &Arc<L>) -> SubscriptionId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Where the history is loaded from and saved to.
    ///
    /// The file may not exist yet: a user who never saved a history has none.
    pub fn history_file(&self) -> &Path {
        &self.path
    }

    /// Points the history at an existing, readable file.
    pub fn set_history_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let valid = fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
            && File::open(path).is_ok();
        if !valid {
            return Err(HistoryError::InvalidHistoryFile(path.to_path_buf()));
        }
        self.path = path.to_path_buf();
        Ok(())
    }

    /// Loads the history file, see [`History::load_from`].
    pub fn load(&mut self) -> Result<usize> {
        let path = self.path.clone();
        self.load_from(&path)
    }

    /// Replays every command stored in `path` through [`History::add`], so
    /// duplicate suppression and eviction apply as for typed commands.
    ///
    /// Returns the number of records read. Nothing is added if the file is
    /// missing ([`HistoryError::NotFound`]) or malformed.
    pub fn load_from(&mut self, path: &Path) -> Result<usize> {
        let commands = persist::read_commands(path, self.codec.as_ref())?;
        for command in &commands {
            self.add(command);
        }
        info!(path = %path.display(), records = commands.len(), retained = self.len(), "loaded shell history");
        Ok(commands.len())
    }

    /// Saves to the history file, see [`History::save_to`].
    pub fn save(&self) -> bool {
        self.save_to(&self.path)
    }

    /// Like [`History::save`], but reports why the save failed.
    pub fn try_save(&self) -> Result<()> {
        self.try_save_to(&self.path)
    }

    /// Writes the history to `path`, oldest first.
    ///
    /// Returns `false` if the file could not be written; the previous
    /// contents of `path` are then left untouched.
    pub fn save_to(&self, path: &Path) -> bool {
        match self.try_save_to(path) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to save shell history");
                false
            }
        }
    }

    pub fn try_save_to(&self, path: &Path) -> Result<()> {
        let commands: Vec<&str> = self.iter().collect();
        persist::write_commands(path, self.codec.as_ref(), &commands)?;
        info!(path = %path.display(), records = commands.len(), "saved shell history");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Read, Write};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// One command per line.
    struct LineCodec;

    impl HistoryCodec for LineCodec {
        fn encode(&self, commands: &[&str], out: &mut dyn Write) -> io::Result<()> {
            for cmd in commands {
                writeln!(out, "{cmd}")?;
            }
            Ok(())
        }

        fn decode(&self, input: &mut dyn Read) -> io::Result<Vec<String>> {
            let mut text = String::new();
            input.read_to_string(&mut text)?;
            Ok(text.lines().map(str::to_owned).collect())
        }
    }

    #[derive(Default)]
    struct Counter {
        added: AtomicUsize,
        cleared: AtomicUsize,
    }

    impl HistoryListener for Counter {
        fn entry_added(&self, _command: &str) {
            self.added.fetch_add(1, Ordering::SeqCst);
        }

        fn history_cleared(&self) {
            self.cleared.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn history(capacity: usize) -> History {
        History::new(capacity, PathBuf::from("shell_history.json"))
    }

    #[test]
    fn suppressed_adds_emit_nothing() {
        let mut hist = history(5);
        let counter = Arc::new(Counter::default());
        hist.subscribe(&counter);

        assert!(!hist.add(""));
        assert!(!hist.add("   "));
        assert!(hist.add("ls"));
        assert!(!hist.add("ls"));

        assert_eq!(hist.len(), 1);
        assert_eq!(counter.added.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_fires_once_and_empties() {
        let mut hist = history(5);
        let counter = Arc::new(Counter::default());
        hist.subscribe(&counter);
        hist.add("ls");

        hist.clear();

        assert!(!hist.iter().has_next());
        assert_eq!(counter.cleared.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn eviction_still_notifies() {
        let mut hist = history(2);
        let counter = Arc::new(Counter::default());
        hist.subscribe(&counter);

        hist.add("a");
        hist.add("b");

        assert_eq!(hist.to_vec(), vec!["b"]);
        assert_eq!(counter.added.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn set_history_file_rejects_missing_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut hist = history(5);

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            hist.set_history_file(&missing),
            Err(HistoryError::InvalidHistoryFile(_))
        ));
        assert!(matches!(
            hist.set_history_file(dir.path()),
            Err(HistoryError::InvalidHistoryFile(_))
        ));
        assert_eq!(hist.history_file(), Path::new("shell_history.json"));
    }

    #[test]
    fn set_history_file_accepts_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        fs::write(&path, "").unwrap();

        let mut hist = history(5);
        hist.set_history_file(&path).unwrap();
        assert_eq!(hist.history_file(), path.as_path());
    }

    #[test]
    fn load_replays_through_add() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shell_history.json");
        fs::write(
            &path,
            r#"{"version":1,"commands":["a","a","b","","c","d"]}"#,
        )
        .unwrap();

        let mut hist = History::new(4, path);
        let counter = Arc::new(Counter::default());
        hist.subscribe(&counter);

        assert_eq!(hist.load().unwrap(), 6);
        assert_eq!(hist.to_vec(), vec!["b", "c", "d"]);
        assert_eq!(counter.added.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn malformed_load_leaves_history_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shell_history.json");
        fs::write(&path, r#"{"version":1,"commands":["a", 3]}"#).unwrap();

        let mut hist = History::new(4, path);
        hist.add("kept");

        assert!(matches!(hist.load(), Err(HistoryError::Format { .. })));
        assert_eq!(hist.to_vec(), vec!["kept"]);
    }

    #[test]
    fn custom_codec_is_used_for_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.txt");

        let mut hist = History::new(5, path.clone()).with_codec(LineCodec);
        hist.add("ls");
        hist.add("cd ..");
        hist.try_save().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "ls\ncd ..\n");

        let mut restored = History::new(5, path).with_codec(LineCodec);
        assert_eq!(restored.load().unwrap(), 2);
        assert_eq!(restored.to_vec(), vec!["ls", "cd .."]);
    }

    #[test]
    fn try_save_reports_the_cause() {
        let dir = tempfile::tempdir().unwrap();
        let hist = History::new(5, dir.path().join("missing").join("h.json"));
        assert!(matches!(hist.try_save(), Err(HistoryError::Io { .. })));
    }
}
