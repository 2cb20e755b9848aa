//! Bounded shell command history with change notification and crash-safe
//! persistence.
//!
//! [`History`] is the entry point: commands go in through [`History::add`],
//! come back out oldest first through [`History::iter`], and are kept on disk
//! with [`History::load`] and [`History::save`].

pub mod codec;
pub mod config;
pub mod error;
pub mod history;
pub mod listeners;
pub mod logging;
pub mod persist;
pub mod ring;
pub mod shell;

pub use codec::{HistoryCodec, JsonCodec};
pub use config::Config;
pub use error::{HistoryError, Result};
pub use history::History;
pub use listeners::{HistoryListener, Listeners, SubscriptionId};
pub use ring::{HistoryIterator, RingBuffer};
