//! Reversible edit commands.
//!
//! A command is executed against a `GraphBackend` and remembers exactly what
//! it needs to undo itself. Undoing and then executing again replays the
//! same edit with the same ids, so a committed change can be redone.

pub mod change_tags;
pub mod split_way;

use std::fmt;

use crate::storage::GraphBackend;
use crate::Result;

pub use change_tags::ChangeTags;
pub use split_way::SplitWay;

/// One edit in a transaction.
#[derive(Debug, Clone)]
pub enum Command {
    SplitWay(SplitWay),
    ChangeTags(ChangeTags),
}

impl Command {
    pub fn execute<B: GraphBackend + ?Sized>(&mut self, backend: &B) -> Result<()> {
        match self {
            Command::SplitWay(c) => c.execute(backend),
            Command::ChangeTags(c) => c.execute(backend),
        }
    }

    pub fn undo<B: GraphBackend + ?Sized>(&mut self, backend: &B) -> Result<()> {
        match self {
            Command::SplitWay(c) => c.undo(backend),
            Command::ChangeTags(c) => c.undo(backend),
        }
    }

    pub fn as_split_way(&self) -> Option<&SplitWay> {
        match self {
            Command::SplitWay(c) => Some(c),
            Command::ChangeTags(_) => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SplitWay(c) => c.fmt(f),
            Command::ChangeTags(c) => c.fmt(f),
        }
    }
}

impl From<SplitWay> for Command {
    fn from(c: SplitWay) -> Self {
        Command::SplitWay(c)
    }
}

impl From<ChangeTags> for Command {
    fn from(c: ChangeTags) -> Self {
        Command::ChangeTags(c)
    }
}
