//! Transaction management.
//!
//! Commands are executed eagerly as they are added. The first failure undoes
//! everything applied so far, in reverse order, and poisons the transaction.
//! A transaction that is dropped without `commit` is rolled back as well, so
//! an early return never leaves half an edit behind.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::storage::GraphBackend;
use crate::{Error, Result};

/// Opaque transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub u64);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx{}", self.0)
    }
}

static NEXT_TX_ID: AtomicU64 = AtomicU64::new(1);

/// Where a transaction stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxState {
    Open,
    Failed,
    Committed,
    Aborted,
}

// ============================================================================
// Transaction
// ============================================================================

/// All-or-nothing batch of commands against one backend.
pub struct Transaction<'b, B: GraphBackend + ?Sized> {
    backend: &'b B,
    id: TxId,
    applied: Vec<Command>,
    state: TxState,
}

impl<'b, B: GraphBackend + ?Sized> Transaction<'b, B> {
    pub fn begin(backend: &'b B) -> Self {
        let id = TxId(NEXT_TX_ID.fetch_add(1, Ordering::Relaxed));
        tracing::trace!(tx = %id, "Begin transaction");
        Self { backend, id, applied: Vec::new(), state: TxState::Open }
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    /// Commands applied so far, in order.
    pub fn applied(&self) -> &[Command] {
        &self.applied
    }

    /// Execute a command and keep it for undo.
    ///
    /// On failure everything applied so far is rolled back and the
    /// transaction refuses further commands.
    pub fn execute(&mut self, command: impl Into<Command>) -> Result<&Command> {
        if self.state != TxState::Open {
            return Err(Error::TxError(format!("{} is {:?}", self.id, self.state)));
        }
        let mut command = command.into();
        if let Err(e) = command.execute(self.backend) {
            tracing::warn!(tx = %self.id, %command, error = %e, "Command failed, rolling back");
            self.rollback();
            self.state = TxState::Failed;
            return Err(e);
        }
        self.applied.push(command);
        Ok(&self.applied[self.applied.len() - 1])
    }

    /// Keep the applied commands. They are handed back so the host can put
    /// them on its undo stack; they must not be executed again.
    pub fn commit(mut self, description: impl Into<String>) -> Result<CommittedChange> {
        if self.state != TxState::Open {
            return Err(Error::TxError(format!("cannot commit {}: {:?}", self.id, self.state)));
        }
        self.state = TxState::Committed;
        let change = CommittedChange {
            description: description.into(),
            committed_at: Utc::now(),
            commands: std::mem::take(&mut self.applied),
            undone: false,
        };
        tracing::debug!(tx = %self.id, description = %change.description, commands = change.commands.len(), "Committed");
        Ok(change)
    }

    /// Undo everything applied and close the transaction.
    pub fn abort(mut self) {
        self.rollback();
        self.state = TxState::Aborted;
    }

    fn rollback(&mut self) {
        while let Some(mut command) = self.applied.pop() {
            if let Err(e) = command.undo(self.backend) {
                tracing::error!(tx = %self.id, %command, error = %e, "Undo failed during rollback");
            }
        }
    }
}

impl<B: GraphBackend + ?Sized> Drop for Transaction<'_, B> {
    fn drop(&mut self) {
        if self.state == TxState::Open && !self.applied.is_empty() {
            tracing::warn!(tx = %self.id, commands = self.applied.len(), "Transaction dropped without commit, rolling back");
            self.rollback();
        }
    }
}

// ============================================================================
// CommittedChange
// ============================================================================

/// A committed edit, ready for a host undo/redo stack.
#[derive(Debug)]
pub struct CommittedChange {
    pub description: String,
    pub committed_at: DateTime<Utc>,
    commands: Vec<Command>,
    undone: bool,
}

impl CommittedChange {
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_undone(&self) -> bool {
        self.undone
    }

    /// Revert the change, last command first.
    ///
    /// If a command can't be undone, the commands already undone are executed
    /// again and the change stays applied.
    pub fn undo<B: GraphBackend + ?Sized>(&mut self, backend: &B) -> Result<()> {
        if self.undone {
            return Err(Error::TxError(format!("'{}' is already undone", self.description)));
        }
        for i in (0..self.commands.len()).rev() {
            if let Err(e) = self.commands[i].undo(backend) {
                tracing::warn!(change = %self.description, command = %self.commands[i], error = %e, "Undo failed, reapplying");
                for command in self.commands[i + 1..].iter_mut() {
                    if let Err(e) = command.execute(backend) {
                        tracing::error!(%command, error = %e, "Could not reapply command");
                    }
                }
                return Err(e);
            }
        }
        self.undone = true;
        Ok(())
    }

    /// Re-apply an undone change, first command first.
    ///
    /// If a command fails, the commands already re-applied are undone again
    /// and the change stays undone.
    pub fn redo<B: GraphBackend + ?Sized>(&mut self, backend: &B) -> Result<()> {
        if !self.undone {
            return Err(Error::TxError(format!("'{}' is not undone", self.description)));
        }
        for i in 0..self.commands.len() {
            if let Err(e) = self.commands[i].execute(backend) {
                tracing::warn!(change = %self.description, command = %self.commands[i], error = %e, "Redo failed, rolling back");
                for command in self.commands[..i].iter_mut().rev() {
                    if let Err(e) = command.undo(backend) {
                        tracing::error!(%command, error = %e, "Undo failed during rollback");
                    }
                }
                return Err(e);
            }
        }
        self.undone = false;
        Ok(())
    }
}
