//! # Grace-Period Deletion
//!
//! Deletes are reversible for a short window. Each deletion class (books,
//! folders) owns one [`GracePeriod`], a tagged state machine:
//!
//! ```text
//!            arm                 deadline / re-delete / flush
//!   Idle ----------> Pending ---------------------------------> Finalizing --> Idle
//!                       |
//!                       +-- undo (before deadline) --> Undone --> Idle
//! ```
//!
//! The machine holds the snapshot while `Pending` and hands it to the caller
//! when leaving that state. The caller performs the side effects (restore rows,
//! or delete files and rows) and then calls [`GracePeriod::settle`].
//!
//! At most one deletion is pending per class. Arming a new one while another
//! is pending is refused; the orchestrator finalizes the old one first, which
//! forfeits its undo window.
//!
//! There is no timer. Deadlines are compared against an injected clock
//! whenever the orchestrator runs ([`crate::api::Library::tick`]).

use crate::model::{Book, Folder};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Default undo window.
pub const DEFAULT_GRACE_MS: u64 = 5000;

/// Independent deletion queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeletionClass {
    Book,
    Folder,
}

impl std::fmt::Display for DeletionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeletionClass::Book => write!(f, "book"),
            DeletionClass::Folder => write!(f, "folder"),
        }
    }
}

/// A deleted book and where it sat: `index` in the in-memory collection,
/// `folder_index` in its folder's displayed order.
#[derive(Debug, Clone, PartialEq)]
pub struct BookSnapshot {
    pub book: Book,
    pub index: usize,
    pub folder_index: usize,
}

/// A folder together with every book it held when deleted. Restored and
/// finalized as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderSnapshot {
    pub folder: Folder,
    pub index: usize,
    pub books: Vec<BookSnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingDeletion<S> {
    pub id: Uuid,
    pub snapshot: S,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase<S> {
    Idle,
    Pending(PendingDeletion<S>),
    /// Side effects of this deletion are running.
    Finalizing(Uuid),
    /// The snapshot of this deletion is being put back.
    Undone(Uuid),
}

#[derive(Debug)]
pub struct GracePeriod<S> {
    window: Duration,
    phase: Phase<S>,
}

impl<S> GracePeriod<S> {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window: Duration::milliseconds(window_ms as i64),
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> &Phase<S> {
        &self.phase
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    pub fn pending(&self) -> Option<&PendingDeletion<S>> {
        match &self.phase {
            Phase::Pending(p) => Some(p),
            _ => None,
        }
    }

    pub fn pending_id(&self) -> Option<Uuid> {
        self.pending().map(|p| p.id)
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.pending().map(|p| p.deadline)
    }

    /// Start a grace window. Only valid from `Idle`; otherwise the snapshot is
    /// handed back untouched.
    pub fn arm(&mut self, id: Uuid, snapshot: S, now: DateTime<Utc>) -> Result<(), S> {
        if !self.is_idle() {
            return Err(snapshot);
        }
        self.phase = Phase::Pending(PendingDeletion {
            id,
            snapshot,
            deadline: now + self.window,
        });
        Ok(())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.pending().is_some_and(|p| now >= p.deadline)
    }

    /// `Pending -> Finalizing`. Returns the deletion whose side effects must run.
    pub fn finalize(&mut self) -> Option<PendingDeletion<S>> {
        self.leave_pending(Phase::Finalizing)
    }

    /// `Pending -> Finalizing` only if the deadline has passed.
    pub fn finalize_expired(&mut self, now: DateTime<Utc>) -> Option<PendingDeletion<S>> {
        if self.is_expired(now) {
            self.finalize()
        } else {
            None
        }
    }

    /// `Pending -> Undone`, only inside the window. A second undo, or one
    /// after the deadline, finds nothing pending and does nothing.
    pub fn undo(&mut self, now: DateTime<Utc>) -> Option<PendingDeletion<S>> {
        if self.pending().is_some_and(|p| now < p.deadline) {
            self.leave_pending(Phase::Undone)
        } else {
            None
        }
    }

    /// `Finalizing | Undone -> Idle`.
    pub fn settle(&mut self) {
        if !matches!(self.phase, Phase::Pending(_)) {
            self.phase = Phase::Idle;
        }
    }

    fn leave_pending(&mut self, next: fn(Uuid) -> Phase<S>) -> Option<PendingDeletion<S>> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Pending(p) => {
                self.phase = next(p.id);
                Some(p)
            }
            other => {
                self.phase = other;
                None
            }
        }
    }
}
