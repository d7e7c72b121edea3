//! # Readshelf Architecture
//!
//! Readshelf is a **UI-agnostic personal PDF library**. Books live in folders,
//! folders optionally live in categories, and everything can be reordered by
//! drag-and-drop, renamed, and deleted with a short undo window. The CLI in
//! this crate is one client of the library, not the other way round.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, prints messages and listings           │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands                                │
//! │  - Runs grace-period expiry before every mutation           │
//! │  - Resolves names and id prefixes to UUIDs                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Mutation orchestration: create, update, move, delete     │
//! │  - Decides which failures become user notifications         │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                         │
//!                    ▼                         ▼
//! ┌───────────────────────────────┐ ┌───────────────────────────┐
//! │  Ordering (ordering.rs)       │ │  Storage Layer (store/)   │
//! │  Layout overlay (layout.rs)   │ │  LibraryStore trait       │
//! │  Grace periods (undo.rs)      │ │  local / cloud / memory   │
//! └───────────────────────────────┘ └───────────────────────────┘
//! ```
//!
//! ## Two Sources of Ordering
//!
//! In cloud mode folders carry real `position` and `category_id` columns. In
//! local mode there is no schema to own them. The layout overlay
//! ([`layout::FolderLayout`]) is the client-side answer for both: it always
//! wins when it has an entry, backend fields are the fallback, and in cloud
//! mode every overlay change is mirrored to the columns.
//!
//! ## Time
//!
//! Nothing in the library sleeps or spawns. Deletion deadlines are compared
//! against a [`clock::Clock`] whenever the API is called, and
//! [`api::Library::flush`] finalizes whatever is still pending at shutdown.
//!
//! ## Testing Strategy
//!
//! 1. **Ordering** (`ordering.rs`): pure functions, tested directly, plus a
//!    model-based test in `tests/` that replays random moves.
//! 2. **Commands** (`commands/*.rs`): the bulk of the tests, on
//!    `InMemoryStore` + `MemBackend` + `ManualClock`.
//! 3. **Storage** (`store/*.rs`): each backend against the shared trait.
//! 4. **CLI**: end-to-end through the binary with `assert_cmd`.
//!
//! ## Module Overview
//!
//! - [`api`]: The facade, entry point for all operations
//! - [`commands`]: Mutation orchestration
//! - [`ordering`]: Read order and move computation
//! - [`layout`]: The ordering overlay and its persistence
//! - [`undo`]: Grace-period state machine
//! - [`store`]: Persistence adapters
//! - [`model`]: Books, folders, categories and patches
//! - [`upload`]: File acceptance and default titles
//! - [`clock`]: Time source
//! - [`config`]: Layered configuration
//! - [`error`]: Error types

pub mod api;
pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod layout;
pub mod model;
pub mod ordering;
pub mod store;
pub mod undo;
pub mod upload;
