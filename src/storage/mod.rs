//! Storage is organized through [session::StorageSession].
//! The basic idea is:
//!  - One SQLite connection per process, owned by the session.
//!  - One table per [entities::TrackerKind], keyed by calendar date.
//!  - A single generic [entry_store::EntryStore] does every read and write, with
//!    [typed::TypedStore] layered on top for callers that know their tracker statically.

pub mod entities;
pub mod entry_store;
pub mod session;
pub mod typed;
