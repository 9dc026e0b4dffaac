//! Database access for fip-context
//!
//! Pool setup and schema live in `fip_common::db`; this module holds the
//! queries the service runs.

pub mod songs;

pub use songs::{SongStore, SqliteSongStore, StoredSong};
