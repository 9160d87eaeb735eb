//! # bbs-core
//!
//! A uniform data-access layer over the on-disk records of a BBS: user
//! accounts, boards and board classes, per-board article indices and
//! article bodies, per-user favorites, and per-user post history.
//!
//! Different BBS server lineages store these records in mutually
//! incompatible binary layouts. A backend-specific driver translates one
//! such layout into the record contracts in [`records`]; callers go
//! through the [`Bbs`] facade, which is bound to one opened driver
//! connector and adds per-category error policy on top of it.
//!
//! Drivers are registered process-wide under a name and selected at
//! [`open`] time:
//!
//! ```ignore
//! bbs_core::register("flatfile", Arc::new(FlatFileDriver));
//! let bbs = bbs_core::open("flatfile", "/home/bbs").await?;
//! let boards = bbs.read_board_records().await?;
//! ```

pub mod db;
pub mod error;
pub mod records;
pub mod registry;
pub mod traits;

mod aggregate;

#[cfg(test)]
pub(crate) mod testutil;

// Re-exporting for easier access in other crates
pub use db::Bbs;
pub use error::{BbsError, Result};
pub use records::*;
pub use registry::{open, register};
pub use traits::*;
