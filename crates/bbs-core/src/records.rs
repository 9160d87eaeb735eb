//! # Record contracts
//!
//! Read-only accessor contracts for the entities a BBS stores on disk.
//! Drivers decode their backend's binary layouts into these; the facade
//! and its callers never see raw bytes except for article bodies.
//!
//! Decoded records are immutable value snapshots. Board "updates" replace
//! a slot in the backing file, they never mutate a live record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One BBS account, the `userec` of most legacy systems.
pub trait UserRecord: fmt::Debug + Send + Sync {
    fn user_id(&self) -> &str;

    /// The stored password hash. Exposed for diagnostics only; use
    /// [`UserRecord::verify_password`] to check a candidate password.
    fn hashed_password(&self) -> &str;

    /// Checks a candidate password against the stored hash. `Ok(())` on a
    /// match, an error otherwise.
    fn verify_password(&self, password: &str) -> Result<()>;

    /// Display nickname, empty if the backend has no such field.
    fn nickname(&self) -> &str;

    /// Real name, empty if the backend has no such field.
    fn real_name(&self) -> &str;

    /// Days this account has logged in since creation.
    fn num_login_days(&self) -> u32;

    fn num_posts(&self) -> u32;

    fn money(&self) -> i32;

    fn last_login(&self) -> DateTime<Utc>;

    /// Host of the last login. Usually an IPv4 address, but may be a
    /// domain name or IPv6 address.
    fn last_host(&self) -> &str;

    /// Bad-post count. `None` when the backend does not track it.
    fn num_bad_posts(&self) -> Option<u32> {
        None
    }

    /// Country of the last login IP. `None` when the backend does not
    /// track it.
    fn last_login_country(&self) -> Option<String> {
        None
    }

    /// Mailbox description. `None` when the backend does not track it.
    fn mailbox_description(&self) -> Option<String> {
        None
    }
}

/// One entry in a user's favorites list.
pub trait FavoriteRecord: fmt::Debug + Send + Sync {
    /// Display title. Empty for separator lines.
    fn title(&self) -> &str;

    fn entry(&self) -> FavoriteEntry<'_>;
}

/// The payload of a favorite entry. Only folders nest; child order is
/// insertion order and must be preserved.
pub enum FavoriteEntry<'a> {
    /// Reference to a board by id.
    Board { board_id: &'a str },
    /// A named folder of further favorite entries.
    Folder { records: Vec<&'a dyn FavoriteRecord> },
    /// A visual separator line.
    Line,
}

/// One board or board class. Boards and classes share a single namespace
/// and a single records file; `class_id` is a weak reference into it,
/// forming a forest (classes carry no parent id themselves).
pub trait BoardRecord: fmt::Debug + Send + Sync {
    fn board_id(&self) -> &str;

    fn title(&self) -> &str;

    fn is_class(&self) -> bool;

    /// Id of the class this board belongs to, `None` at top level.
    fn class_id(&self) -> Option<&str>;

    /// Moderator user ids, the `BM` field of legacy layouts.
    fn moderators(&self) -> &[String];
}

/// One entry in a board's article index. The filename is the join key to
/// the article's raw content, resolved separately per board/treasure path.
pub trait ArticleRecord: fmt::Debug + Send + Sync {
    fn filename(&self) -> &str;

    fn modified(&self) -> DateTime<Utc>;

    fn recommend(&self) -> i32;

    /// The human-readable date column of the index, backend-formatted.
    fn date(&self) -> &str;

    fn title(&self) -> &str;

    fn money(&self) -> i32;

    fn owner(&self) -> &str;
}

/// One denormalized "this user posted this article" fact.
///
/// Produced either from a driver's cached index or synthesized by the
/// fallback board scan; the two sources are interchangeable to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserArticle {
    pub board_id: String,
    pub title: String,
    pub owner: String,
    pub filename: String,
}

// Identity for dedup purposes is (board, filename); title and owner are
// denormalized copies.
impl PartialEq for UserArticle {
    fn eq(&self, other: &Self) -> bool {
        self.board_id == other.board_id && self.filename == other.filename
    }
}

impl Eq for UserArticle {}

impl std::hash::Hash for UserArticle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.board_id.hash(state);
        self.filename.hash(state);
    }
}
