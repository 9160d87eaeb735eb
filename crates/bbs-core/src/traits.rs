//! # Driver contracts (Ports)
//!
//! A backend plugs in by implementing [`Driver`] and [`Connector`], and
//! may opt into the extra capabilities [`WriteBoardConnector`] and
//! [`UserArticleConnector`]. The facade probes the capability set once at
//! open time and caches it; a connector's capabilities are fixed for its
//! lifetime.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::records::{ArticleRecord, BoardRecord, FavoriteRecord, UserArticle, UserRecord};

/// A registered backend. `open` binds the driver to one data source and
/// yields a fresh connector; the data-source string is opaque to the core
/// (typically a root installation path plus backend parameters).
#[async_trait]
pub trait Driver: Send + Sync {
    async fn open(&self, data_source_name: &str) -> Result<Arc<dyn Connector>>;
}

/// The mandatory capability of every driver: resolve storage paths for
/// each record category and decode the bytes found there.
///
/// Path resolution must be pure and side-effect-free. Decode operations
/// must fail with [`BbsError::NotFound`](crate::BbsError::NotFound) when
/// the path does not exist and with
/// [`BbsError::Format`](crate::BbsError::Format) when the byte layout is
/// malformed — the facade's error policy depends on the distinction.
#[async_trait]
pub trait Connector: fmt::Debug + Send + Sync {
    /// Path of the user records file, e.g. `BBSHOME/.PASSWDS`.
    fn user_records_path(&self) -> Result<PathBuf>;

    async fn read_user_records_file(&self, path: &Path) -> Result<Vec<Box<dyn UserRecord>>>;

    /// Path of one user's favorites file, e.g.
    /// `BBSHOME/home/{u}/{user_id}/.fav`.
    fn user_favorites_path(&self, user_id: &str) -> Result<PathBuf>;

    async fn read_favorite_records_file(
        &self,
        path: &Path,
    ) -> Result<Vec<Box<dyn FavoriteRecord>>>;

    /// Path of the board headers file, e.g. `BBSHOME/.BRD`.
    fn board_records_path(&self) -> Result<PathBuf>;

    async fn read_board_records_file(&self, path: &Path) -> Result<Vec<Box<dyn BoardRecord>>>;

    /// Path of one board's article index, e.g.
    /// `BBSHOME/boards/{b}/{board_id}/.DIR`.
    fn board_articles_path(&self, board_id: &str) -> Result<PathBuf>;

    /// Path of a treasure (archive folder) index under a board; the
    /// treasure id is an ordered chain of folder identifiers, e.g.
    /// `BBSHOME/man/boards/{b}/{board_id}/{t...}/.DIR`.
    fn board_treasures_path(&self, board_id: &str, treasure_id: &[String]) -> Result<PathBuf>;

    /// Decodes an article index. Shared by board and treasure indices.
    async fn read_article_records_file(&self, path: &Path)
        -> Result<Vec<Box<dyn ArticleRecord>>>;

    /// Path of one article's raw content under a board.
    fn board_article_file_path(&self, board_id: &str, filename: &str) -> Result<PathBuf>;

    /// Path of one article's raw content under a treasure folder.
    fn board_treasure_file_path(
        &self,
        board_id: &str,
        treasure_id: &[String],
        filename: &str,
    ) -> Result<PathBuf>;

    /// Raw read of article content, plain or treasure-archived.
    async fn read_article_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// Board-mutation capability, if this backend supports it.
    fn write_board(&self) -> Option<&dyn WriteBoardConnector> {
        None
    }

    /// Cached user-article-index capability, if this backend supports it.
    fn user_article_index(&self) -> Option<&dyn UserArticleConnector> {
        None
    }
}

/// Optional capability: modifying a board records file.
#[async_trait]
pub trait WriteBoardConnector: Send + Sync {
    /// Builds a driver-native board record from a loosely-typed field
    /// mapping.
    fn new_board_record(&self, fields: &Map<String, Value>) -> Result<Box<dyn BoardRecord>>;

    /// Appends one record to a board records file.
    async fn append_board_record(&self, path: &Path, record: &dyn BoardRecord) -> Result<()>;

    /// Replaces the record at the zero-based `index`.
    async fn update_board_record(
        &self,
        path: &Path,
        index: usize,
        record: &dyn BoardRecord,
    ) -> Result<()>;

    /// Reads the record at the zero-based `index`.
    async fn read_board_record(&self, path: &Path, index: usize) -> Result<Box<dyn BoardRecord>>;

    /// Removes the record at the zero-based `index`.
    async fn remove_board_record(&self, path: &Path, index: usize) -> Result<()>;
}

/// Optional capability: a precomputed per-user article index. Backends
/// without it have no fast path for post history; the facade falls back
/// to scanning every board.
#[async_trait]
pub trait UserArticleConnector: Send + Sync {
    /// Path of one user's cached article index.
    fn user_articles_path(&self, user_id: &str) -> Result<PathBuf>;

    async fn read_user_articles_file(&self, path: &Path) -> Result<Vec<UserArticle>>;

    /// Replaces the cached index wholesale.
    async fn write_user_articles_file(&self, path: &Path, records: &[UserArticle]) -> Result<()>;

    async fn append_user_articles_file(&self, path: &Path, record: &UserArticle) -> Result<()>;
}

/// The optional capabilities a driver may implement beyond [`Connector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    WriteBoard,
    UserArticleIndex,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::WriteBoard => f.write_str("board mutation (WriteBoard)"),
            Capability::UserArticleIndex => {
                f.write_str("cached user article index (UserArticleIndex)")
            }
        }
    }
}

/// The capability set of one opened connector, probed once at open time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    write_board: bool,
    user_article_index: bool,
}

impl CapabilitySet {
    pub(crate) fn probe(connector: &dyn Connector) -> Self {
        Self {
            write_board: connector.write_board().is_some(),
            user_article_index: connector.user_article_index().is_some(),
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::WriteBoard => self.write_board,
            Capability::UserArticleIndex => self.user_article_index,
        }
    }
}
