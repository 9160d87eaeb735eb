//! # Access facade
//!
//! [`Bbs`] is the single entry point bound to one opened connector. Every
//! public operation is a resolve-path / decode pair plus category-specific
//! error policy:
//!
//! - user records, favorites, board records: all errors propagate, tagged
//!   with the operation name;
//! - board and treasure article indices: a not-found decode is an empty
//!   index (an unposted board has no index file), everything else
//!   propagates;
//! - raw article content: propagates — callers are expected to have
//!   validated the article against the index first;
//! - mutations: gated on the probed capability set, with the
//!   update/read/remove-by-index trio intentionally stubbed.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::aggregate;
use crate::error::{BbsError, Result};
use crate::records::{ArticleRecord, BoardRecord, FavoriteRecord, UserArticle, UserRecord};
use crate::traits::{
    Capability, CapabilitySet, Connector, UserArticleConnector, WriteBoardConnector,
};

/// The whole BBS filesystem as seen through one driver: where records
/// live and how their bytes decode. Holds the opened connector and the
/// capability set probed from it at open time.
#[derive(Debug)]
pub struct Bbs {
    connector: Arc<dyn Connector>,
    capabilities: CapabilitySet,
}

impl Bbs {
    pub(crate) fn bind(connector: Arc<dyn Connector>) -> Self {
        let capabilities = CapabilitySet::probe(connector.as_ref());
        Self {
            connector,
            capabilities,
        }
    }

    /// The optional capabilities of the bound driver.
    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    pub(crate) fn connector(&self) -> &dyn Connector {
        self.connector.as_ref()
    }

    pub(crate) fn connector_arc(&self) -> Arc<dyn Connector> {
        Arc::clone(&self.connector)
    }

    /// Reads all user records.
    pub async fn read_user_records(&self) -> Result<Vec<Box<dyn UserRecord>>> {
        const OP: &str = "read_user_records";
        let path = self.connector.user_records_path().map_err(|e| fail(OP, e))?;
        debug!(op = OP, path = %path.display());
        self.connector
            .read_user_records_file(&path)
            .await
            .map_err(|e| fail(OP, e))
    }

    /// Reads one user's favorites tree.
    pub async fn read_user_favorites(&self, user_id: &str) -> Result<Vec<Box<dyn FavoriteRecord>>> {
        const OP: &str = "read_user_favorites";
        let path = self
            .connector
            .user_favorites_path(user_id)
            .map_err(|e| fail(OP, e))?;
        debug!(op = OP, user_id, path = %path.display());
        self.connector
            .read_favorite_records_file(&path)
            .await
            .map_err(|e| fail(OP, e))
    }

    /// Reads all board and class records.
    pub async fn read_board_records(&self) -> Result<Vec<Box<dyn BoardRecord>>> {
        const OP: &str = "read_board_records";
        let path = self
            .connector
            .board_records_path()
            .map_err(|e| fail(OP, e))?;
        debug!(op = OP, path = %path.display());
        self.connector
            .read_board_records_file(&path)
            .await
            .map_err(|e| fail(OP, e))
    }

    /// Reads one board's article index. A board with no index file yet
    /// yields an empty list, not an error.
    pub async fn read_board_articles(&self, board_id: &str) -> Result<Vec<Box<dyn ArticleRecord>>> {
        const OP: &str = "read_board_articles";
        let path = self
            .connector
            .board_articles_path(board_id)
            .map_err(|e| fail(OP, e))?;
        debug!(op = OP, board_id, path = %path.display());
        read_index_tolerant(self.connector.as_ref(), &path)
            .await
            .map_err(|e| fail(OP, e))
    }

    /// Reads a treasure folder's article index. Same missing-file
    /// tolerance as [`Bbs::read_board_articles`].
    pub async fn read_board_treasures(
        &self,
        board_id: &str,
        treasure_id: &[String],
    ) -> Result<Vec<Box<dyn ArticleRecord>>> {
        const OP: &str = "read_board_treasures";
        let path = self
            .connector
            .board_treasures_path(board_id, treasure_id)
            .map_err(|e| fail(OP, e))?;
        debug!(op = OP, board_id, path = %path.display());
        read_index_tolerant(self.connector.as_ref(), &path)
            .await
            .map_err(|e| fail(OP, e))
    }

    /// Reads one article's raw content.
    pub async fn read_board_article_file(&self, board_id: &str, filename: &str) -> Result<Vec<u8>> {
        const OP: &str = "read_board_article_file";
        let path = self
            .connector
            .board_article_file_path(board_id, filename)
            .map_err(|e| fail(OP, e))?;
        debug!(op = OP, board_id, filename, path = %path.display());
        self.connector
            .read_article_file(&path)
            .await
            .map_err(|e| fail(OP, e))
    }

    /// Reads one treasure-archived article's raw content.
    pub async fn read_board_treasure_file(
        &self,
        board_id: &str,
        treasure_id: &[String],
        filename: &str,
    ) -> Result<Vec<u8>> {
        const OP: &str = "read_board_treasure_file";
        let path = self
            .connector
            .board_treasure_file_path(board_id, treasure_id, filename)
            .map_err(|e| fail(OP, e))?;
        debug!(op = OP, board_id, filename, path = %path.display());
        self.connector
            .read_article_file(&path)
            .await
            .map_err(|e| fail(OP, e))
    }

    /// Builds a driver-native board record from a loosely-typed field
    /// mapping. Requires the WriteBoard capability.
    pub fn new_board_record(&self, fields: &Map<String, Value>) -> Result<Box<dyn BoardRecord>> {
        const OP: &str = "new_board_record";
        let writer = self.write_board().map_err(|e| fail(OP, e))?;
        writer.new_board_record(fields).map_err(|e| fail(OP, e))
    }

    /// Appends a board record to the board records file. Requires the
    /// WriteBoard capability.
    pub async fn add_board_record(&self, record: &dyn BoardRecord) -> Result<()> {
        const OP: &str = "add_board_record";
        let writer = self.write_board().map_err(|e| fail(OP, e))?;
        let path = self
            .connector
            .board_records_path()
            .map_err(|e| fail(OP, e))?;
        debug!(op = OP, board_id = record.board_id(), path = %path.display());
        writer
            .append_board_record(&path, record)
            .await
            .map_err(|e| fail(OP, e))
    }

    /// Not implemented in the baseline facade; a deliberate, documented
    /// gap in the contract rather than an oversight.
    pub async fn update_board_record(
        &self,
        _index: usize,
        _record: &dyn BoardRecord,
    ) -> Result<()> {
        Err(BbsError::NotImplemented("update_board_record"))
    }

    /// Not implemented in the baseline facade.
    pub async fn read_board_record(&self, _index: usize) -> Result<Box<dyn BoardRecord>> {
        Err(BbsError::NotImplemented("read_board_record"))
    }

    /// Not implemented in the baseline facade.
    pub async fn remove_board_record(&self, _index: usize) -> Result<()> {
        Err(BbsError::NotImplemented("remove_board_record"))
    }

    /// Replaces one user's cached article index. Requires the
    /// UserArticleIndex capability.
    pub async fn write_user_articles(&self, user_id: &str, records: &[UserArticle]) -> Result<()> {
        const OP: &str = "write_user_articles";
        let index = self.user_article_index().map_err(|e| fail(OP, e))?;
        let path = index.user_articles_path(user_id).map_err(|e| fail(OP, e))?;
        debug!(op = OP, user_id, path = %path.display());
        index
            .write_user_articles_file(&path, records)
            .await
            .map_err(|e| fail(OP, e))
    }

    /// Appends one record to a user's cached article index. Requires the
    /// UserArticleIndex capability.
    pub async fn append_user_article(&self, user_id: &str, record: &UserArticle) -> Result<()> {
        const OP: &str = "append_user_article";
        let index = self.user_article_index().map_err(|e| fail(OP, e))?;
        let path = index.user_articles_path(user_id).map_err(|e| fail(OP, e))?;
        debug!(op = OP, user_id, path = %path.display());
        index
            .append_user_articles_file(&path, record)
            .await
            .map_err(|e| fail(OP, e))
    }

    /// Everything `user_id` has posted, across the whole board set.
    ///
    /// Served from the driver's cached index when present and non-empty;
    /// otherwise reconstructed by scanning every board's article index.
    /// See [`crate::aggregate`].
    pub async fn user_articles(&self, user_id: &str) -> Result<Vec<UserArticle>> {
        aggregate::user_articles(self, user_id).await
    }

    fn write_board(&self) -> Result<&dyn WriteBoardConnector> {
        self.connector
            .write_board()
            .ok_or(BbsError::CapabilityMissing(Capability::WriteBoard))
    }

    fn user_article_index(&self) -> Result<&dyn UserArticleConnector> {
        self.connector
            .user_article_index()
            .ok_or(BbsError::CapabilityMissing(Capability::UserArticleIndex))
    }
}

/// Article-index read with the missing-file tolerance applied. Shared by
/// the facade and the aggregation scan so the policy lives in one place.
pub(crate) async fn read_index_tolerant(
    connector: &dyn Connector,
    path: &std::path::Path,
) -> Result<Vec<Box<dyn ArticleRecord>>> {
    match connector.read_article_records_file(path).await {
        Ok(records) => Ok(records),
        Err(err) if err.is_not_found() => Ok(Vec::new()),
        Err(err) => Err(err),
    }
}

fn fail(op: &'static str, err: BbsError) -> BbsError {
    warn!(op, error = %err, "bbs operation failed");
    err.op(op)
}
