//! # bbs-driver-flatfile
//!
//! Reference driver for bbs-core over a plain-directory JSON layout. It
//! decodes no legacy binary format; instead it defines its own trivial
//! on-disk shape while keeping the path conventions legacy installations
//! use (`.PASSWDS`, `.BRD`, `home/{u}/{user}/.fav`,
//! `boards/{b}/{board}/.DIR`, `man/boards/...` for treasures), where
//! `{u}`/`{b}` is the first character of the id, lowercased.
//!
//! The driver opts into both optional capabilities: board mutation and
//! the cached per-user article index (`usr_article/{u}/{user}.idx`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bbs_core::{
    ArticleRecord, BbsError, BoardRecord, Connector, Driver, FavoriteRecord, Result, UserArticle,
    UserArticleConnector, UserRecord, WriteBoardConnector,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::fs;
use tracing::debug;

mod records;

pub use records::{hash_password, FlatArticle, FlatBoard, FlatFavorite, FlatUser};

/// Name this driver registers under.
pub const DRIVER_NAME: &str = "flatfile";

/// Registers the flatfile driver in the process-wide registry.
pub fn register() {
    bbs_core::register(DRIVER_NAME, Arc::new(FlatFileDriver));
}

/// Driver entry point. The data-source string is the root directory of
/// the installation.
pub struct FlatFileDriver;

#[async_trait]
impl Driver for FlatFileDriver {
    async fn open(&self, data_source_name: &str) -> Result<Arc<dyn Connector>> {
        let root = PathBuf::from(data_source_name);
        let meta = fs::metadata(&root)
            .await
            .map_err(|err| BbsError::from_io(&root, err))?;
        if !meta.is_dir() {
            return Err(BbsError::Other(anyhow::anyhow!(
                "data source `{}` is not a directory",
                root.display()
            )));
        }
        debug!(root = %root.display(), "flatfile driver opened");
        Ok(Arc::new(FlatFileConnector { root }))
    }
}

#[derive(Debug)]
pub struct FlatFileConnector {
    root: PathBuf,
}

/// First character of an id, lowercased; the sharding directory legacy
/// layouts use under `home/` and `boards/`.
fn shard(id: &str) -> Result<String> {
    let first = id
        .chars()
        .next()
        .ok_or_else(|| BbsError::Other(anyhow::anyhow!("empty record id")))?;
    Ok(first.to_lowercase().to_string())
}

/// Rejects id segments that would escape the layout root.
fn check_segment(segment: &str) -> Result<()> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('/')
        || segment.contains('\\')
    {
        return Err(BbsError::Other(anyhow::anyhow!(
            "invalid path segment `{segment}`"
        )));
    }
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)
        .await
        .map_err(|err| BbsError::from_io(path, err))?;
    serde_json::from_slice(&bytes).map_err(|err| BbsError::format(path, err.to_string()))
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|err| BbsError::from_io(parent, err))?;
    }
    let bytes =
        serde_json::to_vec_pretty(value).map_err(|err| BbsError::Other(err.into()))?;
    fs::write(path, bytes)
        .await
        .map_err(|err| BbsError::from_io(path, err))
}

impl FlatFileConnector {
    fn board_dir(&self, board_id: &str) -> Result<PathBuf> {
        check_segment(board_id)?;
        Ok(self
            .root
            .join("boards")
            .join(shard(board_id)?)
            .join(board_id))
    }

    fn treasure_dir(&self, board_id: &str, treasure_id: &[String]) -> Result<PathBuf> {
        check_segment(board_id)?;
        let mut dir = self
            .root
            .join("man")
            .join("boards")
            .join(shard(board_id)?)
            .join(board_id);
        for segment in treasure_id {
            check_segment(segment)?;
            dir.push(segment);
        }
        Ok(dir)
    }

    async fn read_board_slots(&self, path: &Path) -> Result<Vec<FlatBoard>> {
        read_json(path).await
    }

    async fn board_slot_mut<F>(&self, path: &Path, index: usize, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<FlatBoard>) -> Result<()>,
    {
        let mut slots = self.read_board_slots(path).await?;
        if index >= slots.len() {
            return Err(BbsError::Other(anyhow::anyhow!(
                "board record index {index} out of range ({} records)",
                slots.len()
            )));
        }
        apply(&mut slots)?;
        write_json(path, &slots).await
    }
}

#[async_trait]
impl Connector for FlatFileConnector {
    fn user_records_path(&self) -> Result<PathBuf> {
        Ok(self.root.join(".PASSWDS"))
    }

    async fn read_user_records_file(&self, path: &Path) -> Result<Vec<Box<dyn UserRecord>>> {
        let users: Vec<FlatUser> = read_json(path).await?;
        Ok(users
            .into_iter()
            .map(|u| Box::new(u) as Box<dyn UserRecord>)
            .collect())
    }

    fn user_favorites_path(&self, user_id: &str) -> Result<PathBuf> {
        check_segment(user_id)?;
        Ok(self
            .root
            .join("home")
            .join(shard(user_id)?)
            .join(user_id)
            .join(".fav"))
    }

    async fn read_favorite_records_file(
        &self,
        path: &Path,
    ) -> Result<Vec<Box<dyn FavoriteRecord>>> {
        let favorites: Vec<FlatFavorite> = read_json(path).await?;
        Ok(favorites
            .into_iter()
            .map(|f| Box::new(f) as Box<dyn FavoriteRecord>)
            .collect())
    }

    fn board_records_path(&self) -> Result<PathBuf> {
        Ok(self.root.join(".BRD"))
    }

    async fn read_board_records_file(&self, path: &Path) -> Result<Vec<Box<dyn BoardRecord>>> {
        let boards = self.read_board_slots(path).await?;
        Ok(boards
            .into_iter()
            .map(|b| Box::new(b) as Box<dyn BoardRecord>)
            .collect())
    }

    fn board_articles_path(&self, board_id: &str) -> Result<PathBuf> {
        Ok(self.board_dir(board_id)?.join(".DIR"))
    }

    fn board_treasures_path(&self, board_id: &str, treasure_id: &[String]) -> Result<PathBuf> {
        Ok(self.treasure_dir(board_id, treasure_id)?.join(".DIR"))
    }

    async fn read_article_records_file(
        &self,
        path: &Path,
    ) -> Result<Vec<Box<dyn ArticleRecord>>> {
        let articles: Vec<FlatArticle> = read_json(path).await?;
        Ok(articles
            .into_iter()
            .map(|a| Box::new(a) as Box<dyn ArticleRecord>)
            .collect())
    }

    fn board_article_file_path(&self, board_id: &str, filename: &str) -> Result<PathBuf> {
        check_segment(filename)?;
        Ok(self.board_dir(board_id)?.join(filename))
    }

    fn board_treasure_file_path(
        &self,
        board_id: &str,
        treasure_id: &[String],
        filename: &str,
    ) -> Result<PathBuf> {
        check_segment(filename)?;
        Ok(self.treasure_dir(board_id, treasure_id)?.join(filename))
    }

    async fn read_article_file(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path)
            .await
            .map_err(|err| BbsError::from_io(path, err))
    }

    fn write_board(&self) -> Option<&dyn WriteBoardConnector> {
        Some(self as &dyn WriteBoardConnector)
    }

    fn user_article_index(&self) -> Option<&dyn UserArticleConnector> {
        Some(self as &dyn UserArticleConnector)
    }
}

#[async_trait]
impl WriteBoardConnector for FlatFileConnector {
    fn new_board_record(&self, fields: &Map<String, Value>) -> Result<Box<dyn BoardRecord>> {
        let board: FlatBoard = serde_json::from_value(Value::Object(fields.clone()))
            .map_err(|err| BbsError::Other(anyhow::anyhow!("invalid board fields: {err}")))?;
        check_segment(&board.board_id)?;
        Ok(Box::new(board))
    }

    async fn append_board_record(&self, path: &Path, record: &dyn BoardRecord) -> Result<()> {
        let mut slots = match self.read_board_slots(path).await {
            Ok(slots) => slots,
            Err(err) if err.is_not_found() => Vec::new(),
            Err(err) => return Err(err),
        };
        slots.push(FlatBoard::from_record(record));
        write_json(path, &slots).await
    }

    async fn update_board_record(
        &self,
        path: &Path,
        index: usize,
        record: &dyn BoardRecord,
    ) -> Result<()> {
        self.board_slot_mut(path, index, |slots| {
            slots[index] = FlatBoard::from_record(record);
            Ok(())
        })
        .await
    }

    async fn read_board_record(&self, path: &Path, index: usize) -> Result<Box<dyn BoardRecord>> {
        let slots = self.read_board_slots(path).await?;
        let slot = slots.into_iter().nth(index).ok_or_else(|| {
            BbsError::Other(anyhow::anyhow!("board record index {index} out of range"))
        })?;
        Ok(Box::new(slot))
    }

    async fn remove_board_record(&self, path: &Path, index: usize) -> Result<()> {
        self.board_slot_mut(path, index, |slots| {
            slots.remove(index);
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl UserArticleConnector for FlatFileConnector {
    fn user_articles_path(&self, user_id: &str) -> Result<PathBuf> {
        check_segment(user_id)?;
        Ok(self
            .root
            .join("usr_article")
            .join(shard(user_id)?)
            .join(format!("{user_id}.idx")))
    }

    async fn read_user_articles_file(&self, path: &Path) -> Result<Vec<UserArticle>> {
        read_json(path).await
    }

    async fn write_user_articles_file(&self, path: &Path, records: &[UserArticle]) -> Result<()> {
        write_json(path, &records).await
    }

    async fn append_user_articles_file(&self, path: &Path, record: &UserArticle) -> Result<()> {
        let mut records = match self.read_user_articles_file(path).await {
            Ok(records) => records,
            Err(err) if err.is_not_found() => Vec::new(),
            Err(err) => return Err(err),
        };
        records.push(record.clone());
        write_json(path, &records).await
    }
}
