//! In-memory connector and driver used by the unit tests. Fixtures are
//! keyed by the same paths the connector resolves, so the decode side
//! behaves exactly like a file-backed driver: absent path means
//! not-found, a poisoned entry means a format error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{BbsError, Result};
use crate::records::{
    ArticleRecord, BoardRecord, FavoriteEntry, FavoriteRecord, UserArticle, UserRecord,
};
use crate::traits::{Connector, Driver, UserArticleConnector};

#[derive(Debug, Clone)]
pub(crate) struct MemUser {
    pub user_id: String,
    pub password: String,
    pub last_login: DateTime<Utc>,
}

impl UserRecord for MemUser {
    fn user_id(&self) -> &str {
        &self.user_id
    }
    fn hashed_password(&self) -> &str {
        &self.password
    }
    fn verify_password(&self, password: &str) -> Result<()> {
        if password == self.password {
            Ok(())
        } else {
            Err(BbsError::Other(anyhow::anyhow!("password mismatch")))
        }
    }
    fn nickname(&self) -> &str {
        ""
    }
    fn real_name(&self) -> &str {
        ""
    }
    fn num_login_days(&self) -> u32 {
        1
    }
    fn num_posts(&self) -> u32 {
        0
    }
    fn money(&self) -> i32 {
        0
    }
    fn last_login(&self) -> DateTime<Utc> {
        self.last_login
    }
    fn last_host(&self) -> &str {
        "127.0.0.1"
    }
}

pub(crate) fn user(user_id: &str, password: &str) -> MemUser {
    MemUser {
        user_id: user_id.to_string(),
        password: password.to_string(),
        last_login: Utc::now(),
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MemBoard {
    pub board_id: String,
    pub title: String,
    pub is_class: bool,
    pub class_id: Option<String>,
    pub moderators: Vec<String>,
}

impl BoardRecord for MemBoard {
    fn board_id(&self) -> &str {
        &self.board_id
    }
    fn title(&self) -> &str {
        &self.title
    }
    fn is_class(&self) -> bool {
        self.is_class
    }
    fn class_id(&self) -> Option<&str> {
        self.class_id.as_deref()
    }
    fn moderators(&self) -> &[String] {
        &self.moderators
    }
}

pub(crate) fn board(board_id: &str, is_class: bool, class_id: Option<&str>) -> MemBoard {
    MemBoard {
        board_id: board_id.to_string(),
        title: format!("{board_id} board"),
        is_class,
        class_id: class_id.map(str::to_string),
        moderators: Vec::new(),
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MemArticle {
    pub filename: String,
    pub owner: String,
    pub title: String,
    pub modified: DateTime<Utc>,
}

impl ArticleRecord for MemArticle {
    fn filename(&self) -> &str {
        &self.filename
    }
    fn modified(&self) -> DateTime<Utc> {
        self.modified
    }
    fn recommend(&self) -> i32 {
        0
    }
    fn date(&self) -> &str {
        "08/30"
    }
    fn title(&self) -> &str {
        &self.title
    }
    fn money(&self) -> i32 {
        0
    }
    fn owner(&self) -> &str {
        &self.owner
    }
}

pub(crate) fn article(filename: &str, owner: &str, title: &str) -> MemArticle {
    MemArticle {
        filename: filename.to_string(),
        owner: owner.to_string(),
        title: title.to_string(),
        modified: Utc::now(),
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MemFavorite {
    pub title: String,
    pub board_id: String,
}

impl FavoriteRecord for MemFavorite {
    fn title(&self) -> &str {
        &self.title
    }
    fn entry(&self) -> FavoriteEntry<'_> {
        FavoriteEntry::Board {
            board_id: &self.board_id,
        }
    }
}

#[derive(Debug)]
enum Index {
    Articles(Vec<MemArticle>),
    Malformed,
}

/// Fixture-backed connector. Builders consume and return `self` so tests
/// read as one chained expression.
#[derive(Debug)]
pub(crate) struct MemConnector {
    root: PathBuf,
    users: Option<Vec<MemUser>>,
    boards: Option<Vec<MemBoard>>,
    favorites: HashMap<PathBuf, Vec<MemFavorite>>,
    indices: HashMap<PathBuf, Index>,
    bodies: HashMap<PathBuf, Vec<u8>>,
    cached: Mutex<HashMap<PathBuf, Vec<UserArticle>>>,
    user_article_index: bool,
}

impl Default for MemConnector {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/mem"),
            users: None,
            boards: Some(Vec::new()),
            favorites: HashMap::new(),
            indices: HashMap::new(),
            bodies: HashMap::new(),
            cached: Mutex::new(HashMap::new()),
            user_article_index: false,
        }
    }
}

impl MemConnector {
    pub fn with_users(mut self, users: Vec<MemUser>) -> Self {
        self.users = Some(users);
        self
    }

    pub fn with_favorites(mut self, user_id: &str, favorites: Vec<MemFavorite>) -> Self {
        let path = self.root.join("home").join(user_id).join(".fav");
        self.favorites.insert(path, favorites);
        self
    }

    pub fn with_boards(mut self, boards: Vec<MemBoard>) -> Self {
        self.boards = Some(boards);
        self
    }

    pub fn without_board_file(mut self) -> Self {
        self.boards = None;
        self
    }

    pub fn with_articles(mut self, board_id: &str, articles: Vec<MemArticle>) -> Self {
        let path = self.articles_path(board_id);
        self.indices.insert(path, Index::Articles(articles));
        self
    }

    pub fn with_malformed_articles(mut self, board_id: &str) -> Self {
        let path = self.articles_path(board_id);
        self.indices.insert(path, Index::Malformed);
        self
    }

    pub fn with_article_body(mut self, board_id: &str, filename: &str, body: Vec<u8>) -> Self {
        let path = self.root.join("boards").join(board_id).join(filename);
        self.bodies.insert(path, body);
        self
    }

    pub fn with_user_article_index(mut self) -> Self {
        self.user_article_index = true;
        self
    }

    pub fn with_cached_articles(self, user_id: &str, records: Vec<UserArticle>) -> Self {
        let path = self.cached_path(user_id);
        self.cached
            .lock()
            .expect("fixture lock poisoned")
            .insert(path, records);
        self
    }

    fn articles_path(&self, board_id: &str) -> PathBuf {
        self.root.join("boards").join(board_id).join(".DIR")
    }

    fn cached_path(&self, user_id: &str) -> PathBuf {
        self.root
            .join("usr_article")
            .join(format!("{user_id}.idx"))
    }
}

#[async_trait]
impl Connector for MemConnector {
    fn user_records_path(&self) -> Result<PathBuf> {
        Ok(self.root.join(".PASSWDS"))
    }

    async fn read_user_records_file(&self, path: &Path) -> Result<Vec<Box<dyn UserRecord>>> {
        match &self.users {
            Some(users) => Ok(users
                .iter()
                .cloned()
                .map(|u| Box::new(u) as Box<dyn UserRecord>)
                .collect()),
            None => Err(BbsError::NotFound(path.to_path_buf())),
        }
    }

    fn user_favorites_path(&self, user_id: &str) -> Result<PathBuf> {
        Ok(self.root.join("home").join(user_id).join(".fav"))
    }

    async fn read_favorite_records_file(
        &self,
        path: &Path,
    ) -> Result<Vec<Box<dyn FavoriteRecord>>> {
        match self.favorites.get(path) {
            Some(favorites) => Ok(favorites
                .iter()
                .cloned()
                .map(|f| Box::new(f) as Box<dyn FavoriteRecord>)
                .collect()),
            None => Err(BbsError::NotFound(path.to_path_buf())),
        }
    }

    fn board_records_path(&self) -> Result<PathBuf> {
        Ok(self.root.join(".BRD"))
    }

    async fn read_board_records_file(&self, path: &Path) -> Result<Vec<Box<dyn BoardRecord>>> {
        match &self.boards {
            Some(boards) => Ok(boards
                .iter()
                .cloned()
                .map(|b| Box::new(b) as Box<dyn BoardRecord>)
                .collect()),
            None => Err(BbsError::NotFound(path.to_path_buf())),
        }
    }

    fn board_articles_path(&self, board_id: &str) -> Result<PathBuf> {
        Ok(self.articles_path(board_id))
    }

    fn board_treasures_path(&self, board_id: &str, treasure_id: &[String]) -> Result<PathBuf> {
        let mut path = self.root.join("man").join("boards").join(board_id);
        for segment in treasure_id {
            path.push(segment);
        }
        path.push(".DIR");
        Ok(path)
    }

    async fn read_article_records_file(
        &self,
        path: &Path,
    ) -> Result<Vec<Box<dyn ArticleRecord>>> {
        match self.indices.get(path) {
            Some(Index::Articles(articles)) => Ok(articles
                .iter()
                .cloned()
                .map(|a| Box::new(a) as Box<dyn ArticleRecord>)
                .collect()),
            Some(Index::Malformed) => Err(BbsError::format(path, "fixture marked malformed")),
            None => Err(BbsError::NotFound(path.to_path_buf())),
        }
    }

    fn board_article_file_path(&self, board_id: &str, filename: &str) -> Result<PathBuf> {
        Ok(self.root.join("boards").join(board_id).join(filename))
    }

    fn board_treasure_file_path(
        &self,
        board_id: &str,
        treasure_id: &[String],
        filename: &str,
    ) -> Result<PathBuf> {
        let mut path = self.root.join("man").join("boards").join(board_id);
        for segment in treasure_id {
            path.push(segment);
        }
        path.push(filename);
        Ok(path)
    }

    async fn read_article_file(&self, path: &Path) -> Result<Vec<u8>> {
        match self.bodies.get(path) {
            Some(body) => Ok(body.clone()),
            None => Err(BbsError::NotFound(path.to_path_buf())),
        }
    }

    fn user_article_index(&self) -> Option<&dyn UserArticleConnector> {
        if self.user_article_index {
            Some(self as &dyn UserArticleConnector)
        } else {
            None
        }
    }
}

#[async_trait]
impl UserArticleConnector for MemConnector {
    fn user_articles_path(&self, user_id: &str) -> Result<PathBuf> {
        Ok(self.cached_path(user_id))
    }

    async fn read_user_articles_file(&self, path: &Path) -> Result<Vec<UserArticle>> {
        match self.cached.lock().expect("fixture lock poisoned").get(path) {
            Some(records) => Ok(records.clone()),
            None => Err(BbsError::NotFound(path.to_path_buf())),
        }
    }

    async fn write_user_articles_file(&self, path: &Path, records: &[UserArticle]) -> Result<()> {
        self.cached
            .lock()
            .expect("fixture lock poisoned")
            .insert(path.to_path_buf(), records.to_vec());
        Ok(())
    }

    async fn append_user_articles_file(&self, path: &Path, record: &UserArticle) -> Result<()> {
        self.cached
            .lock()
            .expect("fixture lock poisoned")
            .entry(path.to_path_buf())
            .or_default()
            .push(record.clone());
        Ok(())
    }
}

/// Driver wrapper handing out the same connector on every open. The
/// sentinel data source `"fail"` simulates a backend that rejects its
/// configuration.
pub(crate) struct MemDriver {
    connector: Arc<MemConnector>,
}

impl MemDriver {
    pub fn new(connector: MemConnector) -> Self {
        Self {
            connector: Arc::new(connector),
        }
    }
}

#[async_trait]
impl Driver for MemDriver {
    async fn open(&self, data_source_name: &str) -> Result<Arc<dyn Connector>> {
        if data_source_name == "fail" {
            return Err(BbsError::Other(anyhow::anyhow!(
                "mem driver rejects data source `{data_source_name}`"
            )));
        }
        Ok(Arc::clone(&self.connector) as Arc<dyn Connector>)
    }
}
