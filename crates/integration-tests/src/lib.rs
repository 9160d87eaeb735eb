//! Shared harness for the end-to-end tests: a fixture builder that lays
//! out a flatfile installation inside a temp directory, plus a
//! capability-stripped wrapper driver for exercising graceful
//! degradation on backends without the optional contracts.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use async_trait::async_trait;
use bbs_core::{
    ArticleRecord, BoardRecord, Connector, Driver, FavoriteRecord, Result, UserArticle,
    UserRecord,
};
use bbs_driver_flatfile::{FlatArticle, FlatBoard, FlatFavorite, FlatFileDriver, FlatUser};
use chrono::Utc;
use tempfile::TempDir;

/// Name the capability-stripped wrapper registers under.
pub const READ_ONLY_DRIVER_NAME: &str = "flatfile-readonly";

static REGISTER: Once = Once::new();

/// Registers the flatfile driver and the read-only wrapper exactly once
/// per test process.
pub fn register_drivers() {
    REGISTER.call_once(|| {
        bbs_driver_flatfile::register();
        bbs_core::register(READ_ONLY_DRIVER_NAME, Arc::new(ReadOnlyDriver));
    });
}

/// Installs a fmt subscriber when RUST_LOG is set; handy when a test
/// fails and the facade's debug traces are wanted.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn shard(id: &str) -> String {
    id.chars()
        .next()
        .expect("fixture ids are non-empty")
        .to_lowercase()
        .to_string()
}

/// A flatfile installation root under a temp directory.
pub struct Fixture {
    root: TempDir,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("create fixture root"),
        }
    }

    /// The data-source string to open this fixture with.
    pub fn dsn(&self) -> String {
        self.root.path().display().to_string()
    }

    fn write_json<T: serde::Serialize>(&self, rel: impl AsRef<Path>, value: &T) {
        let path = self.root.path().join(rel.as_ref());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture dirs");
        }
        std::fs::write(&path, serde_json::to_vec_pretty(value).expect("serialize fixture"))
            .expect("write fixture file");
    }

    pub fn write_raw(&self, rel: impl AsRef<Path>, bytes: &[u8]) {
        let path = self.root.path().join(rel.as_ref());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture dirs");
        }
        std::fs::write(&path, bytes).expect("write fixture file");
    }

    pub fn write_users(&self, users: &[FlatUser]) {
        self.write_json(".PASSWDS", &users);
    }

    pub fn write_boards(&self, boards: &[FlatBoard]) {
        self.write_json(".BRD", &boards);
    }

    pub fn write_articles(&self, board_id: &str, articles: &[FlatArticle]) {
        self.write_json(
            PathBuf::from("boards").join(shard(board_id)).join(board_id).join(".DIR"),
            &articles,
        );
    }

    pub fn write_article_body(&self, board_id: &str, filename: &str, body: &[u8]) {
        self.write_raw(
            PathBuf::from("boards").join(shard(board_id)).join(board_id).join(filename),
            body,
        );
    }

    pub fn write_treasures(&self, board_id: &str, treasure_id: &[&str], articles: &[FlatArticle]) {
        let mut rel = PathBuf::from("man").join("boards").join(shard(board_id)).join(board_id);
        for segment in treasure_id {
            rel.push(segment);
        }
        self.write_json(rel.join(".DIR"), &articles);
    }

    pub fn write_treasure_body(
        &self,
        board_id: &str,
        treasure_id: &[&str],
        filename: &str,
        body: &[u8],
    ) {
        let mut rel = PathBuf::from("man").join("boards").join(shard(board_id)).join(board_id);
        for segment in treasure_id {
            rel.push(segment);
        }
        self.write_raw(rel.join(filename), body);
    }

    pub fn write_favorites(&self, user_id: &str, favorites: &[FlatFavorite]) {
        self.write_json(
            PathBuf::from("home").join(shard(user_id)).join(user_id).join(".fav"),
            &favorites,
        );
    }

    pub fn write_cached_articles(&self, user_id: &str, records: &[UserArticle]) {
        self.write_json(
            PathBuf::from("usr_article")
                .join(shard(user_id))
                .join(format!("{user_id}.idx")),
            &records,
        );
    }
}

pub fn user(user_id: &str, password: &str) -> FlatUser {
    FlatUser {
        user_id: user_id.to_string(),
        hashed_password: bbs_driver_flatfile::hash_password(password),
        nickname: String::new(),
        real_name: String::new(),
        num_login_days: 1,
        num_posts: 0,
        money: 0,
        last_login: Utc::now(),
        last_host: "127.0.0.1".to_string(),
        num_bad_posts: None,
        last_login_country: None,
        mailbox_description: None,
    }
}

pub fn board(board_id: &str) -> FlatBoard {
    FlatBoard {
        board_id: board_id.to_string(),
        title: format!("{board_id} title"),
        is_class: false,
        class_id: None,
        moderators: Vec::new(),
    }
}

pub fn class(board_id: &str) -> FlatBoard {
    FlatBoard {
        is_class: true,
        ..board(board_id)
    }
}

pub fn article(filename: &str, owner: &str, title: &str) -> FlatArticle {
    FlatArticle {
        filename: filename.to_string(),
        modified: Utc::now(),
        recommend: 0,
        date: "08/30".to_string(),
        title: title.to_string(),
        money: 0,
        owner: owner.to_string(),
    }
}

/// Wraps the flatfile connector, hiding its optional capabilities. The
/// capability accessors fall back to the trait defaults, so the facade
/// sees a read-only backend.
#[derive(Debug)]
struct ReadOnlyConnector {
    inner: Arc<dyn Connector>,
}

#[async_trait]
impl Connector for ReadOnlyConnector {
    fn user_records_path(&self) -> Result<PathBuf> {
        self.inner.user_records_path()
    }

    async fn read_user_records_file(&self, path: &Path) -> Result<Vec<Box<dyn UserRecord>>> {
        self.inner.read_user_records_file(path).await
    }

    fn user_favorites_path(&self, user_id: &str) -> Result<PathBuf> {
        self.inner.user_favorites_path(user_id)
    }

    async fn read_favorite_records_file(
        &self,
        path: &Path,
    ) -> Result<Vec<Box<dyn FavoriteRecord>>> {
        self.inner.read_favorite_records_file(path).await
    }

    fn board_records_path(&self) -> Result<PathBuf> {
        self.inner.board_records_path()
    }

    async fn read_board_records_file(&self, path: &Path) -> Result<Vec<Box<dyn BoardRecord>>> {
        self.inner.read_board_records_file(path).await
    }

    fn board_articles_path(&self, board_id: &str) -> Result<PathBuf> {
        self.inner.board_articles_path(board_id)
    }

    fn board_treasures_path(&self, board_id: &str, treasure_id: &[String]) -> Result<PathBuf> {
        self.inner.board_treasures_path(board_id, treasure_id)
    }

    async fn read_article_records_file(
        &self,
        path: &Path,
    ) -> Result<Vec<Box<dyn ArticleRecord>>> {
        self.inner.read_article_records_file(path).await
    }

    fn board_article_file_path(&self, board_id: &str, filename: &str) -> Result<PathBuf> {
        self.inner.board_article_file_path(board_id, filename)
    }

    fn board_treasure_file_path(
        &self,
        board_id: &str,
        treasure_id: &[String],
        filename: &str,
    ) -> Result<PathBuf> {
        self.inner.board_treasure_file_path(board_id, treasure_id, filename)
    }

    async fn read_article_file(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read_article_file(path).await
    }
}

struct ReadOnlyDriver;

#[async_trait]
impl Driver for ReadOnlyDriver {
    async fn open(&self, data_source_name: &str) -> Result<Arc<dyn Connector>> {
        let inner = FlatFileDriver.open(data_source_name).await?;
        Ok(Arc::new(ReadOnlyConnector { inner }))
    }
}
