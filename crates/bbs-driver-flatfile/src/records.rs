//! On-disk record shapes of the flatfile layout and their mapping onto
//! the bbs-core contracts.

use bbs_core::{
    ArticleRecord, BbsError, BoardRecord, FavoriteEntry, FavoriteRecord, Result, UserRecord,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One account in `.PASSWDS`. The stored password is a SHA-256 hex
/// digest of the cleartext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatUser {
    pub user_id: String,
    pub hashed_password: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub real_name: String,
    #[serde(default)]
    pub num_login_days: u32,
    #[serde(default)]
    pub num_posts: u32,
    #[serde(default)]
    pub money: i32,
    pub last_login: DateTime<Utc>,
    #[serde(default)]
    pub last_host: String,
    #[serde(default)]
    pub num_bad_posts: Option<u32>,
    #[serde(default)]
    pub last_login_country: Option<String>,
    #[serde(default)]
    pub mailbox_description: Option<String>,
}

pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

impl UserRecord for FlatUser {
    fn user_id(&self) -> &str {
        &self.user_id
    }
    fn hashed_password(&self) -> &str {
        &self.hashed_password
    }
    fn verify_password(&self, password: &str) -> Result<()> {
        if hash_password(password) == self.hashed_password {
            Ok(())
        } else {
            Err(BbsError::Other(anyhow::anyhow!(
                "password mismatch for user `{}`",
                self.user_id
            )))
        }
    }
    fn nickname(&self) -> &str {
        &self.nickname
    }
    fn real_name(&self) -> &str {
        &self.real_name
    }
    fn num_login_days(&self) -> u32 {
        self.num_login_days
    }
    fn num_posts(&self) -> u32 {
        self.num_posts
    }
    fn money(&self) -> i32 {
        self.money
    }
    fn last_login(&self) -> DateTime<Utc> {
        self.last_login
    }
    fn last_host(&self) -> &str {
        &self.last_host
    }
    fn num_bad_posts(&self) -> Option<u32> {
        self.num_bad_posts
    }
    fn last_login_country(&self) -> Option<String> {
        self.last_login_country.clone()
    }
    fn mailbox_description(&self) -> Option<String> {
        self.mailbox_description.clone()
    }
}

/// One favorites entry in `.fav`. Folders nest; child order on disk is
/// the user's insertion order and is preserved as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlatFavorite {
    Board { title: String, board_id: String },
    Folder { title: String, records: Vec<FlatFavorite> },
    Line,
}

impl FavoriteRecord for FlatFavorite {
    fn title(&self) -> &str {
        match self {
            FlatFavorite::Board { title, .. } | FlatFavorite::Folder { title, .. } => title,
            FlatFavorite::Line => "",
        }
    }

    fn entry(&self) -> FavoriteEntry<'_> {
        match self {
            FlatFavorite::Board { board_id, .. } => FavoriteEntry::Board { board_id },
            FlatFavorite::Folder { records, .. } => FavoriteEntry::Folder {
                records: records
                    .iter()
                    .map(|r| r as &dyn FavoriteRecord)
                    .collect(),
            },
            FlatFavorite::Line => FavoriteEntry::Line,
        }
    }
}

/// One board or class slot in `.BRD`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatBoard {
    pub board_id: String,
    pub title: String,
    #[serde(default)]
    pub is_class: bool,
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default)]
    pub moderators: Vec<String>,
}

impl FlatBoard {
    /// Copies an arbitrary record implementation into the flatfile shape,
    /// e.g. when appending a record built by another driver.
    pub fn from_record(record: &dyn BoardRecord) -> Self {
        Self {
            board_id: record.board_id().to_string(),
            title: record.title().to_string(),
            is_class: record.is_class(),
            class_id: record.class_id().map(str::to_string),
            moderators: record.moderators().to_vec(),
        }
    }
}

impl BoardRecord for FlatBoard {
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

/// One article slot in a `.DIR` index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatArticle {
    pub filename: String,
    pub modified: DateTime<Utc>,
    #[serde(default)]
    pub recommend: i32,
    #[serde(default)]
    pub date: String,
    pub title: String,
    #[serde(default)]
    pub money: i32,
    pub owner: String,
}

impl ArticleRecord for FlatArticle {
    fn filename(&self) -> &str {
        &self.filename
    }
    fn modified(&self) -> DateTime<Utc> {
        self.modified
    }
    fn recommend(&self) -> i32 {
        self.recommend
    }
    fn date(&self) -> &str {
        &self.date
    }
    fn title(&self) -> &str {
        &self.title
    }
    fn money(&self) -> i32 {
        self.money
    }
    fn owner(&self) -> &str {
        &self.owner
    }
}
