//! # Aggregation engine
//!
//! Reconstructs a user's post history when no authoritative cached index
//! exists: every board's article index is scanned for articles owned by
//! the user. A non-empty cached index short-circuits the scan and is
//! returned verbatim.
//!
//! The scan is all-or-nothing: a hard error on any board aborts the whole
//! aggregation, a partial history is never returned. A missing index file
//! is not a hard error (an unposted board simply has none).

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::db::{read_index_tolerant, Bbs};
use crate::error::{BbsError, Result};
use crate::records::UserArticle;

/// Board id of the system-wide meta board mirroring every post. Scanning
/// it would double-count, so it is excluded.
const ALLPOST: &str = "ALLPOST";

/// Upper bound on concurrently open board indices during a scan; keeps
/// file-descriptor usage flat on installations with thousands of boards.
const SCAN_CONCURRENCY: usize = 8;

pub(crate) async fn user_articles(bbs: &Bbs, user_id: &str) -> Result<Vec<UserArticle>> {
    if let Some(cached) = read_cached(bbs, user_id).await? {
        return Ok(cached);
    }
    scan_boards(bbs, user_id).await
}

/// Fast path: the driver's cached per-user index, trusted blindly when
/// non-empty. An absent or empty cache falls through to the scan.
async fn read_cached(bbs: &Bbs, user_id: &str) -> Result<Option<Vec<UserArticle>>> {
    let Some(index) = bbs.connector().user_article_index() else {
        return Ok(None);
    };

    let path = index.user_articles_path(user_id)?;
    debug!(user_id, path = %path.display(), "reading cached user article index");
    match index.read_user_articles_file(&path).await {
        Ok(records) if records.is_empty() => Ok(None),
        Ok(records) => Ok(Some(records)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Fallback: scan every non-ALLPOST board's article index, bounded
/// parallelism, output in board-enumeration order then article order.
async fn scan_boards(bbs: &Bbs, user_id: &str) -> Result<Vec<UserArticle>> {
    let boards = bbs.read_board_records().await?;

    let semaphore = Arc::new(Semaphore::new(SCAN_CONCURRENCY));
    let mut tasks: JoinSet<Result<(usize, Vec<UserArticle>)>> = JoinSet::new();

    for (position, record) in boards.iter().enumerate() {
        if record.board_id() == ALLPOST {
            continue;
        }
        let board_id = record.board_id().to_string();
        let connector = bbs.connector_arc();
        let semaphore = Arc::clone(&semaphore);
        let user_id = user_id.to_string();

        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|err| BbsError::Other(err.into()))?;

            let path = connector.board_articles_path(&board_id)?;
            let articles = read_index_tolerant(connector.as_ref(), &path).await?;

            let matched: Vec<UserArticle> = articles
                .iter()
                .filter(|article| article.owner() == user_id)
                .map(|article| UserArticle {
                    board_id: board_id.clone(),
                    title: article.title().to_string(),
                    owner: article.owner().to_string(),
                    filename: article.filename().to_string(),
                })
                .collect();
            if !matched.is_empty() {
                debug!(board_id = %board_id, matched = matched.len(), "board scan hit");
            }
            Ok((position, matched))
        });
    }

    let mut per_board = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        // The first hard error drops the JoinSet, aborting the remaining
        // board reads: no partial history escapes.
        let (position, matched) = joined.map_err(|err| BbsError::Other(err.into()))??;
        per_board.push((position, matched));
    }

    per_board.sort_by_key(|(position, _)| *position);
    Ok(per_board
        .into_iter()
        .flat_map(|(_, matched)| matched)
        .collect())
}
