//! Store operations over the pooled SQLite database.
//!
//! Every function acquires a connection from the pool for its own scope,
//! so handles are released on all exit paths. Nothing here spans more
//! than one request.

use rusqlite::params;
use std::collections::HashMap;

use crate::db::models::{FeedComment, FeedPost, Post, User};
use crate::db::now_timestamp;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        password_hash: row.get(3)?,
        avatar: row.get(4)?,
        created_at: row.get(5)?,
    })
}

const USER_COLUMNS: &str = "id, name, phone, password_hash, avatar, created_at";

pub fn find_user_by_phone(pool: &DbPool, phone: &str) -> AppResult<Option<User>> {
    let conn = pool.get()?;
    let result = conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE phone = ?1"),
        params![phone],
        user_from_row,
    );
    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn find_user_by_id(pool: &DbPool, id: &str) -> AppResult<Option<User>> {
    let conn = pool.get()?;
    let result = conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        user_from_row,
    );
    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Insert a new user. The UNIQUE constraint on `phone` is the sole
/// arbiter for concurrent registrations with the same number: the losing
/// insert surfaces as a `Conflict`.
pub fn create_user(
    pool: &DbPool,
    name: &str,
    phone: &str,
    password_hash: &str,
    avatar: &str,
) -> AppResult<User> {
    let conn = pool.get()?;
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        phone: phone.to_string(),
        password_hash: password_hash.to_string(),
        avatar: avatar.to_string(),
        created_at: now_timestamp(),
    };

    let result = conn.execute(
        "INSERT INTO users (id, name, phone, password_hash, avatar, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.id,
            user.name,
            user.phone,
            user.password_hash,
            user.avatar,
            user.created_at
        ],
    );

    match result {
        Ok(_) => Ok(user),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(AppError::Conflict("Phone already registered".into()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Insert a post, snapshotting the author's name and avatar as they are
/// right now.
pub fn create_post(pool: &DbPool, author: &User, photo_url: &str) -> AppResult<Post> {
    let conn = pool.get()?;
    let post = Post {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: author.id.clone(),
        user_name: author.name.clone(),
        user_avatar: author.avatar.clone(),
        photo_url: photo_url.to_string(),
        created_at: now_timestamp(),
    };

    conn.execute(
        "INSERT INTO posts (id, user_id, user_name, user_avatar, photo_url, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            post.id,
            post.user_id,
            post.user_name,
            post.user_avatar,
            post.photo_url,
            post.created_at
        ],
    )?;

    Ok(post)
}

pub fn post_exists(pool: &DbPool, post_id: &str) -> AppResult<bool> {
    let conn = pool.get()?;
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
        params![post_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Record a like. Liking a post twice is a no-op thanks to the
/// `(post_id, user_id)` primary key. Returns the post's like count.
pub fn add_like(pool: &DbPool, post_id: &str, user_id: &str) -> AppResult<i64> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT OR IGNORE INTO likes (post_id, user_id, created_at) VALUES (?1, ?2, ?3)",
        params![post_id, user_id, now_timestamp()],
    )?;

    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
        params![post_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn add_comment(pool: &DbPool, post_id: &str, author: &User, text: &str) -> AppResult<()> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO comments (id, post_id, user_id, user_name, text, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            uuid::Uuid::new_v4().to_string(),
            post_id,
            author.id,
            author.name,
            text,
            now_timestamp()
        ],
    )?;
    Ok(())
}

/// The whole feed, newest post first, each entry enriched with its like
/// count, the ids of users who liked it, and its comments oldest-first.
/// Three queries, joined in memory; `rowid` tiebreaks identical
/// timestamps so insertion order is stable.
pub fn list_posts_with_aggregates(pool: &DbPool) -> AppResult<Vec<FeedPost>> {
    let conn = pool.get()?;

    let posts: Vec<Post> = {
        let mut stmt = conn.prepare(
            "SELECT id, user_id, user_name, user_avatar, photo_url, created_at
             FROM posts ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Post {
                id: row.get(0)?,
                user_id: row.get(1)?,
                user_name: row.get(2)?,
                user_avatar: row.get(3)?,
                photo_url: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    let mut liked_by: HashMap<String, Vec<String>> = HashMap::new();
    {
        let mut stmt = conn.prepare("SELECT post_id, user_id FROM likes")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (post_id, user_id) = row?;
            liked_by.entry(post_id).or_default().push(user_id);
        }
    }

    let mut comments: HashMap<String, Vec<FeedComment>> = HashMap::new();
    {
        let mut stmt = conn.prepare(
            "SELECT post_id, user_id, user_name, text, created_at
             FROM comments ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                FeedComment {
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                    text: row.get(3)?,
                    created_at: row.get(4)?,
                },
            ))
        })?;
        for row in rows {
            let (post_id, comment) = row?;
            comments.entry(post_id).or_default().push(comment);
        }
    }

    let feed = posts
        .into_iter()
        .map(|post| {
            let liked = liked_by.remove(&post.id).unwrap_or_default();
            FeedPost {
                likes: liked.len() as i64,
                liked_by: liked,
                comments: comments.remove(&post.id).unwrap_or_default(),
                id: post.id,
                user_id: post.user_id,
                user_name: post.user_name,
                user_avatar: post.user_avatar,
                photo_url: post.photo_url,
                created_at: post.created_at,
            }
        })
        .collect();

    Ok(feed)
}

pub fn count_users(pool: &DbPool) -> AppResult<i64> {
    let conn = pool.get()?;
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(count)
}

pub fn count_posts(pool: &DbPool) -> AppResult<i64> {
    let conn = pool.get()?;
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
    Ok(count)
}
