use serde::{Deserialize, Serialize};

/// A registered account row. The digest never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar: String,
    pub created_at: String,
}

/// The user object handed back to clients after register/login:
/// just enough to render a header and author posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub avatar: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// A post row. `user_name` and `user_avatar` are a snapshot of the author
/// taken at creation time; they deliberately do not follow later profile
/// changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_avatar: String,
    pub photo_url: String,
    pub created_at: String,
}

/// One comment as rendered under a feed post, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedComment {
    pub user_id: String,
    pub name: String,
    pub text: String,
    pub created_at: String,
}

/// A feed entry: the post plus its aggregated likes and comments.
/// Field names follow the client wire contract (camelCase).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPost {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_avatar: String,
    pub photo_url: String,
    pub likes: i64,
    pub liked_by: Vec<String>,
    pub comments: Vec<FeedComment>,
    pub created_at: String,
}
