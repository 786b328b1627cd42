//! Blog post model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;

/// Number of related posts shown under a post.
pub const RELATED_POSTS_LIMIT: usize = 3;

/// A blog post. `content` holds rendered HTML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub comments: Vec<Value>,
}

/// Request body for creating a blog post.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlogRequest {
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_published")]
    pub published: bool,
}

fn default_published() -> bool {
    true
}

impl CreateBlogRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("Blog title is required".to_string()));
        }
        Ok(())
    }
}

/// Request body for updating a blog post.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlogRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub published: Option<bool>,
    #[serde(default)]
    pub comments: Option<Vec<Value>>,
}

impl BlogPost {
    pub fn apply(&mut self, update: UpdateBlogRequest) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(excerpt) = update.excerpt {
            self.excerpt = excerpt;
        }
        if let Some(content) = update.content {
            self.content = content;
        }
        if let Some(image) = update.image {
            self.image = image;
        }
        if let Some(author) = update.author {
            self.author = author;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(published) = update.published {
            self.published = published;
        }
        if let Some(comments) = update.comments {
            self.comments = comments;
        }
    }

    /// Case-insensitive substring match on title or excerpt.
    pub fn matches_text(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query) || self.excerpt.to_lowercase().contains(&query)
    }
}

/// Published posts sharing `post`'s category, excluding the post itself.
pub fn related_posts<'a>(blogs: &'a [BlogPost], post: &BlogPost) -> Vec<&'a BlogPost> {
    blogs
        .iter()
        .filter(|b| b.published && b.id != post.id && b.category == post.category)
        .take(RELATED_POSTS_LIMIT)
        .collect()
}
