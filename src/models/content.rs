//! The aggregate content record and its site-wide parts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{BlogPost, ContactMessage, GalleryItem, Notice};
use crate::errors::AppError;

/// All site content in one record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteContent {
    pub settings: Settings,
    pub admin: AdminCredentials,
    pub home: Value,
    pub about: Value,
    pub admissions: Value,
    pub notices: Vec<Notice>,
    pub blogs: Vec<BlogPost>,
    pub gallery: Vec<GalleryItem>,
    pub contact_messages: Vec<ContactMessage>,
}

impl SiteContent {
    pub fn page(&self, page: PageKey) -> &Value {
        match page {
            PageKey::Home => &self.home,
            PageKey::About => &self.about,
            PageKey::Admissions => &self.admissions,
        }
    }

    pub fn page_mut(&mut self, page: PageKey) -> &mut Value {
        match page {
            PageKey::Home => &mut self.home,
            PageKey::About => &mut self.about,
            PageKey::Admissions => &mut self.admissions,
        }
    }

    /// The subset of content visitors may see.
    pub fn public_view(&self) -> PublicContent {
        PublicContent {
            settings: self.settings.clone(),
            home: self.home.clone(),
            about: self.about.clone(),
            admissions: self.admissions.clone(),
            notices: self.notices.clone(),
            blogs: self.blogs.iter().filter(|b| b.published).cloned().collect(),
            gallery: self.gallery.clone(),
        }
    }
}

/// Content served to the public site. Never includes credentials or messages.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicContent {
    pub settings: Settings,
    pub home: Value,
    pub about: Value,
    pub admissions: Value,
    pub notices: Vec<Notice>,
    pub blogs: Vec<BlogPost>,
    pub gallery: Vec<GalleryItem>,
}

/// Site-wide settings. Keys this type does not know are kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub school_name: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub whatsapp: String,
    #[serde(default)]
    pub call_number: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub map_url: String,
    #[serde(default)]
    pub default_language: String,
    #[serde(default)]
    pub supported_languages: Vec<String>,
    #[serde(default)]
    pub social_links: BTreeMap<String, String>,
    #[serde(default)]
    pub videos: Vec<Video>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An embedded video on the home page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub featured: bool,
}

impl Settings {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.school_name.trim().is_empty() {
            return Err(AppError::Validation("School name is required".to_string()));
        }
        Ok(())
    }
}

/// The single admin credential pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

/// Request body for changing the admin credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCredentialsRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl UpdateCredentialsRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        match &self.password {
            Some(p) if !p.is_empty() => {}
            _ => {
                return Err(AppError::Validation(
                    "A new password is required to update credentials".to_string(),
                ))
            }
        }
        if let Some(username) = &self.username {
            if username.trim().is_empty() {
                return Err(AppError::Validation("Username cannot be empty".to_string()));
            }
        }
        Ok(())
    }
}

impl AdminCredentials {
    pub fn apply(&mut self, update: UpdateCredentialsRequest) {
        if let Some(username) = update.username {
            self.username = username;
        }
        if let Some(password) = update.password {
            self.password = password;
        }
    }
}

/// Pages whose content is edited as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKey {
    Home,
    About,
    Admissions,
}

impl PageKey {
    pub const ALL: [PageKey; 3] = [PageKey::Home, PageKey::About, PageKey::Admissions];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageKey::Home => "home",
            PageKey::About => "about",
            PageKey::Admissions => "admissions",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "home" => Some(PageKey::Home),
            "about" => Some(PageKey::About),
            "admissions" => Some(PageKey::Admissions),
            _ => None,
        }
    }
}
