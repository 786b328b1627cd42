//! Gallery image model.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub image: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGalleryItemRequest {
    #[serde(default)]
    pub title: String,
    pub image: String,
    #[serde(default)]
    pub category: String,
}

impl CreateGalleryItemRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.image.trim().is_empty() {
            return Err(AppError::Validation("Image URL is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGalleryItemRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl GalleryItem {
    pub fn apply(&mut self, update: UpdateGalleryItemRequest) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(image) = update.image {
            self.image = image;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
    }
}
