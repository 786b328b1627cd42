//! Icon identifiers referenced from page content.
//!
//! Page content stores icons by name. Names resolve through a closed table;
//! anything outside it is rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IconKey {
    FiBookOpen,
    FiUsers,
    FiActivity,
    FiAward,
    FiBook,
    FiGlobe,
    FiCpu,
    FiMusic,
    FiCheckCircle,
    FiStar,
    FiHeart,
    FiShield,
    FiMonitor,
    FiTarget,
    FiTrendingUp,
}

impl IconKey {
    pub const ALL: [IconKey; 15] = [
        IconKey::FiBookOpen,
        IconKey::FiUsers,
        IconKey::FiActivity,
        IconKey::FiAward,
        IconKey::FiBook,
        IconKey::FiGlobe,
        IconKey::FiCpu,
        IconKey::FiMusic,
        IconKey::FiCheckCircle,
        IconKey::FiStar,
        IconKey::FiHeart,
        IconKey::FiShield,
        IconKey::FiMonitor,
        IconKey::FiTarget,
        IconKey::FiTrendingUp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IconKey::FiBookOpen => "FiBookOpen",
            IconKey::FiUsers => "FiUsers",
            IconKey::FiActivity => "FiActivity",
            IconKey::FiAward => "FiAward",
            IconKey::FiBook => "FiBook",
            IconKey::FiGlobe => "FiGlobe",
            IconKey::FiCpu => "FiCpu",
            IconKey::FiMusic => "FiMusic",
            IconKey::FiCheckCircle => "FiCheckCircle",
            IconKey::FiStar => "FiStar",
            IconKey::FiHeart => "FiHeart",
            IconKey::FiShield => "FiShield",
            IconKey::FiMonitor => "FiMonitor",
            IconKey::FiTarget => "FiTarget",
            IconKey::FiTrendingUp => "FiTrendingUp",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|icon| icon.as_str() == name)
    }
}

/// Check every `icon` string inside a page's content.
///
/// Returns the path of the first unknown icon in the error message.
pub fn validate_icons(page: &str, content: &Value) -> Result<(), AppError> {
    let mut path = page.to_string();
    match find_unknown_icon(content, &mut path) {
        Some((path, name)) => Err(AppError::Validation(format!(
            "Unknown icon '{}' at {}",
            name, path
        ))),
        None => Ok(()),
    }
}

fn find_unknown_icon(value: &Value, path: &mut String) -> Option<(String, String)> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let len = path.len();
                path.push('.');
                path.push_str(key);
                if key == "icon" {
                    if let Value::String(name) = child {
                        if IconKey::from_name(name).is_none() {
                            return Some((path.clone(), name.clone()));
                        }
                    }
                } else if let Some(found) = find_unknown_icon(child, path) {
                    return Some(found);
                }
                path.truncate(len);
            }
            None
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                let len = path.len();
                path.push_str(&format!("[{}]", i));
                if let Some(found) = find_unknown_icon(child, path) {
                    return Some(found);
                }
                path.truncate(len);
            }
            None
        }
        _ => None,
    }
}
