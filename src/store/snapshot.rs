//! Default template and snapshot restoration.
//!
//! A saved snapshot is merged over the default template one top-level key at
//! a time, so keys added after the snapshot was written still get a value.

use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::errors::AppError;
use crate::models::{validate_icons, PageKey, SiteContent};

static DEFAULT_TEMPLATE: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("default_content.json"))
        .expect("embedded default content is valid JSON")
});

/// The default template as raw JSON.
pub fn default_template() -> &'static Value {
    &DEFAULT_TEMPLATE
}

/// The default template as typed content.
pub fn default_content() -> SiteContent {
    serde_json::from_value(DEFAULT_TEMPLATE.clone())
        .expect("embedded default content matches the content model")
}

/// How strictly icon names inside pages are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconPolicy {
    /// Unknown icons fail the whole restore.
    Reject,
    /// Pages with unknown icons fall back to the template's page.
    ResetPage,
}

/// Shallow-merge `saved` over the default template.
///
/// `null` values in `saved` count as missing.
pub fn merge_over_defaults(saved: Map<String, Value>) -> Map<String, Value> {
    let mut merged = match DEFAULT_TEMPLATE.clone() {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (key, value) in saved {
        if !value.is_null() {
            merged.insert(key, value);
        }
    }
    merged
}

/// Parse a serialized snapshot into content.
pub fn restore(raw: &str, policy: IconPolicy) -> Result<SiteContent, AppError> {
    let value: Value = serde_json::from_str(raw)?;
    restore_value(value, policy)
}

/// Turn a JSON value into content, filling missing keys from the template.
pub fn restore_value(value: Value, policy: IconPolicy) -> Result<SiteContent, AppError> {
    let Value::Object(saved) = value else {
        return Err(AppError::BadRequest(
            "Snapshot must be a JSON object".to_string(),
        ));
    };

    let mut merged = merge_over_defaults(saved);

    for page in PageKey::ALL {
        let Some(content) = merged.get(page.as_str()) else {
            continue;
        };
        if let Err(e) = validate_icons(page.as_str(), content) {
            match policy {
                IconPolicy::Reject => return Err(e),
                IconPolicy::ResetPage => {
                    tracing::warn!("{}; resetting '{}' to default", e, page.as_str());
                    merged.insert(
                        page.as_str().to_string(),
                        DEFAULT_TEMPLATE[page.as_str()].clone(),
                    );
                }
            }
        }
    }

    Ok(serde_json::from_value(Value::Object(merged))?)
}

/// Check list invariants an imported snapshot must already satisfy.
pub fn validate_invariants(content: &SiteContent) -> Result<(), AppError> {
    let latest = content.notices.iter().filter(|n| n.is_latest).count();
    if latest > 1 {
        return Err(AppError::Validation(format!(
            "{} notices are marked latest; at most one may be",
            latest
        )));
    }

    check_unique("notices", content.notices.iter().map(|n| n.id.as_str()))?;
    check_unique("blogs", content.blogs.iter().map(|b| b.id.as_str()))?;
    check_unique("gallery", content.gallery.iter().map(|g| g.id.as_str()))?;
    check_unique(
        "contactMessages",
        content.contact_messages.iter().map(|m| m.id.as_str()),
    )?;
    Ok(())
}

/// Keep only the first notice flagged latest. Returns whether anything changed.
pub fn repair_latest(content: &mut SiteContent) -> bool {
    let mut seen = false;
    let mut repaired = false;
    for notice in content.notices.iter_mut().filter(|n| n.is_latest) {
        if seen {
            notice.is_latest = false;
            repaired = true;
        }
        seen = true;
    }
    repaired
}

fn check_unique<'a>(list: &str, ids: impl Iterator<Item = &'a str>) -> Result<(), AppError> {
    let mut seen = std::collections::HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(AppError::Validation(format!(
                "Duplicate id '{}' in {}",
                id, list
            )));
        }
    }
    Ok(())
}
