//! Input validation for article payloads.
//!
//! Validation walks the raw JSON so every problem is reported against the
//! exact field path (`articles.3.file_hash`) in one pass, before any store
//! access. Messages follow the "The {field} field ..." convention sync
//! clients already parse.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{
    FILE_HASH_LEN, Frontmatter, KeyScheme, MAX_FILE_PATH_LEN, MAX_SLUG_LEN, MAX_TITLE_LEN,
    NewArticle, parse_file_date,
};

// ── Error collection ─────────────────────────────────────────

/// Field path → messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// Record a message against a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields with at least one error.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Messages recorded for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(value)` when nothing was recorded, otherwise `Error::Validation`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` carrying every recorded message.
    pub fn into_result<T>(self, value: T) -> Result<T> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(Error::Validation(self))
        }
    }
}

// ── Rules ────────────────────────────────────────────────────

/// Which fields an article payload must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rules {
    pub key_scheme: KeyScheme,
    /// `file_hash` required (hash identity).
    pub require_hash: bool,
    /// `file_date` required (date identity).
    pub require_date: bool,
    /// `file_path` required even when it is not the key.
    pub require_file_path: bool,
}

impl Rules {
    /// Rules for single-record create/update: only key and content required.
    #[must_use]
    pub const fn single(key_scheme: KeyScheme) -> Self {
        Self {
            key_scheme,
            require_hash: false,
            require_date: false,
            require_file_path: false,
        }
    }
}

// ── Field helpers ────────────────────────────────────────────

fn field_name(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// Validate an optional string field with a maximum length.
fn optional_string(
    obj: &serde_json::Map<String, Value>,
    prefix: &str,
    field: &str,
    max: Option<usize>,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let name = field_name(prefix, field);
    match obj.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            if let Some(max) = max {
                if s.chars().count() > max {
                    errors.add(
                        &name,
                        format!("The {name} field must not be greater than {max} characters."),
                    );
                    return None;
                }
            }
            Some(s.clone())
        }
        Some(_) => {
            errors.add(&name, format!("The {name} field must be a string."));
            None
        }
    }
}

/// Validate a required string field.
fn required_string(
    obj: &serde_json::Map<String, Value>,
    prefix: &str,
    field: &str,
    max: Option<usize>,
    errors: &mut ValidationErrors,
) -> Option<String> {
    if is_blank(obj.get(field)) {
        let name = field_name(prefix, field);
        errors.add(&name, format!("The {name} field is required."));
        return None;
    }
    optional_string(obj, prefix, field, max, errors)
}

fn frontmatter(
    obj: &serde_json::Map<String, Value>,
    prefix: &str,
    errors: &mut ValidationErrors,
) -> Option<Frontmatter> {
    let name = field_name(prefix, "frontmatter");
    match obj.get("frontmatter") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map.clone()),
        // PHP-style clients encode an empty map as []
        Some(Value::Array(items)) if items.is_empty() => Some(Frontmatter::new()),
        Some(_) => {
            errors.add(&name, format!("The {name} field must be an object."));
            None
        }
    }
}

// ── Entry points ─────────────────────────────────────────────

/// Validate one article object, recording problems under `prefix`.
///
/// Returns the article only when this object produced no errors.
pub fn article(
    value: &Value,
    rules: &Rules,
    prefix: &str,
    errors: &mut ValidationErrors,
) -> Option<NewArticle> {
    let Some(obj) = value.as_object() else {
        let name = if prefix.is_empty() { "body" } else { prefix };
        errors.add(name, format!("The {name} field must be an object."));
        return None;
    };
    let before = errors.len();

    let slug_required = rules.key_scheme == KeyScheme::Slug;
    let path_required = rules.key_scheme == KeyScheme::FilePath || rules.require_file_path;

    let slug = if slug_required {
        required_string(obj, prefix, "slug", Some(MAX_SLUG_LEN), errors)
    } else {
        optional_string(obj, prefix, "slug", Some(MAX_SLUG_LEN), errors)
    };
    let file_path = if path_required {
        required_string(obj, prefix, "file_path", Some(MAX_FILE_PATH_LEN), errors)
    } else {
        optional_string(obj, prefix, "file_path", Some(MAX_FILE_PATH_LEN), errors)
    };
    let title = optional_string(obj, prefix, "title", Some(MAX_TITLE_LEN), errors);
    let content = required_string(obj, prefix, "content", None, errors);
    let frontmatter = frontmatter(obj, prefix, errors);

    let file_hash = if rules.require_hash {
        required_string(obj, prefix, "file_hash", None, errors)
    } else {
        optional_string(obj, prefix, "file_hash", None, errors)
    };
    if let Some(hash) = &file_hash {
        if hash.chars().count() != FILE_HASH_LEN {
            let name = field_name(prefix, "file_hash");
            errors.add(
                &name,
                format!("The {name} field must be {FILE_HASH_LEN} characters."),
            );
        }
    }

    let raw_date = if rules.require_date {
        required_string(obj, prefix, "file_date", None, errors)
    } else {
        optional_string(obj, prefix, "file_date", None, errors)
    };
    let file_date = raw_date.as_deref().and_then(|raw| {
        let parsed = parse_file_date(raw);
        if parsed.is_none() {
            let name = field_name(prefix, "file_date");
            errors.add(&name, format!("The {name} field must be a valid date."));
        }
        parsed
    });

    if errors.len() > before {
        return None;
    }

    let natural_key = match rules.key_scheme {
        KeyScheme::Slug => slug?,
        KeyScheme::FilePath => file_path.clone()?,
    };

    Some(NewArticle {
        natural_key,
        title,
        content: content?,
        frontmatter,
        file_hash,
        file_path,
        file_date,
    })
}

/// Validate a single-article request body.
///
/// # Errors
///
/// Returns `Error::Validation` with every field problem.
pub fn single(value: &Value, rules: &Rules) -> Result<NewArticle> {
    let mut errors = ValidationErrors::default();
    let parsed = article(value, rules, "", &mut errors);
    match parsed {
        Some(a) if errors.is_empty() => Ok(a),
        _ => Err(Error::Validation(errors)),
    }
}

/// Validate a sync request body of the form `{"articles": [...]}`.
///
/// An empty array is a valid (zero-effect) batch.
///
/// # Errors
///
/// Returns `Error::Validation` with every problem across the whole batch.
pub fn sync_batch(value: &Value, rules: &Rules) -> Result<Vec<NewArticle>> {
    let mut errors = ValidationErrors::default();

    let items = match value.get("articles") {
        None | Some(Value::Null) => {
            errors.add("articles", "The articles field is required.");
            return Err(Error::Validation(errors));
        }
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.add("articles", "The articles field must be an array.");
            return Err(Error::Validation(errors));
        }
    };

    let batch: Vec<NewArticle> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| article(item, rules, &format!("articles.{i}"), &mut errors))
        .collect();

    errors.into_result(batch)
}
