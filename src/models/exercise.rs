use serde::{Deserialize, Serialize};
use std::fmt;

/// A named exercise, shared by every routine that uses it.
///
/// Names are unique regardless of letter case. A local key of 0 means the
/// exercise has not been stored yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub gif_url: Option<String>,
}

impl Exercise {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            category: None,
            description: None,
            gif_url: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_gif_url(mut self, url: impl Into<String>) -> Self {
        self.gif_url = Some(url.into());
        self
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(category) = &self.category {
            write!(f, " [{}]", category)?;
        }
        Ok(())
    }
}
