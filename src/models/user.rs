use serde::{Deserialize, Serialize};
use std::fmt;

/// Profile of the signed-in account.
///
/// The id is the stable account identifier assigned by the identity
/// provider; everything else comes from the profile form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub age: i32,
    pub weight: f64, // kg
    pub height: f64, // cm
    pub experience_level: String,
    pub goal: String,
    pub photo_url: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            age: 0,
            weight: 0.0,
            height: 0.0,
            experience_level: String::new(),
            goal: String::new(),
            photo_url: None,
        }
    }

    pub fn with_age(mut self, age: i32) -> Self {
        self.age = age;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }

    pub fn with_experience_level(mut self, level: impl Into<String>) -> Self {
        self.experience_level = level.into();
        self
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.len().max(1)))?;
        writeln!(f, "Age:        {}", self.age)?;
        writeln!(f, "Weight:     {} kg", self.weight)?;
        writeln!(f, "Height:     {} cm", self.height)?;
        if !self.experience_level.is_empty() {
            writeln!(f, "Experience: {}", self.experience_level)?;
        }
        if !self.goal.is_empty() {
            writeln!(f, "Goal:       {}", self.goal)?;
        }
        if let Some(url) = &self.photo_url {
            writeln!(f, "Photo:      {}", url)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new_has_empty_profile() {
        let user = User::new("uid-1", "Ana");
        assert_eq!(user.id, "uid-1");
        assert_eq!(user.name, "Ana");
        assert_eq!(user.age, 0);
        assert!(user.goal.is_empty());
        assert!(user.photo_url.is_none());
    }

    #[test]
    fn test_user_builders() {
        let user = User::new("uid-1", "Ana")
            .with_age(31)
            .with_weight(62.5)
            .with_height(168.0)
            .with_experience_level("intermediate")
            .with_goal("strength")
            .with_photo_url("content://photos/1");

        assert_eq!(user.age, 31);
        assert_eq!(user.weight, 62.5);
        assert_eq!(user.experience_level, "intermediate");
        assert_eq!(user.photo_url.as_deref(), Some("content://photos/1"));
    }

    #[test]
    fn test_user_display() {
        let user = User::new("uid-1", "Ana").with_goal("strength");
        let output = format!("{}", user);
        assert!(output.contains("Ana"));
        assert!(output.contains("Goal:       strength"));
        assert!(!output.contains("Experience"));
    }
}
