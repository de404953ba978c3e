use std::fmt;

use super::RemoteError;

/// Path into the remote document tree.
///
/// Segments alternate collection / document, so a path with an odd number
/// of segments names a collection and an even one names a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    segments: Vec<String>,
}

impl DocPath {
    /// A top-level collection.
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Appends one segment.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_document(&self) -> bool {
        self.segments.len() % 2 == 0
    }

    pub fn is_collection(&self) -> bool {
        !self.is_document()
    }

    /// Last segment: the document id for a document path.
    pub fn last(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// The path without its last segment, or `None` for a top-level
    /// collection.
    pub fn parent(&self) -> Option<DocPath> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub(crate) fn expect_document(&self) -> Result<(), RemoteError> {
        if self.is_document() {
            Ok(())
        } else {
            Err(RemoteError::InvalidPath(format!(
                "{} is a collection, expected a document",
                self
            )))
        }
    }

    pub(crate) fn expect_collection(&self) -> Result<(), RemoteError> {
        if self.is_collection() {
            Ok(())
        } else {
            Err(RemoteError::InvalidPath(format!(
                "{} is a document, expected a collection",
                self
            )))
        }
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

const USERS: &str = "users";
const ROUTINES: &str = "routines";
const EXERCISES: &str = "exercises";
const PROGRESS: &str = "progress";

/// The per-user namespace of the remote tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserScope {
    user_id: String,
}

impl UserScope {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// `users/{uid}`: the profile document.
    pub fn profile(&self) -> DocPath {
        DocPath::collection(USERS).child(&self.user_id)
    }

    pub fn routines(&self) -> DocPath {
        self.profile().child(ROUTINES)
    }

    pub fn routine(&self, routine_id: &str) -> DocPath {
        self.routines().child(routine_id)
    }

    pub fn exercises(&self, routine_id: &str) -> DocPath {
        self.routine(routine_id).child(EXERCISES)
    }

    pub fn progress_collection(&self) -> DocPath {
        self.profile().child(PROGRESS)
    }

    /// Progress documents are keyed by the routine's remote id.
    pub fn progress(&self, routine_id: &str) -> DocPath {
        self.progress_collection().child(routine_id)
    }
}
