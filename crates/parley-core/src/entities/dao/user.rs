use serde::{Deserialize, Serialize};

/// A row in the `user_profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Assigned by the store on first save.
    pub id: Option<i64>,
    pub name: String,
}

/// JSON document stored in `user_profiles.data`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct UserDocument {
    pub name: String,
}

impl UserProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    pub(crate) fn to_document(&self) -> UserDocument {
        UserDocument {
            name: self.name.clone(),
        }
    }

    pub(crate) fn from_document(id: i64, doc: UserDocument) -> Self {
        Self {
            id: Some(id),
            name: doc.name,
        }
    }
}
