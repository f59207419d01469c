use serde::{Deserialize, Serialize};

/// Identity of the caller as established by the upstream authentication layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub user_email: Option<String>,
    pub user_role: Option<String>,
}

impl UserContext {
    pub fn with_details(user_id: String, email: Option<String>, role: Option<String>) -> Self {
        Self {
            user_id,
            user_email: email,
            user_role: role,
        }
    }
}

/// Generated name of a file the upload collaborator stored for this request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadedFile(pub Option<String>);

impl UploadedFile {
    pub fn filename(&self) -> Option<&str> {
        self.0.as_deref()
    }
}
