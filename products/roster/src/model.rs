use entity::{EmployeeStatus, employees};
use serde::{Deserialize, Serialize};

/// Employee as returned over the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i32,
    pub name: String,
    pub title: Option<String>,
    pub status: EmployeeStatus,
    pub avatar_url: Option<String>,
}

impl From<employees::Model> for Employee {
    fn from(model: employees::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            title: model.title,
            status: model.status,
            avatar_url: model.avatar_url,
        }
    }
}

/// Create request body. Fields stay loosely typed so that bad values are
/// reported by validation rather than by the JSON decoder.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEmployee {
    pub name: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatus {
    pub status: Option<String>,
}

/// Raw avatar payload as received from the multipart `file` field.
#[derive(Clone, Debug, Default)]
pub struct AvatarUpload {
    pub content_type: Option<String>,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}
