use std::{fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmployeeStatus {
    #[default]
    Working,
    OnVacation,
    LunchTime,
    BusinessTrip,
}

impl EmployeeStatus {
    pub const ALL: [EmployeeStatus; 4] = [
        EmployeeStatus::Working,
        EmployeeStatus::OnVacation,
        EmployeeStatus::LunchTime,
        EmployeeStatus::BusinessTrip,
    ];

    /// Wire value, as the service expects it.
    pub fn as_str(self) -> &'static str {
        match self {
            EmployeeStatus::Working => "Working",
            EmployeeStatus::OnVacation => "OnVacation",
            EmployeeStatus::LunchTime => "LunchTime",
            EmployeeStatus::BusinessTrip => "BusinessTrip",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EmployeeStatus::Working => "Working",
            EmployeeStatus::OnVacation => "On Vacation",
            EmployeeStatus::LunchTime => "Lunch Time",
            EmployeeStatus::BusinessTrip => "Business Trip",
        }
    }
}

impl fmt::Display for EmployeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown status {0:?}; expected one of Working, OnVacation, LunchTime, BusinessTrip")]
pub struct ParseStatusError(String);

/// Accepts the wire value or the display label, ignoring case and separators.
impl FromStr for EmployeeStatus {
    type Err = ParseStatusError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let folded: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        EmployeeStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(&folded))
            .ok_or_else(|| ParseStatusError(raw.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: EmployeeStatus,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CreateEmployee {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub status: EmployeeStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AvatarFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl AvatarFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Reads a file from disk, guessing the media type from its extension.
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("avatar")
            .to_string();
        let content_type = guess_media_type(path).to_string();
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }
}

pub fn guess_media_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}
