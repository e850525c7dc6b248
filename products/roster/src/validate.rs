use std::path::Path;

use entity::EmployeeStatus;
use platform_api::{ApiError, ApiResult};

use crate::model::{AvatarUpload, CreateEmployee, UpdateStatus};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

const IMAGE_TYPES: &[&str] = &["jpg", "jpeg", "png", "gif"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEmployee {
    pub name: String,
    pub title: Option<String>,
    pub status: EmployeeStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidAvatar {
    pub extension: String,
    pub bytes: Vec<u8>,
}

impl CreateEmployee {
    pub fn validate(self) -> ApiResult<NewEmployee> {
        // Length limits apply to the text as sent; stored values are trimmed.
        let raw_name = self.name.as_deref().unwrap_or_default();
        let name = raw_name.trim();
        if name.is_empty() {
            return Err(ApiError::validation("name should not be empty"));
        }
        validate_length("name", raw_name, MAX_NAME_LEN)?;

        let title = match self.title.as_deref() {
            Some(raw_title) => {
                validate_length("title", raw_title, MAX_TITLE_LEN)?;
                Some(raw_title.trim()).filter(|title| !title.is_empty())
            }
            None => None,
        }
        .map(str::to_string);

        let status = match self.status.as_deref() {
            Some(raw) => parse_status(raw)?,
            None => EmployeeStatus::default(),
        };

        Ok(NewEmployee {
            name: name.to_string(),
            title,
            status,
        })
    }
}

impl UpdateStatus {
    pub fn validate(self) -> ApiResult<EmployeeStatus> {
        match self.status.as_deref() {
            Some(raw) => parse_status(raw),
            None => Err(status_error()),
        }
    }
}

impl AvatarUpload {
    pub fn validate(self) -> ApiResult<ValidAvatar> {
        let content_type = self.content_type.as_deref().unwrap_or_default();
        let subtype = image_subtype(content_type).ok_or_else(|| {
            ApiError::validation(format!(
                "file must be an image ({}), got {:?}",
                IMAGE_TYPES.join("/"),
                content_type
            ))
        })?;
        if self.bytes.is_empty() {
            return Err(ApiError::validation("file is empty"));
        }
        if self.bytes.len() > MAX_AVATAR_BYTES {
            return Err(ApiError::validation(format!(
                "file is too large ({} bytes, maximum is {} bytes)",
                self.bytes.len(),
                MAX_AVATAR_BYTES
            )));
        }

        let extension = self
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|ext| IMAGE_TYPES.contains(&ext.as_str()))
            .unwrap_or(subtype);

        Ok(ValidAvatar {
            extension,
            bytes: self.bytes,
        })
    }
}

fn parse_status(raw: &str) -> ApiResult<EmployeeStatus> {
    EmployeeStatus::parse(raw).ok_or_else(status_error)
}

fn status_error() -> ApiError {
    let allowed: Vec<&str> = EmployeeStatus::ALL.iter().map(|s| s.as_str()).collect();
    ApiError::validation(format!(
        "status must be one of the following values: {}",
        allowed.join(", ")
    ))
}

fn validate_length(field: &str, value: &str, max: usize) -> ApiResult<()> {
    if value.chars().count() > max {
        return Err(ApiError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Returns the lowercased media subtype when it names an accepted image type.
fn image_subtype(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let (_, subtype) = essence.rsplit_once('/')?;
    IMAGE_TYPES
        .contains(&subtype)
        .then(|| subtype.to_string())
}
