//! Request/query types (Deserialize)

use ora2pg_assist_core::{FileFilter, FileStatus, ObjectType};
use serde::Deserialize;

use crate::api_error::ApiError;

/// `?type=TABLE&status=failed` on the objects listing. Both are optional.
#[derive(Debug, Default, Deserialize)]
pub struct ObjectsQuery {
    #[serde(rename = "type")]
    pub object_type: Option<String>,
    pub status: Option<String>,
}

impl ObjectsQuery {
    pub fn to_filter(&self) -> Result<FileFilter, ApiError> {
        let object_type = non_empty(self.object_type.as_deref())
            .map(str::parse::<ObjectType>)
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let status = non_empty(self.status.as_deref())
            .map(|s| s.to_ascii_lowercase().parse::<FileStatus>())
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        Ok(FileFilter { object_type, status })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
