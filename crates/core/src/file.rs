use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::object_type::ObjectType;
use crate::CoreError;

/// Per-object progress through a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Generated,
    Corrected,
    Validated,
    Failed,
}

impl FileStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Corrected => "corrected",
            Self::Validated => "validated",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generated" => Ok(Self::Generated),
            "corrected" => Ok(Self::Corrected),
            "validated" => Ok(Self::Validated),
            "failed" => Ok(Self::Failed),
            _ => Err(CoreError::InvalidValue { field: "file_status", value: s.to_owned() }),
        }
    }
}

/// Which step an object failed in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Export,
    Correction,
    Sql,
    Connection,
}

impl FailureKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Export => "export",
            Self::Correction => "correction",
            Self::Sql => "sql",
            Self::Connection => "connection",
        }
    }
}

impl FromStr for FailureKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "export" => Ok(Self::Export),
            "correction" => Ok(Self::Correction),
            "sql" => Ok(Self::Sql),
            "connection" => Ok(Self::Connection),
            _ => Err(CoreError::InvalidValue { field: "failure_kind", value: s.to_owned() }),
        }
    }
}

/// Tokens consumed by one AI call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: &Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// One discovered object within a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrationFile {
    pub id: Uuid,
    pub session_id: Uuid,
    /// Position in creation order within the session.
    pub ordinal: u32,
    pub object_name: String,
    pub object_type: ObjectType,
    /// Table an index or trigger is attached to.
    pub parent_table: Option<String>,
    pub status: FileStatus,
    pub source_ddl: Option<String>,
    pub corrected_ddl: Option<String>,
    pub ai_attempts: u32,
    pub usage: TokenUsage,
    pub cache_hit: bool,
    pub failure_kind: Option<FailureKind>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MigrationFile {
    #[must_use]
    pub fn new(
        session_id: Uuid,
        ordinal: u32,
        object_name: String,
        object_type: ObjectType,
        parent_table: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            session_id,
            ordinal,
            object_name,
            object_type,
            parent_table,
            status: FileStatus::Generated,
            source_ddl: None,
            corrected_ddl: None,
            ai_attempts: 0,
            usage: TokenUsage::default(),
            cache_hit: false,
            failure_kind: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_exported(&mut self, ddl: String) {
        self.source_ddl = Some(ddl);
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, kind: FailureKind, message: impl Into<String>) {
        self.status = FileStatus::Failed;
        self.failure_kind = Some(kind);
        self.error = Some(message.into());
        self.updated_at = Utc::now();
    }

    /// Stores corrected SQL. A cache hit records no token usage.
    pub fn mark_corrected(&mut self, corrected: String, usage: Option<TokenUsage>) {
        self.status = FileStatus::Corrected;
        self.corrected_ddl = Some(corrected);
        match usage {
            Some(u) => {
                self.ai_attempts += 1;
                self.usage.add(&u);
            },
            None => self.cache_hit = true,
        }
        self.updated_at = Utc::now();
    }

    /// Passes the exported SQL through as-is when no AI is configured.
    pub fn mark_unchanged(&mut self) {
        self.status = FileStatus::Corrected;
        self.corrected_ddl.clone_from(&self.source_ddl);
        self.updated_at = Utc::now();
    }

    /// `rewritten` replaces the corrected SQL when self-heal produced the version that applied.
    pub fn mark_validated(&mut self, rewritten: Option<String>) {
        self.status = FileStatus::Validated;
        if let Some(sql) = rewritten {
            self.corrected_ddl = Some(sql);
        }
        self.updated_at = Utc::now();
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == FileStatus::Failed
    }
}

/// Filter for listing a session's files.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileFilter {
    pub object_type: Option<ObjectType>,
    pub status: Option<FileStatus>,
}

impl FileFilter {
    #[must_use]
    pub fn matches(&self, file: &MigrationFile) -> bool {
        self.object_type.is_none_or(|t| t == file.object_type)
            && self.status.is_none_or(|s| s == file.status)
    }
}
