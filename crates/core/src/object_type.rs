//! Schema object kinds and their dependency ordering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Kind of source-schema object carried through a migration.
///
/// Declaration order is creation order: objects earlier in the list are
/// depended upon by objects later in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectType {
    Type,
    Sequence,
    Table,
    Index,
    View,
    MaterializedView,
    Function,
    Procedure,
    Trigger,
    Package,
}

impl ObjectType {
    pub const ALL: [Self; 10] = [
        Self::Type,
        Self::Sequence,
        Self::Table,
        Self::Index,
        Self::View,
        Self::MaterializedView,
        Self::Function,
        Self::Procedure,
        Self::Trigger,
        Self::Package,
    ];

    /// Position in creation order. Lower ranks are created first and dropped last.
    #[must_use]
    pub const fn creation_rank(self) -> u8 {
        match self {
            Self::Type => 0,
            Self::Sequence => 1,
            Self::Table => 2,
            Self::Index => 3,
            Self::View => 4,
            Self::MaterializedView => 5,
            Self::Function => 6,
            Self::Procedure => 7,
            Self::Trigger => 8,
            Self::Package => 9,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Type => "TYPE",
            Self::Sequence => "SEQUENCE",
            Self::Table => "TABLE",
            Self::Index => "INDEX",
            Self::View => "VIEW",
            Self::MaterializedView => "MATERIALIZED VIEW",
            Self::Function => "FUNCTION",
            Self::Procedure => "PROCEDURE",
            Self::Trigger => "TRIGGER",
            Self::Package => "PACKAGE",
        }
    }

    /// Value passed to `ora2pg -t`.
    ///
    /// Indexes have no export type of their own; they come out of a `TABLE` export.
    #[must_use]
    pub const fn ora2pg_export_type(self) -> &'static str {
        match self {
            Self::Type => "TYPE",
            Self::Sequence => "SEQUENCE",
            Self::Table | Self::Index => "TABLE",
            Self::View => "VIEW",
            Self::MaterializedView => "MVIEW",
            Self::Function => "FUNCTION",
            Self::Procedure => "PROCEDURE",
            Self::Trigger => "TRIGGER",
            Self::Package => "PACKAGE",
        }
    }

    /// Keyword used in `DROP <keyword> IF EXISTS`.
    ///
    /// Packages are migrated as schemas, so they drop as schemas.
    #[must_use]
    pub const fn drop_keyword(self) -> &'static str {
        match self {
            Self::Package => "SCHEMA",
            other => other.as_str(),
        }
    }

    /// Whether dropping this object requires naming the table it is attached to.
    #[must_use]
    pub const fn drops_on_table(self) -> bool {
        matches!(self, Self::Trigger)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "TYPE" => Ok(Self::Type),
            "SEQUENCE" => Ok(Self::Sequence),
            "TABLE" => Ok(Self::Table),
            "INDEX" => Ok(Self::Index),
            "VIEW" => Ok(Self::View),
            "MATERIALIZED VIEW" | "MVIEW" => Ok(Self::MaterializedView),
            "FUNCTION" => Ok(Self::Function),
            "PROCEDURE" => Ok(Self::Procedure),
            "TRIGGER" => Ok(Self::Trigger),
            "PACKAGE" => Ok(Self::Package),
            _ => Err(CoreError::InvalidValue { field: "object_type", value: s.to_owned() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("mview".parse::<ObjectType>().unwrap(), ObjectType::MaterializedView);
        assert_eq!("MATERIALIZED_VIEW".parse::<ObjectType>().unwrap(), ObjectType::MaterializedView);
        assert_eq!(" table ".parse::<ObjectType>().unwrap(), ObjectType::Table);
        assert!("SYNONYM".parse::<ObjectType>().is_err());
    }

    #[test]
    fn creation_rank_follows_declaration_order() {
        let mut sorted = ObjectType::ALL;
        sorted.sort_by_key(|t| t.creation_rank());
        assert_eq!(sorted, ObjectType::ALL);
        assert!(ObjectType::Table.creation_rank() < ObjectType::Index.creation_rank());
    }

    #[test]
    fn package_drops_as_schema() {
        assert_eq!(ObjectType::Package.drop_keyword(), "SCHEMA");
        assert_eq!(ObjectType::Index.drop_keyword(), "INDEX");
    }
}
