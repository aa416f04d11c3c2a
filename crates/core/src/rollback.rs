use serde::{Deserialize, Serialize};

use crate::file::{FileStatus, MigrationFile};
use crate::object_type::ObjectType;

/// One DROP statement undoing an applied object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RollbackRecord {
    pub object_name: String,
    pub object_type: ObjectType,
    pub table: Option<String>,
    pub drop_statement: String,
}

impl RollbackRecord {
    #[must_use]
    pub fn for_file(file: &MigrationFile) -> Self {
        let table = if file.object_type.drops_on_table() { file.parent_table.clone() } else { None };
        let drop_statement = drop_statement(file.object_type, &file.object_name, table.as_deref());
        Self {
            object_name: file.object_name.clone(),
            object_type: file.object_type,
            table: file.parent_table.clone(),
            drop_statement,
        }
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[must_use]
pub fn drop_statement(object_type: ObjectType, name: &str, on_table: Option<&str>) -> String {
    let mut stmt = format!("DROP {} IF EXISTS {}", object_type.drop_keyword(), quote_ident(name));
    if let Some(table) = on_table {
        stmt.push_str(" ON ");
        stmt.push_str(&quote_ident(table));
    }
    stmt.push_str(" CASCADE;");
    stmt
}

/// Validated files in drop order: dependents before their dependencies.
///
/// Creation order is type rank first, then the file's ordinal, so the
/// reverse of both is the drop order.
#[must_use]
pub fn rollback_plan(files: &[MigrationFile]) -> Vec<RollbackRecord> {
    let mut applied: Vec<&MigrationFile> =
        files.iter().filter(|f| f.status == FileStatus::Validated).collect();
    applied.sort_by(|a, b| {
        (b.object_type.creation_rank(), b.ordinal).cmp(&(a.object_type.creation_rank(), a.ordinal))
    });
    applied.into_iter().map(RollbackRecord::for_file).collect()
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn validated(ordinal: u32, name: &str, object_type: ObjectType, parent: Option<&str>) -> MigrationFile {
        let mut file = MigrationFile::new(
            Uuid::nil(),
            ordinal,
            name.to_owned(),
            object_type,
            parent.map(ToOwned::to_owned),
        );
        file.mark_validated(None);
        file
    }

    #[test]
    fn index_drops_before_its_table() {
        let files = vec![
            validated(0, "a", ObjectType::Table, None),
            validated(1, "b", ObjectType::Index, Some("a")),
        ];
        let plan = rollback_plan(&files);
        assert_eq!(plan[0].object_name, "b");
        assert_eq!(plan[1].object_name, "a");
        assert_eq!(plan[1].drop_statement, "DROP TABLE IF EXISTS \"a\" CASCADE;");
    }

    #[test]
    fn trigger_names_its_table() {
        let files = vec![validated(0, "trg_audit", ObjectType::Trigger, Some("emp"))];
        let plan = rollback_plan(&files);
        assert_eq!(plan[0].drop_statement, "DROP TRIGGER IF EXISTS \"trg_audit\" ON \"emp\" CASCADE;");
        assert_eq!(plan[0].table.as_deref(), Some("emp"));
    }

    #[test]
    fn skips_unvalidated_files() {
        let mut failed = MigrationFile::new(Uuid::nil(), 1, "v".to_owned(), ObjectType::View, None);
        failed.mark_failed(crate::FailureKind::Sql, "syntax error");
        let files = vec![validated(0, "t", ObjectType::Table, None), failed];
        assert_eq!(rollback_plan(&files).len(), 1);
    }

    #[test]
    fn package_drops_schema() {
        assert_eq!(
            drop_statement(ObjectType::Package, "pkg_hr", None),
            "DROP SCHEMA IF EXISTS \"pkg_hr\" CASCADE;"
        );
    }
}
