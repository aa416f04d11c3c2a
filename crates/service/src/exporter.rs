//! Schema discovery and per-object DDL export.
//!
//! The production implementation drives the `ora2pg` executable. Each call
//! writes a configuration file that lives only as long as the ora2pg process,
//! since it carries the Oracle password, and parses the generated SQL file.
//!
//! Discovery runs one full export per ora2pg export type. An object only
//! counts as found by the run of its own type, so every discovered object
//! can be exported again through that same run.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use ora2pg_assist_core::ddl::{parse_export, strip_psql_meta};
use ora2pg_assist_core::{ClientConfig, ObjectType};
use ora2pg_assist_llm::truncate;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::process::Command;

/// Markers in ora2pg output that mean the source database could not be reached.
const CONNECTION_MARKERS: [&str; 7] = [
    "ORA-12541",
    "ORA-12514",
    "ORA-12170",
    "ORA-01017",
    "TNS:",
    "DBI connect",
    "Cannot connect",
];

/// One object found in the source schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveredObject {
    pub name: String,
    pub object_type: ObjectType,
    /// False for objects the run will not migrate.
    pub supported: bool,
    /// Owning table for indexes and triggers.
    pub parent_table: Option<String>,
}

#[derive(Debug, Error)]
pub enum ExportError {
    /// Source database unreachable or credentials rejected. Fatal to the session.
    #[error("source connection failed: {0}")]
    Connection(String),
    /// The export tool could not be run or exited with an error.
    #[error("ora2pg failed: {0}")]
    Tool(String),
    /// The tool ran but produced nothing usable for one object.
    #[error("export of {name} failed: {message}")]
    Object { name: String, message: String },
}

impl ExportError {
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

#[async_trait]
pub trait SchemaExporter: Send + Sync {
    /// Lists objects of the given types. `workdir` exists and belongs to the session.
    async fn discover(
        &self,
        config: &ClientConfig,
        types: &[ObjectType],
        workdir: &Path,
    ) -> Result<Vec<DiscoveredObject>, ExportError>;

    /// Returns the DDL text for one discovered object.
    async fn export(
        &self,
        config: &ClientConfig,
        object: &DiscoveredObject,
        workdir: &Path,
    ) -> Result<String, ExportError>;
}

/// Runs the `ora2pg` command line tool.
#[derive(Debug, Clone)]
pub struct Ora2PgExporter {
    bin: String,
}

impl Ora2PgExporter {
    #[must_use]
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// Writes the ora2pg configuration to a private temporary file in
    /// `workdir`. The file is deleted when the handle drops.
    async fn write_conf(config: &ClientConfig, workdir: &Path) -> Result<NamedTempFile, ExportError> {
        let mut conf = format!(
            "ORACLE_DSN\t{}\nORACLE_USER\t{}\nORACLE_PWD\t{}\n",
            config.oracle_dsn, config.oracle_user, config.oracle_password
        );
        if let Some(schema) = config.oracle_schema.as_deref().filter(|s| !s.is_empty()) {
            conf.push_str(&format!("SCHEMA\t{schema}\n"));
        }
        conf.push_str("STOP_ON_ERROR\t0\n");
        let file = tempfile::Builder::new()
            .prefix("ora2pg-")
            .suffix(".conf")
            .tempfile_in(workdir)
            .map_err(|e| ExportError::Tool(format!("cannot create config in {}: {e}", workdir.display())))?;
        tokio::fs::write(file.path(), conf)
            .await
            .map_err(|e| ExportError::Tool(format!("cannot write {}: {e}", file.path().display())))?;
        Ok(file)
    }

    /// Runs one export and returns the generated file's content.
    async fn run_export(
        &self,
        config: &ClientConfig,
        export_type: &str,
        allow: Option<&str>,
        output_name: &str,
        workdir: &Path,
    ) -> Result<String, ExportError> {
        let conf = Self::write_conf(config, workdir).await?;
        let mut command = Command::new(&self.bin);
        command
            .arg("-c")
            .arg(conf.path())
            .args(["-t", export_type])
            .arg("-b")
            .arg(workdir)
            .args(["-o", output_name])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(allow) = allow {
            command.args(["-a", allow]);
        }

        tracing::debug!(bin = %self.bin, export_type, allow, "running ora2pg");
        let output = command
            .output()
            .await
            .map_err(|e| ExportError::Tool(format!("cannot launch {}: {e}", self.bin)))?;
        if let Err(e) = conf.close() {
            tracing::warn!(error = %e, "could not remove ora2pg config file");
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let combined = format!("{stderr}\n{stdout}");
            if CONNECTION_MARKERS.iter().any(|m| combined.contains(m)) {
                return Err(ExportError::Connection(truncate(combined.trim(), 500).to_owned()));
            }
            return Err(ExportError::Tool(format!(
                "exit status {}: {}",
                output.status,
                truncate(combined.trim(), 500)
            )));
        }

        let path = workdir.join(output_name);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ExportError::Tool(format!("cannot read {}: {e}", path.display())))
    }
}

fn file_stem(name: &str) -> String {
    name.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect()
}

#[async_trait]
impl SchemaExporter for Ora2PgExporter {
    async fn discover(
        &self,
        config: &ClientConfig,
        types: &[ObjectType],
        workdir: &Path,
    ) -> Result<Vec<DiscoveredObject>, ExportError> {
        let mut export_types: Vec<&'static str> =
            types.iter().map(|t| t.ora2pg_export_type()).collect();
        export_types.sort_unstable();
        export_types.dedup();

        let mut objects: Vec<DiscoveredObject> = Vec::new();
        for export_type in export_types {
            let output_name = format!("discover_{}.sql", export_type.to_ascii_lowercase());
            let content = self.run_export(config, export_type, None, &output_name, workdir).await?;
            for parsed in parse_export(&content, export_type) {
                let exists = objects.iter().any(|o| {
                    o.object_type == parsed.object_type
                        && o.name.eq_ignore_ascii_case(&parsed.object_name)
                });
                if exists {
                    continue;
                }
                objects.push(DiscoveredObject {
                    supported: types.contains(&parsed.object_type),
                    name: parsed.object_name,
                    object_type: parsed.object_type,
                    parent_table: parsed.parent_table,
                });
            }
        }
        Ok(objects)
    }

    async fn export(
        &self,
        config: &ClientConfig,
        object: &DiscoveredObject,
        workdir: &Path,
    ) -> Result<String, ExportError> {
        // Indexes come out of the TABLE export, filtered by their table.
        let allow = match object.object_type {
            ObjectType::Index => object.parent_table.as_deref().unwrap_or(&object.name),
            _ => &object.name,
        };
        let export_type = object.object_type.ora2pg_export_type();
        let output_name = format!("{}_{}.sql", export_type.to_ascii_lowercase(), file_stem(&object.name));
        let content = self.run_export(config, export_type, Some(allow), &output_name, workdir).await?;

        parse_export(&content, export_type)
            .into_iter()
            .find(|p| p.object_type == object.object_type && p.object_name.eq_ignore_ascii_case(&object.name))
            .map(|p| strip_psql_meta(&p.ddl))
            .filter(|ddl| !ddl.is_empty())
            .ok_or_else(|| ExportError::Object {
                name: object.name.clone(),
                message: "ora2pg produced no DDL for this object".to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_replaces_separators() {
        assert_eq!(file_stem("HR.EMP$LOG"), "HR_EMP_LOG");
    }

    fn no_config_left(dir: &Path) -> bool {
        std::fs::read_dir(dir)
            .unwrap()
            .all(|entry| !entry.unwrap().file_name().to_string_lossy().ends_with(".conf"))
    }

    #[tokio::test]
    async fn missing_binary_is_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Ora2PgExporter::new("/nonexistent/ora2pg-assist-test-bin");
        let err = exporter
            .discover(&ClientConfig::default(), &[ObjectType::Table], dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Tool(_)), "got {err:?}");
        assert!(!err.is_connection());
        assert!(no_config_left(dir.path()));
    }

    #[tokio::test]
    async fn conf_omits_empty_schema_and_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            oracle_dsn: "dbi:Oracle:host=db;sid=ORCL".to_owned(),
            oracle_user: "hr".to_owned(),
            oracle_password: "s3cret".to_owned(),
            oracle_schema: Some(String::new()),
            ..ClientConfig::default()
        };
        let file = Ora2PgExporter::write_conf(&config, dir.path()).await.unwrap();
        let path = file.path().to_path_buf();
        let conf = std::fs::read_to_string(&path).unwrap();
        assert!(conf.contains("ORACLE_DSN\tdbi:Oracle:host=db;sid=ORCL"));
        assert!(conf.contains("ORACLE_PWD\ts3cret"));
        assert!(!conf.contains("SCHEMA"));
        drop(file);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    mod scripted {
        use std::os::unix::fs::PermissionsExt;

        use super::*;

        const TABLE: &str = "CREATE TABLE emp (id integer, dept_id integer);\nCREATE INDEX idx_emp_dept ON emp (dept_id);\n";
        const FUNCTION: &str = "CREATE OR REPLACE FUNCTION calc_bonus(p numeric) RETURNS numeric AS $body$\nBEGIN\n  RETURN p * 0.1;\nEND;\n$body$\nLANGUAGE PLPGSQL;\n";
        const TRIGGER: &str = "CREATE OR REPLACE FUNCTION trigger_fct_trg_emp_audit() RETURNS trigger AS $BODY$\nBEGIN\n  RETURN NEW;\nEND\n$BODY$\nLANGUAGE 'plpgsql';\nCREATE TRIGGER trg_emp_audit\nBEFORE UPDATE ON emp\nFOR EACH ROW EXECUTE PROCEDURE trigger_fct_trg_emp_audit();\n";
        const PACKAGE: &str = "CREATE SCHEMA IF NOT EXISTS pkg_hr;\nCREATE OR REPLACE FUNCTION pkg_hr.get_salary(p_id integer) RETURNS numeric AS $body$\nBEGIN\n  RETURN 0;\nEND;\n$body$\nLANGUAGE PLPGSQL;\n";

        /// A stand-in `ora2pg` that copies `<fixtures>/<TYPE>.sql` to `-b`/`-o`,
        /// or writes an empty export for types without a fixture.
        fn fake_ora2pg(root: &Path) -> String {
            let fixtures = root.join("fixtures");
            std::fs::create_dir_all(&fixtures).unwrap();
            for (name, body) in [("TABLE", TABLE), ("FUNCTION", FUNCTION), ("TRIGGER", TRIGGER), ("PACKAGE", PACKAGE)] {
                std::fs::write(fixtures.join(format!("{name}.sql")), body).unwrap();
            }
            let script = format!(
                "#!/bin/sh\nwhile [ $# -gt 0 ]; do\n  case \"$1\" in\n    -t) t=\"$2\"; shift 2;;\n    -b) b=\"$2\"; shift 2;;\n    -o) o=\"$2\"; shift 2;;\n    *) shift;;\n  esac\ndone\ncp \"{}/$t.sql\" \"$b/$o\" 2>/dev/null || : > \"$b/$o\"\n",
                fixtures.display()
            );
            let bin = root.join("ora2pg");
            std::fs::write(&bin, script).unwrap();
            std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
            bin.to_string_lossy().into_owned()
        }

        #[tokio::test]
        async fn discovery_keeps_each_object_with_its_own_export_run() {
            let root = tempfile::tempdir().unwrap();
            let workdir = tempfile::tempdir().unwrap();
            let exporter = Ora2PgExporter::new(fake_ora2pg(root.path()));
            let config = ClientConfig::default();

            let found = exporter.discover(&config, &ObjectType::ALL, workdir.path()).await.unwrap();

            let mut names: Vec<(ObjectType, &str)> =
                found.iter().map(|o| (o.object_type, o.name.as_str())).collect();
            names.sort_unstable();
            assert_eq!(
                names,
                vec![
                    (ObjectType::Table, "emp"),
                    (ObjectType::Index, "idx_emp_dept"),
                    (ObjectType::Function, "calc_bonus"),
                    (ObjectType::Trigger, "trg_emp_audit"),
                    (ObjectType::Package, "pkg_hr"),
                ]
            );
            assert!(found.iter().all(|o| o.supported));
            assert!(no_config_left(workdir.path()));

            for object in &found {
                let ddl = exporter.export(&config, object, workdir.path()).await.unwrap();
                assert!(ddl.contains(&object.name), "{} missing from {ddl}", object.name);
            }
            let package = found.iter().find(|o| o.object_type == ObjectType::Package).unwrap();
            assert!(exporter.export(&config, package, workdir.path()).await.unwrap().contains("pkg_hr.get_salary"));
            let trigger = found.iter().find(|o| o.object_type == ObjectType::Trigger).unwrap();
            assert!(
                exporter
                    .export(&config, trigger, workdir.path())
                    .await
                    .unwrap()
                    .contains("FUNCTION trigger_fct_trg_emp_audit()")
            );
            assert!(no_config_left(workdir.path()));
        }
    }
}
