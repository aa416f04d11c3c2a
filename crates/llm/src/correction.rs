//! Prompts for converting Oracle DDL and repairing statements rejected by
//! the target database.

use ora2pg_assist_core::ObjectType;

use crate::client::{Completion, LlmClient};
use crate::error::LlmError;

const CONVERSION_SYSTEM_PROMPT: &str = "You are an expert in Oracle to PostgreSQL migration. \
You receive DDL or PL/SQL that was produced by an automated Oracle export and rewrite it as \
valid PostgreSQL. Respond with SQL only, without explanations or markdown.";

const CONVERSION_RULES: &str = "\
- Replace NVL with COALESCE
- Replace DBMS_OUTPUT.PUT_LINE with RAISE NOTICE
- Replace DECODE with CASE expressions
- Replace SYSDATE with CURRENT_TIMESTAMP
- Replace TO_DATE with TO_TIMESTAMP where a time component is involved
- Replace CONNECT BY hierarchies with WITH RECURSIVE
- Map NUMBER to NUMERIC or INTEGER, VARCHAR2 to VARCHAR, CLOB to TEXT, BLOB to BYTEA
- Keep object names and column order unchanged
- Every statement must end with a semicolon";

const DEPENDENCY_SYSTEM_PROMPT: &str = "You are a PostgreSQL schema engineer. A migration \
statement failed because a relation it references does not exist. Generate the missing \
CREATE TABLE or CREATE TYPE statement so the failing statement can succeed. Infer column \
names and types from how the statement uses them. Respond with SQL only.";

const FIX_SYSTEM_PROMPT: &str = "You are a PostgreSQL expert. A statement failed when applied \
to PostgreSQL. Rewrite it so it executes successfully, adding explicit casts where types \
do not match. Keep the intent of the statement. Respond with SQL only.";

impl LlmClient {
    /// Converts exported Oracle source for one object to PostgreSQL.
    ///
    /// # Errors
    /// Returns an error if the provider call fails or yields no SQL.
    pub async fn correct_sql(
        &self,
        source_sql: &str,
        object_type: ObjectType,
    ) -> Result<Completion, LlmError> {
        let prompt = format!(
            "Convert the following {object_type} definition from Oracle to PostgreSQL.\n\n\
             Rules:\n{CONVERSION_RULES}\n\n\
             Provide only the corrected SQL code.\n\n\
             SQL:\n{source_sql}"
        );
        tracing::debug!(%object_type, bytes = source_sql.len(), "requesting AI conversion");
        self.complete(CONVERSION_SYSTEM_PROMPT, &prompt).await
    }

    /// Generates DDL for a relation that `failed_sql` references but the
    /// target does not have.
    ///
    /// # Errors
    /// Returns an error if the provider call fails or yields no SQL.
    pub async fn synthesize_dependency_ddl(
        &self,
        failed_sql: &str,
        error: &str,
    ) -> Result<Completion, LlmError> {
        let prompt = format!(
            "The following statement failed on PostgreSQL.\n\n\
             Error:\n{error}\n\n\
             Statement:\n{failed_sql}\n\n\
             Provide only the CREATE statement for the missing object."
        );
        self.complete(DEPENDENCY_SYSTEM_PROMPT, &prompt).await
    }

    /// Asks for a rewritten statement after the target rejected `sql`.
    ///
    /// # Errors
    /// Returns an error if the provider call fails or yields no SQL.
    pub async fn fix_sql(&self, sql: &str, error: &str) -> Result<Completion, LlmError> {
        let prompt = format!(
            "PostgreSQL rejected this statement.\n\n\
             Error:\n{error}\n\n\
             Statement:\n{sql}\n\n\
             Provide only the corrected SQL code."
        );
        self.complete(FIX_SYSTEM_PROMPT, &prompt).await
    }
}
