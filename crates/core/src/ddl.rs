//! Helpers for the DDL text produced by ora2pg and returned by the AI.

use std::sync::LazyLock;

use regex::Regex;

use crate::object_type::ObjectType;

#[expect(clippy::unwrap_used, reason = "static regex pattern is compile-time validated")]
static CREATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)^CREATE\s+(?:OR\s+REPLACE\s+)?(?:UNLOGGED\s+|UNIQUE\s+)?(MATERIALIZED\s+)?(TABLE|VIEW|INDEX|SEQUENCE|FUNCTION|PROCEDURE|TRIGGER|TYPE|SCHEMA)\s+(?:CONCURRENTLY\s+)?(?:IF\s+NOT\s+EXISTS\s+)?(?:"?\w+"?\.)?["']?(\w+)["']?"#,
    )
    .unwrap()
});

#[expect(clippy::unwrap_used, reason = "static regex pattern is compile-time validated")]
static ON_TABLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bON\s+(?:"?\w+"?\.)?"?(\w+)"?"#).unwrap());

#[expect(clippy::unwrap_used, reason = "static regex pattern is compile-time validated")]
static DOLLAR_QUOTE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\w*\$").unwrap());

#[expect(clippy::unwrap_used, reason = "static regex pattern is compile-time validated")]
static MISSING_RELATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)relation "(?:\w+\.)?(\w+)" does not exist"#).unwrap());

#[expect(clippy::unwrap_used, reason = "static regex pattern is compile-time validated")]
static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// A single CREATE statement cut out of a multi-statement file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedObject {
    pub object_name: String,
    pub object_type: ObjectType,
    /// Table an index or trigger is created on.
    pub parent_table: Option<String>,
    pub ddl: String,
    /// 1-indexed, inclusive.
    pub line_start: usize,
    pub line_end: usize,
}

fn paren_delta(line: &str) -> i64 {
    line.chars().fold(0, |acc, c| match c {
        '(' => acc + 1,
        ')' => acc - 1,
        _ => acc,
    })
}

fn match_create(line: &str) -> Option<(ObjectType, String)> {
    let caps = CREATE_REGEX.captures(line)?;
    let object_type = match caps.get(2)?.as_str().to_ascii_uppercase().as_str() {
        "VIEW" if caps.get(1).is_some() => ObjectType::MaterializedView,
        "VIEW" => ObjectType::View,
        "TABLE" => ObjectType::Table,
        "INDEX" => ObjectType::Index,
        "SEQUENCE" => ObjectType::Sequence,
        "FUNCTION" => ObjectType::Function,
        "PROCEDURE" => ObjectType::Procedure,
        "TRIGGER" => ObjectType::Trigger,
        "TYPE" => ObjectType::Type,
        // ora2pg turns each Oracle package into a schema holding its members.
        "SCHEMA" => ObjectType::Package,
        _ => return None,
    };
    Some((object_type, caps.get(3)?.as_str().to_lowercase()))
}

fn is_skippable(stripped: &str) -> bool {
    stripped.is_empty()
        || stripped.starts_with("--")
        || stripped.starts_with('\\')
        || stripped.to_ascii_uppercase().starts_with("SET ")
}

struct Pending {
    object_type: ObjectType,
    object_name: String,
    line_start: usize,
    lines: Vec<String>,
    depth: i64,
    dollar_quotes: usize,
}

impl Pending {
    fn finish(self, line_end: usize) -> ParsedObject {
        let ddl = self.lines.join("\n");
        let parent_table = matches!(self.object_type, ObjectType::Index | ObjectType::Trigger)
            .then(|| extract_on_table(&ddl))
            .flatten();
        ParsedObject {
            object_name: self.object_name,
            object_type: self.object_type,
            parent_table,
            ddl,
            line_start: self.line_start,
            line_end,
        }
    }

    /// Complete once parentheses balance, dollar quotes pair up and the line ends with `;`.
    fn is_complete(&self, stripped: &str) -> bool {
        self.depth <= 0 && self.dollar_quotes % 2 == 0 && stripped.ends_with(';')
    }
}

/// Splits a combined ora2pg output file into its CREATE statements.
///
/// Comments, blank lines, `SET` lines and psql meta-commands between
/// statements are dropped. An unterminated statement at end of input is kept.
#[must_use]
pub fn parse_ddl_file(content: &str) -> Vec<ParsedObject> {
    let mut objects = Vec::new();
    let mut current: Option<Pending> = None;
    let mut last_line = 0;

    for (idx, line) in content.lines().enumerate() {
        let line_num = idx + 1;
        last_line = line_num;
        let stripped = line.trim();

        let mut pending = match current.take() {
            Some(mut pending) => {
                pending.lines.push(line.to_owned());
                pending.depth += paren_delta(line);
                pending.dollar_quotes += DOLLAR_QUOTE_REGEX.find_iter(line).count();
                pending
            },
            None => {
                if is_skippable(stripped) {
                    continue;
                }
                let Some((object_type, object_name)) = match_create(stripped) else {
                    continue;
                };
                Pending {
                    object_type,
                    object_name,
                    line_start: line_num,
                    lines: vec![line.to_owned()],
                    depth: paren_delta(line),
                    dollar_quotes: DOLLAR_QUOTE_REGEX.find_iter(line).count(),
                }
            },
        };

        if pending.is_complete(stripped) {
            let parsed = pending.finish(line_num);
            tracing::debug!(
                object_type = %parsed.object_type,
                object = %parsed.object_name,
                line_start = parsed.line_start,
                line_end = parsed.line_end,
                "Parsed DDL object"
            );
            objects.push(parsed);
        } else {
            current = Some(pending);
        }
    }

    if let Some(pending) = current {
        objects.push(pending.finish(last_line));
    }
    objects
}

/// Parses the output of one `ora2pg -t <export_type>` run into the objects
/// that run exports.
///
/// Statements of other kinds travel with the object they belong to. In a
/// `PACKAGE` export, member functions and procedures are appended to the
/// preceding package schema. In a `TRIGGER` export, the `trigger_fct_*`
/// helper functions are prepended to the trigger that follows them. Anything
/// else outside the run's type is dropped.
#[must_use]
pub fn parse_export(content: &str, export_type: &str) -> Vec<ParsedObject> {
    let package_run = export_type == ObjectType::Package.ora2pg_export_type();
    let trigger_run = export_type == ObjectType::Trigger.ora2pg_export_type();
    let mut owned: Vec<ParsedObject> = Vec::new();
    let mut helpers: Vec<String> = Vec::new();

    for mut parsed in parse_ddl_file(content) {
        if parsed.object_type.ora2pg_export_type() == export_type {
            if !helpers.is_empty() {
                helpers.push(parsed.ddl);
                parsed.ddl = helpers.join("\n\n");
                helpers.clear();
            }
            owned.push(parsed);
            continue;
        }
        match owned.last_mut() {
            Some(package) if package_run => {
                package.ddl.push_str("\n\n");
                package.ddl.push_str(&parsed.ddl);
                package.line_end = parsed.line_end;
            },
            _ if trigger_run => helpers.push(parsed.ddl),
            _ => tracing::debug!(
                export_type,
                object_type = %parsed.object_type,
                object = %parsed.object_name,
                "statement outside the export type dropped"
            ),
        }
    }
    owned
}

/// Removes psql meta-commands and session `SET` lines that only make sense inside psql.
#[must_use]
pub fn strip_psql_meta(sql: &str) -> String {
    sql.lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            let upper = trimmed.to_ascii_uppercase();
            !(trimmed.starts_with('\\')
                || upper.starts_with("SET CLIENT_ENCODING")
                || upper.starts_with("SET CHECK_FUNCTION_BODIES")
                || upper.starts_with("SET STANDARD_CONFORMING_STRINGS")
                || upper.starts_with("SET SEARCH_PATH"))
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}

/// Strips a markdown code fence (```` ```sql ... ``` ````) around AI output.
#[must_use]
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    if trimmed.starts_with("```") && trimmed.ends_with("```") && trimmed.len() >= 6 {
        let without_prefix = trimmed.strip_prefix("```").unwrap_or(trimmed);
        let without_suffix = without_prefix.strip_suffix("```").unwrap_or(without_prefix);
        return without_suffix
            .split_once('\n')
            .map_or_else(|| without_suffix.trim(), |(_, rest)| rest.trim());
    }
    trimmed
}

/// Whitespace-collapsed form used for cache keys.
#[must_use]
pub fn normalize_ddl(ddl: &str) -> String {
    WHITESPACE_REGEX.replace_all(ddl.trim(), " ").into_owned()
}

/// Name of the relation a PostgreSQL "does not exist" error refers to.
#[must_use]
pub fn missing_relation(error: &str) -> Option<String> {
    MISSING_RELATION_REGEX.captures(error).and_then(|c| c.get(1)).map(|m| m.as_str().to_owned())
}

/// Table named by the first `ON <table>` clause.
#[must_use]
pub fn extract_on_table(ddl: &str) -> Option<String> {
    ON_TABLE_REGEX.captures(ddl).and_then(|c| c.get(1)).map(|m| m.as_str().to_lowercase())
}
