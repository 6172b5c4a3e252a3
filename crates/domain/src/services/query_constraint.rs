//! Textual constraint injection for generated SQL.
//!
//! This is string surgery, not a SQL parser. It handles flat single-table and
//! joined `SELECT`s and can misplace predicates in subqueries, CTEs, multiple
//! statements or string literals that contain keywords. Callers that execute
//! the result must re-check it with [`missing_filters`] and refuse to run
//! anything that still lacks a required filter. Statements from scoped
//! callers must also pass [`check_scope`], which refuses the shapes this
//! module cannot constrain.

use lazy_static::lazy_static;
use regex::{Match, Regex};
use thiserror::Error;

use super::access::{AccessConstraint, RequiredFilter};

/// Tables whose rows are scoped by diocese or testing center.
pub const PROTECTED_TABLES: [&str; 4] = ["testing_centers", "students", "test_results", "users"];

/// Tables a scoped caller may read.
pub const READABLE_TABLES: [&str; 5] = [
    "dioceses",
    "testing_centers",
    "students",
    "test_results",
    "users",
];

/// Columns of `users` visible to scoped statements.
const USERS_VISIBLE_COLUMNS: &str =
    "id, email, username, role, diocese_id, testing_center_id, created_at, updated_at";

lazy_static! {
    static ref PROTECTED_TABLE_RE: Regex =
        Regex::new(r"(?i)\b(?:testing_centers|students|test_results|users)\b").unwrap();
    static ref WHERE_RE: Regex = Regex::new(r"(?i)\bwhere\b").unwrap();
    static ref AND_RE: Regex = Regex::new(r"(?i)\band\b").unwrap();
    static ref OR_RE: Regex = Regex::new(r"(?i)\bor\b").unwrap();
    static ref FROM_OR_JOIN_RE: Regex = Regex::new(r"(?i)\b(?:from|join)\b").unwrap();
    static ref TRAILING_CLAUSE_RE: Regex =
        Regex::new(r"(?i)\b(?:group\s+by|order\s+by|limit)\b").unwrap();
    static ref LEADING_KEYWORD_RE: Regex = Regex::new(r"(?i)^\s*(select|with)\b").unwrap();
    static ref WRITE_KEYWORD_RE: Regex = Regex::new(
        r"(?i)\b(?:insert|update|delete|merge|drop|alter|create|truncate|grant|revoke|copy|vacuum|call|do|set|lock)\b"
    )
    .unwrap();
    static ref SELECT_RE: Regex = Regex::new(r"(?i)\bselect\b").unwrap();
    static ref LEADING_WITH_RE: Regex = Regex::new(r"(?i)^\s*with\b").unwrap();
    static ref SET_OPERATION_RE: Regex = Regex::new(r"(?i)\b(?:union|intersect|except)\b").unwrap();
    static ref TABLE_REF_RE: Regex = Regex::new(
        r#"(?i)\b(?:from|join)\s+("?[a-z_][a-z0-9_$]*"?(?:\s*\.\s*"?[a-z_][a-z0-9_$]*"?)*)"#
    )
    .unwrap();
    static ref COMMA_JOIN_RE: Regex = Regex::new(
        r#"(?i)\bfrom\s+"?[a-z_][a-z0-9_."]*(?:\s+(?:as\s+)?[a-z_][a-z0-9_]*)?\s*,"#
    )
    .unwrap();
    static ref SENSITIVE_NAME_RE: Regex = Regex::new(
        r"(?i)\b(?:chats|sessions|password_hash|provider_subject|information_schema|pg_[a-z0-9_]*|current_setting|set_config|dblink[a-z0-9_]*)\b"
    )
    .unwrap();
}

/// Result of [`apply_constraints`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub sql: String,
    /// Filters that were spliced in by this call.
    pub injected: Vec<RequiredFilter>,
}

/// Why a scoped caller's statement cannot be run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeViolation {
    #[error("subqueries, CTEs and set operations cannot be restricted to a scope")]
    NestedQuery,

    #[error("comma-separated FROM lists cannot be restricted to a scope; use JOIN")]
    ImplicitJoin,

    #[error("table {0} is not available")]
    TableNotAllowed(String),

    #[error("{0} is not available")]
    SensitiveName(String),
}

/// Injects the constraint's required filters into `sql`.
///
/// Returns `sql` unchanged when the constraint is unrestricted or the
/// statement names no protected table. Never fails.
pub fn inject_constraints(sql: &str, constraint: &AccessConstraint) -> String {
    apply_constraints(sql, constraint).sql
}

/// Same as [`inject_constraints`], also reporting what was injected.
pub fn apply_constraints(sql: &str, constraint: &AccessConstraint) -> Injection {
    if !constraint.has_constraints || !touches_protected_table(sql) {
        return Injection {
            sql: sql.to_string(),
            injected: Vec::new(),
        };
    }

    let mut current = sql.to_string();
    let mut injected = Vec::new();

    for filter in constraint.filters() {
        if filter_enforced(&current, &filter) {
            continue;
        }
        if let Some(next) = splice_predicate(&current, &filter.predicate()) {
            current = next;
            injected.push(filter);
        } else {
            tracing::debug!(column = filter.column, "No FROM or JOIN to attach filter to");
        }
    }

    Injection {
        sql: current,
        injected,
    }
}

/// Required filters that `sql` does not enforce.
///
/// A filter counts only as a top-level `AND` term of the outer `WHERE`, so
/// `diocese_id = 5 OR grade = 4` does not satisfy `diocese_id = 5`. Empty
/// when the constraint is unrestricted or no protected table is named.
pub fn missing_filters(sql: &str, constraint: &AccessConstraint) -> Vec<RequiredFilter> {
    if !constraint.has_constraints || !touches_protected_table(sql) {
        return Vec::new();
    }
    constraint
        .filters()
        .into_iter()
        .filter(|f| !filter_enforced(sql, f))
        .collect()
}

/// Whether `sql` is a single `SELECT` or `WITH` statement with no
/// data-modifying keywords.
pub fn is_read_only(sql: &str) -> bool {
    let trimmed = sql.trim();
    let body = trimmed.strip_suffix(';').unwrap_or(trimmed);

    if body.trim().is_empty() || body.contains(';') {
        return false;
    }
    LEADING_KEYWORD_RE.is_match(body) && !WRITE_KEYWORD_RE.is_match(body)
}

/// Whether the statement names any protected table.
pub fn touches_protected_table(sql: &str) -> bool {
    PROTECTED_TABLE_RE.is_match(sql)
}

/// Refuses statements a scoped caller may not run.
///
/// Only flat statements over [`READABLE_TABLES`] pass, and none may name
/// chats, sessions, credential columns or catalog objects. Unrestricted
/// callers always pass.
pub fn check_scope(sql: &str, constraint: &AccessConstraint) -> Result<(), ScopeViolation> {
    if !constraint.has_constraints {
        return Ok(());
    }

    if let Some(name) = SENSITIVE_NAME_RE.find(sql) {
        return Err(ScopeViolation::SensitiveName(
            name.as_str().to_ascii_lowercase(),
        ));
    }

    if SELECT_RE.find_iter(sql).count() > 1
        || LEADING_WITH_RE.is_match(sql)
        || SET_OPERATION_RE.is_match(sql)
    {
        return Err(ScopeViolation::NestedQuery);
    }

    if top_level(sql, &COMMA_JOIN_RE).next().is_some() {
        return Err(ScopeViolation::ImplicitJoin);
    }

    match referenced_tables(sql)
        .into_iter()
        .find(|table| !READABLE_TABLES.contains(&table.as_str()))
    {
        Some(table) => Err(ScopeViolation::TableNotAllowed(table)),
        None => Ok(()),
    }
}

/// Rebinds `users` to a projection without credential columns, so neither
/// `*` nor whole-row references can read them.
///
/// Only meaningful for statements that passed [`check_scope`].
pub fn hide_credentials(sql: &str) -> String {
    if !referenced_tables(sql).iter().any(|t| t == "users") {
        return sql.to_string();
    }
    format!(
        "WITH users AS (SELECT {} FROM users) {}",
        USERS_VISIBLE_COLUMNS, sql
    )
}

/// Tables named right after a top-level `FROM` or `JOIN`, unquoted and
/// lowercased, schema kept.
fn referenced_tables(sql: &str) -> Vec<String> {
    TABLE_REF_RE
        .captures_iter(sql)
        .filter(|caps| {
            caps.get(0)
                .map_or(false, |m| paren_depth(sql, m.start()) == 0)
        })
        .filter_map(|caps| caps.get(1))
        .map(|name| {
            name.as_str()
                .chars()
                .filter(|c| *c != '"' && !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .collect()
}

fn paren_depth(sql: &str, pos: usize) -> i32 {
    sql[..pos].bytes().fold(0, |depth, b| match b {
        b'(' => depth + 1,
        b')' => depth - 1,
        _ => depth,
    })
}

/// Matches of `re` outside any parentheses.
fn top_level<'a>(sql: &'a str, re: &'a Regex) -> impl Iterator<Item = Match<'a>> + 'a {
    re.find_iter(sql)
        .filter(move |m| paren_depth(sql, m.start()) == 0)
}

fn statement_end(sql: &str) -> usize {
    sql.trim_end().trim_end_matches(';').trim_end().len()
}

/// End of the clause starting at `from`: the first top-level `GROUP BY`,
/// `ORDER BY` or `LIMIT` after it, else the end of the statement.
fn clause_end(sql: &str, from: usize) -> usize {
    let end = statement_end(sql);
    top_level(sql, &TRAILING_CLAUSE_RE)
        .map(|m| m.start())
        .find(|&start| start >= from && start < end)
        .unwrap_or(end)
        .max(from)
}

/// Matches `col = N` or `alias.col = N` as a top-level `AND` term of the
/// outer `WHERE`. `diocese_id = 51` does not satisfy `diocese_id = 5`.
fn filter_enforced(sql: &str, filter: &RequiredFilter) -> bool {
    let Some(where_kw) = top_level(sql, &WHERE_RE).next() else {
        return false;
    };
    let condition = &sql[where_kw.end()..clause_end(sql, where_kw.end())];

    let pattern = format!(
        r"(?i)^(?:[a-z_][a-z0-9_]*\.)?{}\s*=\s*{}$",
        regex::escape(filter.column),
        regex::escape(&filter.value.to_string())
    );
    match Regex::new(&pattern) {
        Ok(equality) => conjunct_matches(condition, &equality),
        Err(_) => false,
    }
}

fn conjunct_matches(condition: &str, equality: &Regex) -> bool {
    if top_level(condition, &OR_RE).next().is_some() {
        return false;
    }
    split_top_level(condition, &AND_RE).into_iter().any(|term| {
        let inner = strip_outer_parens(term);
        equality.is_match(inner)
            || (inner.len() < term.trim().len() && conjunct_matches(inner, equality))
    })
}

fn split_top_level<'a>(text: &'a str, separator: &Regex) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for m in top_level(text, separator) {
        parts.push(&text[start..m.start()]);
        start = m.end();
    }
    parts.push(&text[start..]);
    parts
}

fn strip_outer_parens(text: &str) -> &str {
    let mut inner = text.trim();
    while inner.starts_with('(') && inner.ends_with(')') && encloses_whole(inner) {
        inner = inner[1..inner.len() - 1].trim();
    }
    inner
}

/// Whether the parenthesis opening `text` closes at its last byte.
fn encloses_whole(text: &str) -> bool {
    let mut depth = 0;
    for (i, b) in text.bytes().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return i == text.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// Adds `predicate` to the outer `WHERE` as `WHERE <pred> AND (<condition>)`,
/// or opens a `WHERE` after the last top-level `FROM`/`JOIN`.
fn splice_predicate(sql: &str, predicate: &str) -> Option<String> {
    if let Some(where_kw) = top_level(sql, &WHERE_RE).next() {
        let end = clause_end(sql, where_kw.end());
        let condition = sql[where_kw.end()..end].trim();
        let tail = sql[end..].trim_start();
        let separator = if tail.is_empty() || tail.starts_with(';') {
            ""
        } else {
            " "
        };
        return Some(format!(
            "{} {} AND ({}){}{}",
            &sql[..where_kw.end()],
            predicate,
            condition,
            separator,
            tail
        ));
    }

    let last_source = top_level(sql, &FROM_OR_JOIN_RE).last()?;
    let pos = clause_end(sql, last_source.end());

    Some(format!(
        "{} WHERE {} {}",
        sql[..pos].trim_end(),
        predicate,
        &sql[pos..]
    ))
}
