//! Read-only SQL policy.
//!
//! Free-form SQL reaches the store only as a [`SanitizedQuery`], which can
//! only be built by [`SqlPolicy::sanitize`]. Rejected input never becomes a
//! query.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::literal_regex;
use crate::error::SqlPolicyError;

/// Tables the registry tools may read.
pub const DEFAULT_ALLOWED_TABLES: [&str; 3] = ["patients", "ehvol", "patient_genomic_variants"];

/// Statement keywords that are never allowed, in any position.
pub const FORBIDDEN_KEYWORDS: [&str; 8] = [
    "DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "CREATE", "TRUNCATE", "COPY",
];

static READ_ONLY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| literal_regex(r"(?i)^(?:SELECT|WITH)\b"));

static FORBIDDEN: LazyLock<Regex> = LazyLock::new(|| {
    literal_regex(r"(?i)\b(DROP|DELETE|UPDATE|INSERT|ALTER|CREATE|TRUNCATE|COPY)\b")
});

static CTE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    literal_regex(
        r#"(?i)(?:\bWITH(?:\s+RECURSIVE)?|,)\s*["`]?([a-z_][a-z0-9_]*)["`]?\s*(?:\([^)]*\)\s*)?AS\s*\("#,
    )
});

static CITY_CATEGORY: LazyLock<Regex> = LazyLock::new(|| literal_regex(r"(?i)\bcity_category\b"));

static CITY: LazyLock<Regex> = LazyLock::new(|| literal_regex(r"(?i)\bcity\b"));

/// Keywords that end a table reference in a `FROM` list.
const CLAUSE_KEYWORDS: [&str; 25] = [
    "where", "group", "order", "limit", "offset", "having", "join", "inner", "left", "right",
    "cross", "full", "outer", "natural", "union", "except", "intersect", "window", "on",
    "using", "indexed", "not", "returning", "select", "values",
];

/// Words that open a subquery where a table name is expected.
const SUBQUERY_KEYWORDS: [&str; 3] = ["select", "with", "values"];

/// A statement that passed the policy and carries a row limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedQuery {
    sql: String,
}

impl SanitizedQuery {
    /// Returns the SQL text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.sql
    }

    /// Consumes the query, returning the SQL text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.sql
    }
}

impl fmt::Display for SanitizedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Table allow-list plus the hard row cap.
#[derive(Debug, Clone)]
pub struct SqlPolicy {
    allowed_tables: BTreeSet<String>,
    max_limit: u32,
}

impl SqlPolicy {
    /// Creates a policy over the given tables. Names are compared
    /// case-insensitively.
    pub fn new<I, S>(allowed_tables: I, max_limit: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_tables: allowed_tables
                .into_iter()
                .map(|t| t.as_ref().to_lowercase())
                .collect(),
            max_limit: max_limit.max(1),
        }
    }

    /// Policy over the registry tables.
    #[must_use]
    pub fn registry(max_limit: u32) -> Self {
        Self::new(DEFAULT_ALLOWED_TABLES, max_limit)
    }

    /// Returns the hard row cap.
    #[must_use]
    pub const fn max_limit(&self) -> u32 {
        self.max_limit
    }

    /// Validates `sql` and attaches a row limit.
    ///
    /// Without a `LIMIT` on the outer statement, `LIMIT n` is appended with
    /// `n = clamp(limit, 1, max_limit)`. An outer integer literal limit is
    /// lowered to `max_limit` when it exceeds it. Any other outer limit
    /// (negative, an expression) is capped by wrapping the statement in
    /// `SELECT * FROM (...) LIMIT n`.
    ///
    /// # Errors
    ///
    /// Returns the first [`SqlPolicyError`] the statement trips, checked in
    /// order: empty, stacked statements, comments, not read-only, forbidden
    /// keyword, disallowed table.
    pub fn sanitize(&self, sql: &str, limit: u32) -> Result<SanitizedQuery, SqlPolicyError> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(SqlPolicyError::Empty);
        }
        if sql.contains(';') {
            return Err(SqlPolicyError::MultipleStatements);
        }
        if sql.contains("--") || sql.contains("/*") || sql.contains("*/") {
            return Err(SqlPolicyError::Comment);
        }
        if !READ_ONLY_PREFIX.is_match(sql) {
            return Err(SqlPolicyError::NotReadOnly);
        }
        if let Some(caps) = FORBIDDEN.captures(sql) {
            return Err(SqlPolicyError::ForbiddenKeyword {
                keyword: caps[1].to_uppercase(),
            });
        }

        let tokens = tokenize(sql);
        let ctes = cte_names(sql);
        if let Some(table) = tables_in(&tokens)
            .into_iter()
            .find(|t| !self.allowed_tables.contains(t) && !ctes.contains(t))
        {
            return Err(SqlPolicyError::DisallowedTable { table });
        }

        Ok(SanitizedQuery {
            sql: self.apply_limit(sql, &tokens, limit),
        })
    }

    /// Keeps a trailing `LIMIT <n> [OFFSET <m>]` (lowering `n` to the cap),
    /// appends one when the outer statement has none, and wraps the
    /// statement in an outer query when its limit is anything else.
    fn apply_limit(&self, sql: &str, tokens: &[Token<'_>], limit: u32) -> String {
        let limit = limit.clamp(1, self.max_limit);
        let Some(at) = outer_limit(tokens) else {
            return format!("{sql} LIMIT {limit}");
        };

        let count = match &tokens[at + 1..] {
            [n] if n.kind == TokenKind::Number => n,
            [n, offset, m]
                if n.kind == TokenKind::Number
                    && offset.is_word("offset")
                    && m.kind == TokenKind::Number =>
            {
                n
            }
            _ => return format!("SELECT * FROM ({sql}) LIMIT {limit}"),
        };
        let n = count
            .text
            .parse::<u64>()
            .unwrap_or(u64::MAX)
            .min(u64::from(self.max_limit));
        format!("{}{n}{}", &sql[..count.start], &sql[count.end..])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Word,
    /// `"name"`, `` `name` `` or `[name]`.
    Quoted,
    /// `'text'`. SQLite also reads these as names where a name is expected.
    Str,
    Number,
    Punct(char),
}

/// A lexical token. `text` is the unquoted body, `start..end` the span in
/// the source.
#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    kind: TokenKind,
    text: &'a str,
    start: usize,
    end: usize,
}

impl Token<'_> {
    fn is_word(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }

    fn name(&self) -> Option<String> {
        match self.kind {
            TokenKind::Word | TokenKind::Quoted | TokenKind::Str => Some(self.text.to_lowercase()),
            TokenKind::Number | TokenKind::Punct(_) => None,
        }
    }
}

const fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Index of the closing byte of a quoted token starting at `i`, or the end
/// of input when it is unterminated. Doubled quotes are escapes.
fn quote_end(bytes: &[u8], mut i: usize, close: u8) -> usize {
    while i < bytes.len() {
        if bytes[i] == close {
            if close != b']' && bytes.get(i + 1) == Some(&close) {
                i += 2;
                continue;
            }
            return i;
        }
        i += 1;
    }
    bytes.len()
}

fn tokenize(sql: &str) -> Vec<Token<'_>> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let start = i;
        let (kind, text, end) = match b {
            _ if b.is_ascii_whitespace() => {
                i += 1;
                continue;
            }
            b'\'' | b'"' | b'`' | b'[' => {
                let close = if b == b'[' { b']' } else { b };
                let body_end = quote_end(bytes, i + 1, close);
                let kind = if b == b'\'' { TokenKind::Str } else { TokenKind::Quoted };
                (kind, &sql[i + 1..body_end], (body_end + 1).min(bytes.len()))
            }
            _ if b.is_ascii_digit() => {
                let mut j = i;
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                (TokenKind::Number, &sql[i..j], j)
            }
            _ if is_word_byte(b) => {
                let mut j = i;
                while j < bytes.len() && is_word_byte(bytes[j]) {
                    j += 1;
                }
                (TokenKind::Word, &sql[i..j], j)
            }
            _ => (TokenKind::Punct(char::from(b)), "", i + 1),
        };
        tokens.push(Token {
            kind,
            text,
            start,
            end,
        });
        i = end;
    }

    tokens
}

/// Position of the last `LIMIT` outside parentheses.
fn outer_limit(tokens: &[Token<'_>]) -> Option<usize> {
    let mut depth = 0_usize;
    let mut found = None;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Punct('(') => depth += 1,
            TokenKind::Punct(')') => depth = depth.saturating_sub(1),
            TokenKind::Word if depth == 0 && token.is_word("limit") => found = Some(i),
            _ => {}
        }
    }
    found
}

fn tables_in(tokens: &[Token<'_>]) -> Vec<String> {
    let mut tables = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if token.is_word("from") || token.is_word("join") {
            collect_table_list(&tokens[i + 1..], &mut tables);
        }
    }
    tables
}

/// Reads the comma-separated table references after `FROM`/`JOIN`,
/// stepping into parenthesized lists and stopping at subqueries.
fn collect_table_list(mut rest: &[Token<'_>], tables: &mut Vec<String>) {
    let mut open = 0_usize;
    loop {
        let lead = rest.iter().take_while(|t| t.is_punct('(')).count();
        open += lead;
        rest = &rest[lead..];

        let Some(first) = rest.first() else { return };
        if SUBQUERY_KEYWORDS.iter().any(|k| first.is_word(k)) {
            return;
        }
        let Some(name) = first.name() else { return };
        tables.push(name);

        // Schema qualifiers, aliases and closing parens up to the next comma.
        let mut next = 1;
        loop {
            match rest.get(next) {
                Some(t) if t.is_punct(',') => break,
                Some(t) if t.is_punct('.') => next += 1,
                Some(t) if t.is_punct(')') && open > 0 => {
                    open -= 1;
                    next += 1;
                }
                Some(t) if t.name().is_some() && !CLAUSE_KEYWORDS.iter().any(|k| t.is_word(k)) => {
                    next += 1;
                }
                _ => return,
            }
        }
        rest = &rest[next + 1..];
    }
}

/// Table names read by `FROM` and `JOIN` clauses, lowercased, in order of
/// appearance. Quoted and parenthesized references count.
#[must_use]
pub fn referenced_tables(sql: &str) -> Vec<String> {
    tables_in(&tokenize(sql))
}

fn cte_names(sql: &str) -> HashSet<String> {
    CTE_NAME
        .captures_iter(sql)
        .map(|caps| caps[1].to_lowercase())
        .collect()
}

/// Rewrites bare `city`/`city_category` identifiers to the registry's
/// `current_*` columns when the table has them.
#[must_use]
pub fn rewrite_column_aliases<'a>(sql: &'a str, columns: &HashSet<String>) -> Cow<'a, str> {
    let mut sql = Cow::Borrowed(sql);
    if columns.contains("current_city_category") && CITY_CATEGORY.is_match(&sql) {
        sql = Cow::Owned(
            CITY_CATEGORY
                .replace_all(&sql, "current_city_category")
                .into_owned(),
        );
    }
    if columns.contains("current_city") && CITY.is_match(&sql) {
        sql = Cow::Owned(CITY.replace_all(&sql, "current_city").into_owned());
    }
    sql
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn policy() -> SqlPolicy {
        SqlPolicy::registry(500)
    }

    fn accept(sql: &str, limit: u32) -> String {
        policy()
            .sanitize(sql, limit)
            .unwrap_or_else(|e| panic!("{sql:?} rejected: {e}"))
            .into_string()
    }

    #[test_case("", SqlPolicyError::Empty; "empty")]
    #[test_case("   \n", SqlPolicyError::Empty; "whitespace")]
    #[test_case("SELECT * FROM patients; DROP TABLE patients", SqlPolicyError::MultipleStatements; "stacked")]
    #[test_case("SELECT 1;", SqlPolicyError::MultipleStatements; "trailing semicolon")]
    #[test_case("SELECT name FROM/**/sqlite_master", SqlPolicyError::Comment; "comment after from")]
    #[test_case(
        "SELECT * FROM patients JOIN/**/sqlite_master",
        SqlPolicyError::Comment; "comment after join"
    )]
    #[test_case("SELECT * FROM patients -- tail", SqlPolicyError::Comment; "line comment")]
    #[test_case("SELECT 1 */", SqlPolicyError::Comment; "stray comment close")]
    #[test_case("COPY patients TO '/tmp/x.csv'", SqlPolicyError::NotReadOnly; "copy statement")]
    #[test_case("PRAGMA table_info(patients)", SqlPolicyError::NotReadOnly; "pragma")]
    #[test_case("SELECTED FROM patients", SqlPolicyError::NotReadOnly; "select prefix only")]
    #[test_case(
        "WITH x AS (DELETE FROM patients RETURNING *) SELECT * FROM x",
        SqlPolicyError::ForbiddenKeyword { keyword: "DELETE".to_string() }; "dml inside cte"
    )]
    #[test_case(
        "select * from patients where name = 'drop'",
        SqlPolicyError::ForbiddenKeyword { keyword: "DROP".to_string() }; "keyword in literal"
    )]
    #[test_case(
        "SELECT * FROM secret_table",
        SqlPolicyError::DisallowedTable { table: "secret_table".to_string() }; "unknown table"
    )]
    #[test_case(
        "SELECT * FROM patients p JOIN sqlite_master m ON 1 = 1",
        SqlPolicyError::DisallowedTable { table: "sqlite_master".to_string() }; "unknown join"
    )]
    #[test_case(
        "SELECT * FROM patients, sqlite_master",
        SqlPolicyError::DisallowedTable { table: "sqlite_master".to_string() }; "comma join"
    )]
    #[test_case(
        "SELECT * FROM \"sqlite_master\"",
        SqlPolicyError::DisallowedTable { table: "sqlite_master".to_string() }; "quoted name"
    )]
    #[test_case(
        "SELECT name FROM\"sqlite_master\"",
        SqlPolicyError::DisallowedTable { table: "sqlite_master".to_string() }; "quote without space"
    )]
    #[test_case(
        "SELECT * FROM patients JOIN`sqlite_master`",
        SqlPolicyError::DisallowedTable { table: "sqlite_master".to_string() }; "backtick join"
    )]
    #[test_case(
        "SELECT * FROM [sqlite_master]",
        SqlPolicyError::DisallowedTable { table: "sqlite_master".to_string() }; "bracketed name"
    )]
    #[test_case(
        "SELECT * FROM 'sqlite_master'",
        SqlPolicyError::DisallowedTable { table: "sqlite_master".to_string() }; "string as name"
    )]
    #[test_case(
        "SELECT * FROM (sqlite_master)",
        SqlPolicyError::DisallowedTable { table: "sqlite_master".to_string() }; "parenthesized name"
    )]
    #[test_case(
        "SELECT * FROM (patients p, sqlite_master)",
        SqlPolicyError::DisallowedTable { table: "sqlite_master".to_string() }; "parenthesized list"
    )]
    #[test_case(
        "SELECT * FROM patients AS p, \"sqlite_master\" m",
        SqlPolicyError::DisallowedTable { table: "sqlite_master".to_string() }; "aliased comma list"
    )]
    #[test_case(
        "SELECT * FROM (SELECT * FROM (sqlite_master))",
        SqlPolicyError::DisallowedTable { table: "sqlite_master".to_string() }; "nested subquery"
    )]
    #[test_case(
        "SELECT * FROM main.patients",
        SqlPolicyError::DisallowedTable { table: "main".to_string() }; "schema qualified"
    )]
    #[test_case(
        "SELECT name FROM pragma_table_info('patients')",
        SqlPolicyError::DisallowedTable { table: "pragma_table_info".to_string() }; "table valued function"
    )]
    #[test_case(
        "SELECT * FROM patients WHERE dna_id IN (SELECT dna_id FROM audit_log)",
        SqlPolicyError::DisallowedTable { table: "audit_log".to_string() }; "subquery table"
    )]
    fn test_sanitize_rejects(sql: &str, expected: SqlPolicyError) {
        assert_eq!(policy().sanitize(sql, 50), Err(expected));
    }

    #[test]
    fn test_appends_requested_limit() {
        assert_eq!(
            accept("SELECT * FROM patients", 50),
            "SELECT * FROM patients LIMIT 50"
        );
    }

    #[test]
    fn test_limit_is_clamped_to_bounds() {
        assert!(accept("SELECT * FROM patients", 10_000).ends_with("LIMIT 500"));
        assert!(accept("SELECT * FROM patients", 0).ends_with("LIMIT 1"));
    }

    #[test]
    fn test_existing_limit_is_kept_or_lowered() {
        assert_eq!(
            accept("SELECT * FROM patients LIMIT 20", 50),
            "SELECT * FROM patients LIMIT 20"
        );
        assert_eq!(
            accept("SELECT * FROM patients limit 99999", 50),
            "SELECT * FROM patients limit 500"
        );
        assert_eq!(
            accept("SELECT * FROM patients LIMIT 9000 OFFSET 10", 50),
            "SELECT * FROM patients LIMIT 500 OFFSET 10"
        );
    }

    #[test_case("SELECT * FROM patients LIMIT -1"; "negative")]
    #[test_case("SELECT * FROM patients LIMIT 10+99999"; "expression")]
    #[test_case("SELECT * FROM patients LIMIT 5, 100000"; "offset comma form")]
    #[test_case("SELECT * FROM patients LIMIT (SELECT COUNT(*) FROM ehvol)"; "subquery limit")]
    fn test_non_literal_limit_is_wrapped(sql: &str) {
        assert_eq!(accept(sql, 50), format!("SELECT * FROM ({sql}) LIMIT 50"));
    }

    #[test]
    fn test_limit_only_in_subquery_gets_outer_limit() {
        assert_eq!(
            accept("SELECT * FROM (SELECT * FROM patients LIMIT 3) p", 40),
            "SELECT * FROM (SELECT * FROM patients LIMIT 3) p LIMIT 40"
        );
        assert_eq!(
            accept("SELECT * FROM patients WHERE dna_id IN (SELECT dna_id FROM ehvol LIMIT 2)", 7),
            "SELECT * FROM patients WHERE dna_id IN (SELECT dna_id FROM ehvol LIMIT 2) LIMIT 7"
        );
    }

    #[test]
    fn test_limit_word_in_literal_is_not_a_clause() {
        assert_eq!(
            accept("SELECT * FROM patients WHERE nationality = 'no limit'", 10),
            "SELECT * FROM patients WHERE nationality = 'no limit' LIMIT 10"
        );
    }

    #[test]
    fn test_scalar_subquery_columns_are_not_tables() {
        accept("SELECT (SELECT COUNT(*) FROM ehvol), gender FROM patients", 10);
        assert_eq!(
            referenced_tables("SELECT (SELECT COUNT(*) FROM ehvol), gender FROM patients"),
            vec!["ehvol", "patients"]
        );
    }

    #[test]
    fn test_accepts_allowed_tables_in_any_case() {
        accept("SELECT COUNT(*) FROM EHVOL", 10);
        accept(
            "SELECT p.dna_id FROM Patients p JOIN patient_genomic_variants v ON v.dna_id = p.dna_id",
            10,
        );
    }

    #[test]
    fn test_column_names_containing_keywords_are_allowed() {
        accept("SELECT created_at, updated_at FROM patients", 10);
    }

    #[test]
    fn test_cte_names_are_allowed() {
        let sql = "WITH by_gender AS (SELECT gender, COUNT(*) AS n FROM patients GROUP BY gender) \
                   SELECT * FROM by_gender";
        assert!(accept(sql, 10).ends_with("LIMIT 10"));
    }

    #[test]
    fn test_cte_body_is_still_checked() {
        let sql = "WITH x AS (SELECT * FROM sqlite_master) SELECT * FROM x";
        assert_eq!(
            policy().sanitize(sql, 10),
            Err(SqlPolicyError::DisallowedTable {
                table: "sqlite_master".to_string()
            })
        );
    }

    #[test]
    fn test_sanitize_trims_input() {
        assert_eq!(
            accept("  SELECT 1 AS one \n", 5),
            "SELECT 1 AS one LIMIT 5"
        );
    }

    #[test]
    fn test_referenced_tables_order() {
        let tables = referenced_tables(
            "SELECT * FROM patients p, ehvol e JOIN patient_genomic_variants v ON v.dna_id = p.dna_id",
        );
        assert_eq!(tables, vec!["patients", "ehvol", "patient_genomic_variants"]);
    }

    #[test]
    fn test_rewrite_column_aliases() {
        let columns: HashSet<String> = ["current_city", "current_city_category"]
            .into_iter()
            .map(String::from)
            .collect();
        let sql = "SELECT city, city_category, COUNT(*) FROM patients GROUP BY City";
        assert_eq!(
            rewrite_column_aliases(sql, &columns),
            "SELECT current_city, current_city_category, COUNT(*) FROM patients GROUP BY current_city"
        );
    }

    #[test]
    fn test_rewrite_leaves_sql_when_columns_missing() {
        let sql = "SELECT city FROM patients";
        let rewritten = rewrite_column_aliases(sql, &HashSet::new());
        assert!(matches!(rewritten, Cow::Borrowed(_)));
        assert_eq!(rewritten, sql);
    }

    #[test]
    fn test_rewrite_does_not_touch_current_columns() {
        let columns: HashSet<String> = ["current_city"].into_iter().map(String::from).collect();
        assert_eq!(
            rewrite_column_aliases("SELECT current_city FROM patients", &columns),
            "SELECT current_city FROM patients"
        );
    }

    proptest! {
        #[test]
        fn prop_semicolon_always_rejected(
            head in "[a-zA-Z0-9 *=,]{0,30}",
            tail in "[a-zA-Z0-9 *=,]{0,30}",
            limit in 0_u32..10_000,
        ) {
            let sql = format!("SELECT {head};{tail}");
            prop_assert_eq!(
                policy().sanitize(&sql, limit),
                Err(SqlPolicyError::MultipleStatements)
            );
        }

        #[test]
        fn prop_forbidden_keyword_always_rejected(
            keyword in proptest::sample::select(FORBIDDEN_KEYWORDS.to_vec()),
            lowercase in any::<bool>(),
            with_limit in any::<bool>(),
        ) {
            let keyword = if lowercase { keyword.to_lowercase() } else { keyword.to_string() };
            let limit_clause = if with_limit { " LIMIT 5" } else { "" };
            let sql = format!("SELECT * FROM patients WHERE x = '{keyword}'{limit_clause}");
            let rejected = matches!(
                policy().sanitize(&sql, 10),
                Err(SqlPolicyError::ForbiddenKeyword { .. })
            );
            prop_assert!(rejected);
        }

        #[test]
        fn prop_disallowed_table_always_rejected(
            table in "[a-z]{3,12}_x",
            uppercase in any::<bool>(),
        ) {
            let sql = format!("SELECT * FROM {table} LIMIT 3");
            let sql = if uppercase { sql.to_uppercase() } else { sql };
            let rejected = matches!(
                policy().sanitize(&sql, 10),
                Err(SqlPolicyError::DisallowedTable { .. })
            );
            prop_assert!(rejected);
        }

        #[test]
        fn prop_accepted_sql_ends_with_clamped_limit(requested in 0_u32..5_000) {
            let sql = accept("SELECT age FROM patients WHERE age > 40", requested);
            let expected = requested.clamp(1, 500);
            let suffix = format!("LIMIT {expected}");
            prop_assert!(sql.ends_with(&suffix));
        }
    }
}
