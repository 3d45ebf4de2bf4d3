//! Statement splitting and classification
//!
//! Turns concatenated script text into discrete statements, in order, and
//! tags each one as transactional or as a structural drop:
//!
//! 1. lines starting with `--` are removed whole (no trailing-comment stripping)
//! 2. the rest is split into candidates by a [`StatementSplitter`]
//! 3. candidates are trimmed and empty ones discarded
//! 4. a statement is a [`StatementKind::StructuralDrop`] iff it starts with
//!    `DROP TABLE`, compared case-insensitively
//!
//! Classification never fails; text without statements yields an empty batch.

use serde::Serialize;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::tokenizer::{Location, Token, Tokenizer};
use tracing::warn;

/// How a statement is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    /// Applied inside the single atomic unit
    Transactional,
    /// `DROP TABLE`, applied on its own after the atomic unit
    StructuralDrop,
}

impl StatementKind {
    /// Classify a trimmed statement by its leading keywords
    pub fn of(sql: &str) -> StatementKind {
        if sql.trim_start().to_uppercase().starts_with("DROP TABLE") {
            StatementKind::StructuralDrop
        } else {
            StatementKind::Transactional
        }
    }
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatementKind::Transactional => write!(f, "transactional"),
            StatementKind::StructuralDrop => write!(f, "drop"),
        }
    }
}

/// One SQL statement extracted from migration scripts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "display", derive(tabled::Tabled))]
pub struct Statement {
    /// Position among all statements of the run
    #[cfg_attr(feature = "display", tabled(rename = "#"))]
    pub ordinal: usize,
    pub kind: StatementKind,
    pub sql: String,
}

/// Statements of one migration run, partitioned by kind
///
/// Both partitions keep the order statements appeared in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationBatch {
    pub transactional: Vec<Statement>,
    pub drops: Vec<Statement>,
}

impl MigrationBatch {
    pub fn is_empty(&self) -> bool {
        self.transactional.is_empty() && self.drops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transactional.len() + self.drops.len()
    }

    /// All statements back in their original order
    pub fn statements(&self) -> Vec<&Statement> {
        let mut all: Vec<&Statement> = self.transactional.iter().chain(&self.drops).collect();
        all.sort_by_key(|s| s.ordinal);
        all
    }
}

/// Splits comment-free script text into candidate statements
pub trait StatementSplitter {
    fn split<'a>(&self, text: &'a str) -> Vec<&'a str>;
}

/// Splits on every `;`
///
/// Unaware of quoting: a `;` inside a string literal or block comment ends
/// the statement anyway.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveSplitter;

impl StatementSplitter for NaiveSplitter {
    fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split(';').collect()
    }
}

/// Splits on `;` tokens produced by the SQLite tokenizer
///
/// Semicolons inside string literals, quoted identifiers and comments do not
/// end a statement. Each statement starts at its first token that is not
/// whitespace or a comment, so a comment in front of `DROP TABLE` does not
/// hide it from classification. Text the tokenizer rejects falls back to
/// [`NaiveSplitter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteAwareSplitter;

impl StatementSplitter for QuoteAwareSplitter {
    fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let dialect = SQLiteDialect {};
        let tokens = match Tokenizer::new(&dialect, text).tokenize_with_location() {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("SQL tokenizing failed, using naive semicolon splitting: {}", e);
                return NaiveSplitter.split(text);
            }
        };

        let line_starts: Vec<usize> = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        let mut parts = Vec::new();
        let mut start = None;
        for token in &tokens {
            match token.token {
                Token::SemiColon => {
                    if let Some(from) = start.take() {
                        let to = byte_offset(text, &line_starts, &token.location);
                        parts.push(&text[from..to]);
                    }
                }
                Token::Whitespace(_) | Token::EOF => {}
                _ => {
                    if start.is_none() {
                        start = Some(byte_offset(text, &line_starts, &token.location));
                    }
                }
            }
        }
        if let Some(from) = start {
            parts.push(&text[from..]);
        }
        parts
    }
}

/// Byte offset of a tokenizer location (1-based line, 1-based char column)
fn byte_offset(text: &str, line_starts: &[usize], location: &Location) -> usize {
    let line = (location.line as usize).saturating_sub(1);
    let Some(&line_start) = line_starts.get(line) else {
        return text.len();
    };
    text[line_start..]
        .char_indices()
        .nth((location.column as usize).saturating_sub(1))
        .map(|(i, _)| line_start + i)
        .unwrap_or(text.len())
}

/// Turns script text into a classified [`MigrationBatch`]
#[derive(Debug, Clone, Default)]
pub struct StatementClassifier<S = NaiveSplitter> {
    splitter: S,
}

impl StatementClassifier<NaiveSplitter> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: StatementSplitter> StatementClassifier<S> {
    pub fn with_splitter(splitter: S) -> Self {
        Self { splitter }
    }

    pub fn classify(&self, text: &str) -> MigrationBatch {
        let stripped = strip_comment_lines(text);

        let mut batch = MigrationBatch::default();
        let candidates = self
            .splitter
            .split(&stripped)
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        for (ordinal, sql) in candidates.enumerate() {
            let kind = StatementKind::of(sql);
            let statement = Statement {
                ordinal,
                kind,
                sql: sql.to_string(),
            };
            match kind {
                StatementKind::Transactional => batch.transactional.push(statement),
                StatementKind::StructuralDrop => batch.drops.push(statement),
            }
        }
        batch
    }
}

/// Classify with the default naive splitter
pub fn classify(text: &str) -> MigrationBatch {
    StatementClassifier::new().classify(text)
}

/// Drop every line whose first two characters are `--`
fn strip_comment_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !line.starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqls(statements: &[Statement]) -> Vec<&str> {
        statements.iter().map(|s| s.sql.as_str()).collect()
    }

    #[test]
    fn test_comment_lines_and_empties_removed() {
        let batch = classify("A;\nB;\n-- note\nC;\n");
        assert_eq!(sqls(&batch.transactional), vec!["A", "B", "C"]);
        assert!(batch.drops.is_empty());
    }

    #[test]
    fn test_trailing_comments_are_kept() {
        let batch = classify("UPDATE t SET x = 1 -- why;\n");
        assert_eq!(
            sqls(&batch.transactional),
            vec!["UPDATE t SET x = 1 -- why"]
        );
    }

    #[test]
    fn test_indented_comment_is_not_a_comment_line() {
        let batch = classify("  -- indented;\nA;");
        assert_eq!(sqls(&batch.transactional), vec!["-- indented", "A"]);
    }

    #[test]
    fn test_drop_classification_is_case_insensitive() {
        use StatementKind::*;

        assert_eq!(StatementKind::of("DROP TABLE Foo"), StructuralDrop);
        assert_eq!(StatementKind::of("drop table Foo"), StructuralDrop);
        assert_eq!(StatementKind::of("Drop Table IF EXISTS Foo"), StructuralDrop);
        assert_eq!(StatementKind::of("UPDATE Foo SET x=1"), Transactional);
        assert_eq!(StatementKind::of("DROP INDEX idx_foo"), Transactional);
        assert_eq!(StatementKind::of("DROP VIEW v_foo"), Transactional);
    }

    #[test]
    fn test_partition_is_stable() {
        let batch = classify("A;DROP TABLE x;B;drop table y;C");
        assert_eq!(sqls(&batch.transactional), vec!["A", "B", "C"]);
        assert_eq!(sqls(&batch.drops), vec!["DROP TABLE x", "drop table y"]);

        let ordinals: Vec<usize> = batch.statements().iter().map(|s| s.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2, 3, 4]);
        assert_eq!(batch.drops[0].ordinal, 1);
        assert_eq!(batch.len(), 5);
    }

    #[test]
    fn test_scripts_joined_across_versions() {
        let text = [
            "ALTER TABLE X ADD COLUMN y INT;",
            "-- cleanup\nDROP TABLE OldThing;\nINSERT INTO Z VALUES (1);",
        ]
        .join("\n");
        let batch = classify(&text);

        assert_eq!(
            sqls(&batch.transactional),
            vec!["ALTER TABLE X ADD COLUMN y INT", "INSERT INTO Z VALUES (1)"]
        );
        assert_eq!(sqls(&batch.drops), vec!["DROP TABLE OldThing"]);
    }

    #[test]
    fn test_blank_input_is_empty_batch() {
        assert!(classify("").is_empty());
        assert!(classify(";;\n ; \n-- only a comment\n").is_empty());
    }

    #[test]
    fn test_naive_splitter_breaks_string_literals() {
        let batch = classify("INSERT INTO t VALUES ('a;b');");
        assert_eq!(batch.transactional.len(), 2);
    }

    #[test]
    fn test_quote_aware_splitter() {
        let classifier = StatementClassifier::with_splitter(QuoteAwareSplitter);
        let batch = classifier.classify(
            "INSERT INTO t VALUES ('a;b', 'it''s; fine');\n/* one; two */ DROP TABLE u;\nSELECT \"c;d\" FROM t",
        );

        assert_eq!(
            sqls(&batch.transactional),
            vec![
                "INSERT INTO t VALUES ('a;b', 'it''s; fine')",
                "SELECT \"c;d\" FROM t"
            ]
        );
        // the leading block comment is not part of the statement
        assert_eq!(sqls(&batch.drops), vec!["DROP TABLE u"]);
        assert_eq!(batch.drops[0].ordinal, 1);
    }

    #[test]
    fn test_quote_aware_apostrophe_in_trailing_comment() {
        let classifier = StatementClassifier::with_splitter(QuoteAwareSplitter);
        let batch = classifier.classify(
            "UPDATE t SET x = 1; -- it's done\nINSERT INTO t VALUES (2);\nDROP TABLE old;",
        );

        assert_eq!(
            sqls(&batch.transactional),
            vec!["UPDATE t SET x = 1", "INSERT INTO t VALUES (2)"]
        );
        assert_eq!(sqls(&batch.drops), vec!["DROP TABLE old"]);
    }

    #[test]
    fn test_quote_aware_drop_after_trailing_comment_line() {
        let classifier = StatementClassifier::with_splitter(QuoteAwareSplitter);
        let batch =
            classifier.classify("INSERT INTO t VALUES ('é'); -- don't\n  drop table old;\n");

        assert_eq!(sqls(&batch.transactional), vec!["INSERT INTO t VALUES ('é')"]);
        assert_eq!(sqls(&batch.drops), vec!["drop table old"]);
    }

    #[test]
    fn test_quote_aware_unterminated_literal_falls_back() {
        let batch = StatementClassifier::with_splitter(QuoteAwareSplitter)
            .classify("INSERT INTO t VALUES ('open;DROP TABLE x");
        assert_eq!(sqls(&batch.transactional), vec!["INSERT INTO t VALUES ('open"]);
        assert_eq!(sqls(&batch.drops), vec!["DROP TABLE x"]);
    }
}
