//! Query skeleton
//!
//! A shallow tokenization of SQL text: words, string literals, quoted
//! identifiers and single-character symbols, each tagged with its parenthesis
//! depth. It is just enough to locate a placeholder word and the top-level
//! `WHERE` / `GROUP BY` clauses without touching string contents.
//!
//! Only depth-0 clauses are considered. Compound queries (`UNION` etc.) have
//! several top-level `WHERE` clauses; the first one is the one used.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    StringLiteral,
    QuotedIdentifier,
    Symbol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
    pub depth: usize,
}

/// Clause keywords recognized at the top level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
    Where,
    GroupBy,
    Having,
    Window,
    OrderBy,
    Limit,
    Compound,
}

impl Clause {
    /// Clauses that may follow a `WHERE` condition, ending it
    const AFTER_WHERE: [Clause; 6] = [
        Clause::GroupBy,
        Clause::Having,
        Clause::Window,
        Clause::OrderBy,
        Clause::Limit,
        Clause::Compound,
    ];
}

/// Tokenized view of a query
#[derive(Debug, Clone)]
pub struct QuerySkeleton<'a> {
    sql: &'a str,
    tokens: Vec<Token>,
}

impl<'a> QuerySkeleton<'a> {
    pub fn scan(sql: &'a str) -> Self {
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        let mut chars = sql.char_indices().peekable();

        while let Some((start, c)) = chars.next() {
            let (kind, end) = match c {
                c if c.is_whitespace() => continue,
                '\'' | '"' => {
                    let mut end = sql.len();
                    while let Some((idx, next)) = chars.next() {
                        if next == c {
                            // a doubled quote is an escaped quote
                            if matches!(chars.peek(), Some((_, n)) if *n == c) {
                                chars.next();
                                continue;
                            }
                            end = idx + 1;
                            break;
                        }
                    }
                    let kind = if c == '\'' {
                        TokenKind::StringLiteral
                    } else {
                        TokenKind::QuotedIdentifier
                    };
                    (kind, end)
                }
                c if is_word_char(c) => {
                    let mut end = start + c.len_utf8();
                    while let Some((idx, next)) = chars.peek().copied() {
                        if !is_word_char(next) {
                            break;
                        }
                        end = idx + next.len_utf8();
                        chars.next();
                    }
                    (TokenKind::Word, end)
                }
                '(' => {
                    tokens.push(Token {
                        kind: TokenKind::Symbol,
                        span: start..start + 1,
                        depth,
                    });
                    depth += 1;
                    continue;
                }
                ')' => {
                    depth = depth.saturating_sub(1);
                    (TokenKind::Symbol, start + 1)
                }
                other => (TokenKind::Symbol, start + other.len_utf8()),
            };

            tokens.push(Token {
                kind,
                span: start..end,
                depth,
            });
        }

        Self { sql, tokens }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn text(&self, token: &Token) -> &'a str {
        &self.sql[token.span.clone()]
    }

    fn is_word(&self, idx: usize, word: &str) -> bool {
        self.tokens.get(idx).map_or(false, |t| {
            t.kind == TokenKind::Word && self.text(t).eq_ignore_ascii_case(word)
        })
    }

    /// Spans of every occurrence of `word` (case-sensitive), at any depth
    pub fn occurrences(&self, word: &str) -> Vec<Range<usize>> {
        self.tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Word && self.text(t) == word)
            .map(|t| t.span.clone())
            .collect()
    }

    /// Span of the keyword(s) of the clause at token `idx`, if one starts there
    fn clause_at(&self, idx: usize) -> Option<(Clause, Range<usize>)> {
        let token = &self.tokens[idx];
        if token.depth != 0 || token.kind != TokenKind::Word {
            return None;
        }

        let single = |clause| Some((clause, token.span.clone()));
        let with_by = |clause| {
            self.is_word(idx + 1, "BY")
                .then(|| (clause, token.span.start..self.tokens[idx + 1].span.end))
        };

        let word = self.text(token).to_ascii_uppercase();
        match word.as_str() {
            "WHERE" => single(Clause::Where),
            "GROUP" => with_by(Clause::GroupBy),
            "ORDER" => with_by(Clause::OrderBy),
            "HAVING" => single(Clause::Having),
            "WINDOW" => single(Clause::Window),
            "LIMIT" => single(Clause::Limit),
            "UNION" | "INTERSECT" | "EXCEPT" => single(Clause::Compound),
            _ => None,
        }
    }

    /// First top-level occurrence of `clause` at or after token `from`
    fn find_clause(&self, clauses: &[Clause], from: usize) -> Option<(usize, Range<usize>)> {
        (from..self.tokens.len()).find_map(|idx| {
            self.clause_at(idx)
                .filter(|(clause, _)| clauses.contains(clause))
                .map(|(_, span)| (idx, span))
        })
    }

    /// Keyword span of the first top-level clause of this kind
    pub fn clause(&self, clause: Clause) -> Option<Range<usize>> {
        self.find_clause(&[clause], 0).map(|(_, span)| span)
    }

    /// Byte range of the condition that follows the first top-level `WHERE`
    ///
    /// The range is trimmed and excludes a trailing `;`.
    pub fn where_condition(&self) -> Option<Range<usize>> {
        let (idx, keyword) = self.find_clause(&[Clause::Where], 0)?;
        let end = self
            .find_clause(&Clause::AFTER_WHERE, idx + 1)
            .map_or_else(|| self.statement_end(), |(_, span)| span.start);

        let condition = &self.sql[keyword.end..end];
        let start = keyword.end + (condition.len() - condition.trim_start().len());
        let end = keyword.end + condition.trim_end().len();
        Some(start..end.max(start))
    }

    /// Position after the last token that is not a terminating `;`
    pub fn statement_end(&self) -> usize {
        let trimmed = self.sql.trim_end();
        trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end().len()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice<'a>(sql: &'a str, range: Range<usize>) -> &'a str {
        &sql[range]
    }

    #[test]
    fn test_tokens_and_depth() {
        let sql = "SELECT f(a, 'x(y') FROM \"t\"";
        let skeleton = QuerySkeleton::scan(sql);
        let texts: Vec<(&str, usize)> = skeleton
            .tokens()
            .iter()
            .map(|t| (skeleton.text(t), t.depth))
            .collect();

        assert_eq!(
            texts,
            vec![
                ("SELECT", 0),
                ("f", 0),
                ("(", 0),
                ("a", 1),
                (",", 1),
                ("'x(y'", 1),
                (")", 0),
                ("FROM", 0),
                ("\"t\"", 0),
            ]
        );
    }

    #[test]
    fn test_occurrences_skip_literals() {
        let sql = "SELECT MULTIPLOT, 'MULTIPLOT' FROM t GROUP BY MULTIPLOT";
        let skeleton = QuerySkeleton::scan(sql);
        let found = skeleton.occurrences("MULTIPLOT");
        assert_eq!(found.len(), 2);
        assert_eq!(slice(sql, found[1].clone()), "MULTIPLOT");
        assert_eq!(found[1].start, sql.rfind("MULTIPLOT").unwrap());
    }

    #[test]
    fn test_where_condition_stops_at_group_by() {
        let sql = "SELECT x FROM t WHERE a = 1 OR b = 'GROUP BY' GROUP BY x ORDER BY x";
        let skeleton = QuerySkeleton::scan(sql);
        let cond = skeleton.where_condition().unwrap();
        assert_eq!(slice(sql, cond), "a = 1 OR b = 'GROUP BY'");
        assert_eq!(
            slice(sql, skeleton.clause(Clause::GroupBy).unwrap()),
            "GROUP BY"
        );
    }

    #[test]
    fn test_nested_where_is_ignored() {
        let sql = "SELECT x FROM (SELECT * FROM t WHERE a = 1) GROUP BY x;";
        let skeleton = QuerySkeleton::scan(sql);
        assert!(skeleton.where_condition().is_none());
        assert!(skeleton.clause(Clause::GroupBy).is_some());
    }

    #[test]
    fn test_case_insensitive_keywords_and_statement_end() {
        let sql = "select x from t where y > 2 ;  ";
        let skeleton = QuerySkeleton::scan(sql);
        assert_eq!(slice(sql, skeleton.where_condition().unwrap()), "y > 2");
        assert_eq!(skeleton.statement_end(), "select x from t where y > 2".len());
    }

    #[test]
    fn test_escaped_quotes() {
        let sql = "SELECT 'it''s WHERE' AS a FROM t";
        let skeleton = QuerySkeleton::scan(sql);
        assert!(skeleton.clause(Clause::Where).is_none());
    }
}
