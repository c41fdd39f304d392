//! SQL normalizer
//!
//! Turns raw generator output into one executable script:
//!
//! 1. Split into lines, trim each.
//! 2. Keep only lines whose leading keyword is INSERT, UPDATE, DELETE or SELECT
//!    (case-insensitive); everything else (prose, code fences, blank lines) is
//!    dropped. Kept lines stay in order.
//! 3. An INSERT of the exact shape
//!    `INSERT INTO Inventory (item_name, quantity) VALUES ('<name>', <qty>)`
//!    becomes an upsert that adds `<qty>` to an existing row instead of
//!    failing on the unique name. Any other INSERT shape passes through.
//! 4. Join with `;\n` and append a final `;`.
//!
//! This is a filter, not a security boundary: a kept DELETE or a malformed
//! UPDATE reaches the database untouched.

use std::fmt;

/// Statement kinds allowed through the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Insert,
    Update,
    Delete,
    Select,
}

impl StatementKind {
    fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "INSERT" => Some(StatementKind::Insert),
            "UPDATE" => Some(StatementKind::Update),
            "DELETE" => Some(StatementKind::Delete),
            "SELECT" => Some(StatementKind::Select),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::Select => "SELECT",
        }
    }
}

/// One kept line of generator output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Well-shaped single-row INSERT, rendered as a quantity-accumulating upsert
    Upsert { name: String, quantity: i64 },
    /// Any other allowed statement, kept verbatim (minus trailing semicolons)
    Passthrough { kind: StatementKind, sql: String },
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Upsert { .. } => StatementKind::Insert,
            Statement::Passthrough { kind, .. } => *kind,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Upsert { name, quantity } => write!(
                f,
                "INSERT INTO Inventory (item_name, quantity) VALUES ('{}', {}) \
                 ON CONFLICT(item_name) DO UPDATE SET quantity = quantity + {}",
                name.replace('\'', "''"),
                quantity,
                quantity
            ),
            Statement::Passthrough { sql, .. } => f.write_str(sql),
        }
    }
}

/// Ordered statements ready for the applier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedScript {
    statements: Vec<Statement>,
}

impl NormalizedScript {
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Render the script: statements joined by `;\n`, terminated by `;`
    ///
    /// An empty script renders as a lone `;`.
    pub fn to_sql(&self) -> String {
        let body = self
            .statements
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(";\n");
        format!("{};", body)
    }
}

/// Normalize raw generator output
pub fn normalize(raw: &str) -> NormalizedScript {
    let statements = raw.lines().filter_map(classify_line).collect();
    NormalizedScript { statements }
}

/// Classify one line, `None` when it is not an allowed statement
pub fn classify_line(line: &str) -> Option<Statement> {
    let line = line.trim();
    let keyword = line
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .next()?;
    let kind = StatementKind::from_keyword(keyword)?;

    if kind == StatementKind::Insert {
        if let Some((name, quantity)) = match_inventory_insert(line) {
            return Some(Statement::Upsert { name, quantity });
        }
    }

    Some(Statement::Passthrough {
        kind,
        sql: strip_terminator(line).to_string(),
    })
}

fn strip_terminator(line: &str) -> &str {
    line.trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    QuotedIdent(String),
    Str(String),
    Number(String),
    Punct(char),
}

/// Split a line into SQL-ish tokens; `None` on an unterminated literal
fn tokenize(line: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_alphabetic() || c == '_' {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    word.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Word(word));
        } else if c.is_ascii_digit() {
            let mut digits = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_digit() {
                    digits.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Number(digits));
        } else if c == '\'' {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next()? {
                    '\'' if chars.peek() == Some(&'\'') => {
                        chars.next();
                        value.push('\'');
                    }
                    '\'' => break,
                    other => value.push(other),
                }
            }
            tokens.push(Token::Str(value));
        } else if c == '"' || c == '`' || c == '[' {
            chars.next();
            let close = if c == '[' { ']' } else { c };
            let mut ident = String::new();
            loop {
                match chars.next()? {
                    ch if ch == close => break,
                    ch => ident.push(ch),
                }
            }
            tokens.push(Token::QuotedIdent(ident));
        } else {
            chars.next();
            tokens.push(Token::Punct(c));
        }
    }

    Some(tokens)
}

/// Match `INSERT INTO Inventory (item_name, quantity) VALUES ('<name>', <qty>)`
fn match_inventory_insert(line: &str) -> Option<(String, i64)> {
    let tokens = tokenize(line)?;
    let mut it = tokens.iter();

    expect_keyword(it.next()?, "INSERT")?;
    expect_keyword(it.next()?, "INTO")?;
    expect_ident(it.next()?, "Inventory")?;
    expect_punct(it.next()?, '(')?;
    expect_ident(it.next()?, "item_name")?;
    expect_punct(it.next()?, ',')?;
    expect_ident(it.next()?, "quantity")?;
    expect_punct(it.next()?, ')')?;
    expect_keyword(it.next()?, "VALUES")?;
    expect_punct(it.next()?, '(')?;
    let name = match it.next()? {
        Token::Str(value) if !value.is_empty() => value.clone(),
        _ => return None,
    };
    expect_punct(it.next()?, ',')?;
    let quantity = match it.next()? {
        Token::Number(digits) => digits.parse::<i64>().ok()?,
        _ => return None,
    };
    expect_punct(it.next()?, ')')?;

    // Only statement terminators may follow
    if it.all(|t| *t == Token::Punct(';')) {
        Some((name, quantity))
    } else {
        None
    }
}

fn expect_keyword(token: &Token, keyword: &str) -> Option<()> {
    match token {
        Token::Word(word) if word.eq_ignore_ascii_case(keyword) => Some(()),
        _ => None,
    }
}

fn expect_ident(token: &Token, ident: &str) -> Option<()> {
    match token {
        Token::Word(word) | Token::QuotedIdent(word) if word.eq_ignore_ascii_case(ident) => Some(()),
        _ => None,
    }
}

fn expect_punct(token: &Token, punct: char) -> Option<()> {
    match token {
        Token::Punct(c) if *c == punct => Some(()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_non_statement_lines_and_keeps_order() {
        let raw = "Here is the SQL you asked for:\n\
                   ```sql\n\
                   UPDATE Inventory SET quantity = quantity + 2 WHERE item_name = 'Potato';\n\
                   \n\
                   SELECT * FROM Inventory;\n\
                   ```\n\
                   This adds two potatoes.";

        let script = normalize(raw);
        let kinds: Vec<StatementKind> = script.statements().iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, vec![StatementKind::Update, StatementKind::Select]);
        assert_eq!(
            script.to_sql(),
            "UPDATE Inventory SET quantity = quantity + 2 WHERE item_name = 'Potato';\n\
             SELECT * FROM Inventory;"
        );
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let script = normalize("  delete from Inventory where item_name = 'Onion'  ");
        assert_eq!(
            script.statements(),
            &[Statement::Passthrough {
                kind: StatementKind::Delete,
                sql: "delete from Inventory where item_name = 'Onion'".to_string(),
            }]
        );
    }

    #[test]
    fn test_keyword_must_be_whole_word() {
        assert!(classify_line("SELECTED items are shown below").is_none());
        assert!(classify_line("Updates: none").is_none());
        assert!(classify_line("-- UPDATE Inventory").is_none());
    }

    #[test]
    fn test_exact_insert_becomes_upsert() {
        let statement =
            classify_line("INSERT INTO Inventory (item_name, quantity) VALUES ('Potato', 5);").unwrap();
        assert_eq!(
            statement,
            Statement::Upsert {
                name: "Potato".to_string(),
                quantity: 5
            }
        );
        assert_eq!(
            statement.to_string(),
            "INSERT INTO Inventory (item_name, quantity) VALUES ('Potato', 5) \
             ON CONFLICT(item_name) DO UPDATE SET quantity = quantity + 5"
        );
    }

    #[test]
    fn test_insert_match_tolerates_case_spacing_and_quoted_columns() {
        let lines = [
            "insert into inventory (item_name, quantity) values ('Garlic', 3)",
            "INSERT  INTO Inventory(item_name,quantity) VALUES('Garlic',3);",
            r#"INSERT INTO "Inventory" ("item_name", "quantity") VALUES ('Garlic', 3);;"#,
        ];

        for line in lines {
            assert_eq!(
                classify_line(line),
                Some(Statement::Upsert {
                    name: "Garlic".to_string(),
                    quantity: 3
                }),
                "line should become an upsert: {}",
                line
            );
        }
    }

    #[test]
    fn test_other_insert_shapes_pass_through() {
        let lines = [
            r#"INSERT INTO Inventory ("item no", item_name, quantity) VALUES (9, 'Potato', 5);"#,
            "INSERT INTO Inventory (item_name, quantity) VALUES ('Potato', 5), ('Onion', 1);",
            "INSERT INTO Stock (item_name, quantity) VALUES ('Potato', 5);",
            "INSERT INTO Inventory (item_name, quantity) VALUES ('Potato', -5);",
            "INSERT INTO Inventory (item_name, quantity) VALUES ('Potato', 2 + 3);",
            "INSERT INTO Inventory (quantity, item_name) VALUES (5, 'Potato');",
            "INSERT INTO Inventory (item_name, quantity) VALUES ('', 5);",
        ];

        for line in lines {
            match classify_line(line) {
                Some(Statement::Passthrough { kind, sql }) => {
                    assert_eq!(kind, StatementKind::Insert);
                    assert_eq!(sql, line.trim_end_matches(';'));
                }
                other => panic!("expected passthrough for {}, got {:?}", line, other),
            }
        }
    }

    #[test]
    fn test_trailing_text_after_insert_prevents_upsert() {
        let line = "INSERT INTO Inventory (item_name, quantity) VALUES ('Potato', 5); DELETE FROM Inventory;";
        assert!(matches!(
            classify_line(line),
            Some(Statement::Passthrough { kind: StatementKind::Insert, .. })
        ));
    }

    #[test]
    fn test_quotes_in_names_are_escaped() {
        let statement =
            classify_line("INSERT INTO Inventory (item_name, quantity) VALUES ('Chef''s Knife', 2)").unwrap();
        assert_eq!(
            statement,
            Statement::Upsert {
                name: "Chef's Knife".to_string(),
                quantity: 2
            }
        );
        assert!(statement.to_string().contains("VALUES ('Chef''s Knife', 2)"));
    }

    #[test]
    fn test_unterminated_literal_passes_through() {
        let line = "INSERT INTO Inventory (item_name, quantity) VALUES ('Potato, 5)";
        assert!(matches!(
            classify_line(line),
            Some(Statement::Passthrough { kind: StatementKind::Insert, .. })
        ));
    }

    #[test]
    fn test_quantity_overflow_passes_through() {
        let line = "INSERT INTO Inventory (item_name, quantity) VALUES ('Potato', 99999999999999999999)";
        assert!(matches!(classify_line(line), Some(Statement::Passthrough { .. })));
    }

    #[test]
    fn test_terminators_not_doubled() {
        let script = normalize("UPDATE Inventory SET quantity = 1 WHERE item_name = 'Apple';;\nSELECT 1 ;");
        assert_eq!(
            script.to_sql(),
            "UPDATE Inventory SET quantity = 1 WHERE item_name = 'Apple';\nSELECT 1;"
        );
    }

    #[test]
    fn test_empty_output_renders_lone_terminator() {
        let script = normalize("I could not understand that instruction.");
        assert!(script.is_empty());
        assert_eq!(script.len(), 0);
        assert_eq!(script.to_sql(), ";");
    }

    #[test]
    fn test_mixed_batch() {
        let raw = "INSERT INTO Inventory (item_name, quantity) VALUES ('Garlic', 4);\n\
                   UPDATE Inventory SET quantity = quantity - 1 WHERE item_name = 'Tomato';";
        let script = normalize(raw);

        assert_eq!(script.len(), 2);
        assert_eq!(
            script.to_sql(),
            "INSERT INTO Inventory (item_name, quantity) VALUES ('Garlic', 4) \
             ON CONFLICT(item_name) DO UPDATE SET quantity = quantity + 4;\n\
             UPDATE Inventory SET quantity = quantity - 1 WHERE item_name = 'Tomato';"
        );
    }
}
