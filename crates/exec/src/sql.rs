//! Parameterized analyze statements.

use std::fmt;

/// Placeholder for an identifier parameter.
pub const IDENT_PLACEHOLDER: &str = "%n";

/// An analyze statement kept as template plus ordered identifier parameters.
///
/// Parameters bind positionally to `%n` placeholders and are always
/// identifiers (schema, table, partition, index), never values. Quoting is
/// left to the session executing the statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct AnalyzeSql {
    pub sql: &'static str,
    pub params: Vec<String>,
}

impl AnalyzeSql {
    pub fn new<I, S>(sql: &'static str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sql,
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    pub fn placeholder_count(&self) -> usize {
        self.sql.matches(IDENT_PLACEHOLDER).count()
    }

    pub fn mentions(&self, ident: &str) -> bool {
        self.params.iter().any(|p| p == ident)
    }
}

/// Renders the statement with back-quoted identifiers, for logs only.
impl fmt::Display for AnalyzeSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut params = self.params.iter();
        let mut pieces = self.sql.split(IDENT_PLACEHOLDER);
        if let Some(first) = pieces.next() {
            f.write_str(first)?;
        }
        for piece in pieces {
            match params.next() {
                Some(p) => write!(f, "`{}`", p.replace('`', "``"))?,
                None => f.write_str(IDENT_PLACEHOLDER)?,
            }
            f.write_str(piece)?;
        }
        Ok(())
    }
}
