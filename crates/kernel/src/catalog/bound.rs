//! SQL text paired with its positional parameters.

use sqlx::mysql::MySqlRow;
use sqlx::{FromRow, MySqlConnection};

/// A query whose positional `?` placeholders are matched one-to-one by
/// `params`.
///
/// Construction panics when the counts disagree: a mismatch is a bug in the
/// calling code, not a runtime condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundQuery {
    sql: String,
    params: Vec<String>,
}

impl BoundQuery {
    /// Pair `sql` with `params`.
    ///
    /// # Panics
    ///
    /// Panics if the number of `?` placeholders in `sql` differs from
    /// `params.len()`.
    pub fn new(sql: impl Into<String>, params: Vec<String>) -> Self {
        let sql = sql.into();
        let placeholders = placeholder_count(&sql);
        assert_eq!(
            placeholders,
            params.len(),
            "query expects {placeholders} parameters but {} were supplied",
            params.len()
        );
        Self { sql, params }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Execute and map every row into `T`.
    pub async fn fetch_all<T>(&self, conn: &mut MySqlConnection) -> Result<Vec<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
    {
        let mut query = sqlx::query_as::<_, T>(&self.sql);
        for param in &self.params {
            query = query.bind(param.as_str());
        }
        query.fetch_all(conn).await
    }

    /// Execute and map the first row into `T`, if any.
    pub async fn fetch_optional<T>(
        &self,
        conn: &mut MySqlConnection,
    ) -> Result<Option<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
    {
        let mut query = sqlx::query_as::<_, T>(&self.sql);
        for param in &self.params {
            query = query.bind(param.as_str());
        }
        query.fetch_optional(conn).await
    }
}

/// Number of positional placeholders in a MySQL statement.
pub(crate) fn placeholder_count(sql: &str) -> usize {
    sql.matches('?').count()
}
