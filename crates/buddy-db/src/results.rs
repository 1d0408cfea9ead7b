use sqlx::{FromRow, QueryBuilder, Sqlite};

use buddy_data::QueryError;

#[derive(Debug, Clone, FromRow)]
pub struct Id<T> {
    pub id: T,
}

/// Translate a driver error into the store's error kinds
/// where one applies.
pub(crate) fn store_error(err: sqlx::Error) -> anyhow::Error {
    match &err {
        sqlx::Error::RowNotFound => QueryError::NotFound.into(),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            QueryError::Duplicate.into()
        }
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => {
            QueryError::Unavailable(err.to_string()).into()
        }
        _ => err.into(),
    }
}

/// Restrict a query to rows where column is one of values.
/// An empty list matches nothing.
pub(crate) fn push_in<'args, T>(
    qry: &mut QueryBuilder<'args, Sqlite>,
    column: &str,
    values: Vec<T>,
) where
    T: 'args + sqlx::Encode<'args, Sqlite> + sqlx::Type<Sqlite> + Send,
{
    if values.is_empty() {
        qry.push(" AND 0");
        return;
    }
    qry.push(format!(" AND {} IN (", column));
    let mut list = qry.separated(", ");
    for value in values {
        list.push_bind(value);
    }
    qry.push(")");
}
