use anyhow::Result;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use buddy_data::{
    Fee,
    FeeChange,
    FeeFilter,
    Insert,
    LogId,
    Query,
    QueryError,
    Retrieve,
    Term,
    Update,
};

use crate::{
    results::{store_error, Id},
    Connection,
};

fn push_fee_filter(qry: &mut QueryBuilder<'_, Sqlite>, filter: &FeeFilter) {
    if let Some(year) = filter.year {
        qry.push(" AND year = ").push_bind(year);
    }
    if let Some(semester) = filter.semester {
        qry.push(" AND semester = ").push_bind(semester);
    }
}

/// Ids of the logs filed for a term, oldest first
async fn term_log_ids(
    conn: &mut SqliteConnection,
    term: Term,
) -> Result<Vec<LogId>> {
    let ids: Vec<Id<LogId>> = QueryBuilder::<Sqlite>::new(
        "SELECT id FROM logs WHERE year = ",
    )
    .push_bind(term.year)
    .push(" AND semester = ")
    .push_bind(term.semester)
    .push(" ORDER BY id")
    .build_query_as()
    .fetch_all(conn)
    .await
    .map_err(store_error)?;
    Ok(ids.into_iter().map(|id| id.id).collect())
}

#[async_trait]
impl Query<Fee> for Connection {
    type Filter = FeeFilter;

    async fn query(&self, filter: &FeeFilter) -> Result<Vec<Fee>> {
        self.bounded(async {
            let mut conn = self.lock().await;
            let mut qry = QueryBuilder::<Sqlite>::new(
                r#"
                SELECT
                    year,
                    semester,
                    amount
                FROM fees
                WHERE 1
                "#,
            );
            push_fee_filter(&mut qry, filter);
            qry.push(" ORDER BY year, semester");

            let mut fees: Vec<Fee> = qry
                .build_query_as()
                .fetch_all(&mut *conn)
                .await
                .map_err(store_error)?;
            for fee in fees.iter_mut() {
                fee.logs = term_log_ids(&mut conn, fee.term()).await?;
            }
            Ok(fees)
        })
        .await
    }
}

#[async_trait]
impl Retrieve<Fee> for Connection {
    type Key = Term;

    /// Get the fee of a term including its log ids
    async fn retrieve(&self, term: Term) -> Result<Fee> {
        let mut fees: Vec<Fee> = self.query(&FeeFilter::from(term)).await?;
        let fee = fees.pop().ok_or(QueryError::NotFound)?;
        Ok(fee)
    }
}

#[async_trait]
impl Insert<Fee> for Connection {
    /// Create the fee of a term. The log list of the
    /// inserted fee is ignored; logs are attached by inserting them.
    async fn insert(&self, fee: Fee) -> Result<Fee> {
        self.bounded(async {
            let mut conn = self.lock().await;
            let mut qry = QueryBuilder::<Sqlite>::new(
                "INSERT INTO fees (year, semester, amount) VALUES (",
            );
            qry.separated(", ")
                .push_bind(fee.year)
                .push_bind(fee.semester)
                .push_bind(fee.amount);
            qry.push(")")
                .build()
                .execute(&mut *conn)
                .await
                .map_err(store_error)?;
            Ok(())
        })
        .await?;
        self.retrieve(fee.term()).await
    }
}

#[async_trait]
impl Update<Fee> for Connection {
    type Filter = FeeFilter;
    type Change = FeeChange;

    async fn update(&self, filter: &FeeFilter, change: &FeeChange) -> Result<u64> {
        self.bounded(async {
            let mut conn = self.lock().await;
            let mut qry = QueryBuilder::<Sqlite>::new("UPDATE fees SET ");
            match change {
                FeeChange::Deposit(delta) => {
                    // sqlite turns an overflowing sum into a REAL
                    qry.push("amount = amount + ")
                        .push_bind(*delta)
                        .push(" WHERE typeof(amount + ")
                        .push_bind(*delta)
                        .push(") = 'integer' AND amount + ")
                        .push_bind(*delta)
                        .push(" >= 0");
                }
            }
            push_fee_filter(&mut qry, filter);
            let result = qry
                .build()
                .execute(&mut *conn)
                .await
                .map_err(store_error)?;
            Ok(result.rows_affected())
        })
        .await
    }
}
