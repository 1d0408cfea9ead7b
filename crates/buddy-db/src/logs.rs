use anyhow::Result;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite};

use buddy_data::{
    Insert,
    Log,
    LogChange,
    LogFilter,
    LogId,
    LogKind,
    Query,
    QueryError,
    Retrieve,
    Update,
};

use crate::{
    results::{push_in, store_error, Id},
    Connection,
};

fn push_log_filter(qry: &mut QueryBuilder<'_, Sqlite>, filter: &LogFilter) {
    if let Some(ids) = filter.ids.clone() {
        push_in(qry, "id", ids);
    }
    if let Some(year) = filter.year {
        qry.push(" AND year = ").push_bind(year);
    }
    if let Some(semester) = filter.semester {
        qry.push(" AND semester = ").push_bind(semester);
    }
    if let Some(member_id) = filter.member_id.clone() {
        qry.push(" AND member_id = ").push_bind(member_id);
    }
    if let Some(kind) = filter.kind {
        qry.push(" AND kind = ").push_bind(kind);
    }
}

#[async_trait]
impl Query<Log> for Connection {
    type Filter = LogFilter;

    async fn query(&self, filter: &LogFilter) -> Result<Vec<Log>> {
        self.bounded(async {
            let mut conn = self.lock().await;
            let mut qry = QueryBuilder::<Sqlite>::new(
                r#"
                SELECT
                    id,
                    member_id,
                    year,
                    semester,
                    amount,
                    kind,
                    created_at,
                    updated_at
                FROM logs
                WHERE 1
                "#,
            );
            push_log_filter(&mut qry, filter);
            qry.push(" ORDER BY id");

            let logs: Vec<Log> = qry
                .build_query_as()
                .fetch_all(&mut *conn)
                .await
                .map_err(store_error)?;
            Ok(logs)
        })
        .await
    }
}

#[async_trait]
impl Retrieve<Log> for Connection {
    type Key = LogId;

    async fn retrieve(&self, id: LogId) -> Result<Log> {
        let filter = LogFilter {
            ids: Some(vec![id]),
            ..Default::default()
        };
        let mut logs: Vec<Log> = self.query(&filter).await?;
        let log = logs.pop().ok_or(QueryError::NotFound)?;
        Ok(log)
    }
}

#[async_trait]
impl Insert<Log> for Connection {
    /// File a payment log. The term must exist.
    async fn insert(&self, log: Log) -> Result<Log> {
        let insert: Id<LogId> = self
            .bounded(async {
                let mut conn = self.lock().await;
                let mut qry = QueryBuilder::<Sqlite>::new(
                    r#"INSERT INTO logs (
                        member_id,
                        year,
                        semester,
                        amount,
                        kind,
                        created_at,
                        updated_at
                    ) VALUES (
                    "#,
                );
                qry.separated(", ")
                    .push_bind(log.member_id.clone())
                    .push_bind(log.year)
                    .push_bind(log.semester)
                    .push_bind(log.amount)
                    .push_bind(log.kind)
                    .push_bind(log.created_at)
                    .push_bind(log.updated_at);
                let id: Id<LogId> = qry
                    .push(") RETURNING id")
                    .build_query_as()
                    .fetch_one(&mut *conn)
                    .await
                    .map_err(store_error)?;
                Ok(id)
            })
            .await?;
        self.retrieve(insert.id).await
    }
}

#[async_trait]
impl Update<Log> for Connection {
    type Filter = LogFilter;
    type Change = LogChange;

    async fn update(&self, filter: &LogFilter, change: &LogChange) -> Result<u64> {
        self.bounded(async {
            let mut conn = self.lock().await;
            let mut qry = QueryBuilder::<Sqlite>::new("UPDATE logs SET ");
            match change {
                LogChange::Approve { at } => {
                    qry.push("kind = ")
                        .push_bind(LogKind::Approved)
                        .push(", updated_at = ")
                        .push_bind(*at);
                }
            }
            qry.push(" WHERE 1");
            push_log_filter(&mut qry, filter);
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
