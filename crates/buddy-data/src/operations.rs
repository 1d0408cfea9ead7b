use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Query<T> {
    type Filter;
    async fn query(&self, filter: &Self::Filter) -> Result<Vec<T>>;
}

#[async_trait]
pub trait Insert<T> {
    async fn insert(&self, item: T) -> Result<T>;
}

/// Apply a change to every record matching the filter.
/// Returns the number of records the filter selected.
#[async_trait]
pub trait Update<T> {
    type Filter;
    type Change;
    async fn update(
        &self,
        filter: &Self::Filter,
        change: &Self::Change,
    ) -> Result<u64>;
}

#[async_trait]
pub trait Retrieve<T> {
    type Key;
    async fn retrieve(&self, key: Self::Key) -> Result<T>;
}

/// Remove every record matching the filter and
/// return how many were removed.
#[async_trait]
pub trait Delete<T> {
    type Filter;
    async fn delete(&self, filter: &Self::Filter) -> Result<u64>;
}
