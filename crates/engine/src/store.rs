//! Transaction persistence.
//!
//! The engine only needs two capabilities from a backend, captured by
//! [`TransactionStore`]. Both shipped backends use the same keyspace: one flat
//! namespace where a transaction lives under `tx:<id>` as a JSON document.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use sea_orm::{ActiveModelTrait, ActiveValue, DatabaseConnection, EntityTrait};
use tracing::{debug, info, warn};

use crate::{EngineError, RequestContext, ResultEngine, kv, transactions::Transaction};

/// Key of a transaction in the flat keyspace.
#[must_use]
pub fn transaction_key(id: &str) -> String {
    format!("tx:{id}")
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Persists a new transaction and returns its id.
    async fn store(&self, ctx: &RequestContext, transaction: &Transaction) -> ResultEngine<String>;

    /// Fails with [`EngineError::KeyNotFound`] for unknown ids.
    async fn find_by_id(&self, ctx: &RequestContext, id: &str) -> ResultEngine<Transaction>;
}

fn encode(transaction: &Transaction) -> ResultEngine<String> {
    serde_json::to_string(transaction).map_err(|source| EngineError::Corrupted {
        key: transaction_key(&transaction.id.to_string()),
        source,
    })
}

fn decode(ctx: &RequestContext, key: &str, value: &str) -> ResultEngine<Transaction> {
    let transaction: Transaction =
        serde_json::from_str(value).map_err(|source| EngineError::Corrupted {
            key: key.to_string(),
            source,
        })?;

    if transaction.is_expired(Utc::now()) {
        warn!(
            request_id = ctx.log_id(),
            id = %transaction.id,
            expires_at = ?transaction.expires_at,
            "transaction retention period is over but it was not deleted"
        );
    }
    Ok(transaction)
}

/// SQLite (or any sea-orm backend) store on the `kv_entries` table.
#[derive(Clone, Debug)]
pub struct SqlStore {
    db: DatabaseConnection,
}

impl SqlStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TransactionStore for SqlStore {
    async fn store(&self, ctx: &RequestContext, transaction: &Transaction) -> ResultEngine<String> {
        let id = transaction.id.to_string();
        let key = transaction_key(&id);
        debug!(request_id = ctx.log_id(), %key, "storing transaction");

        kv::ActiveModel {
            key: ActiveValue::Set(key),
            value: ActiveValue::Set(encode(transaction)?),
            expires_at: ActiveValue::Set(transaction.expires_at),
        }
        .insert(&self.db)
        .await?;

        info!(request_id = ctx.log_id(), %id, "transaction stored");
        Ok(id)
    }

    async fn find_by_id(&self, ctx: &RequestContext, id: &str) -> ResultEngine<Transaction> {
        let key = transaction_key(id);
        debug!(request_id = ctx.log_id(), %key, "finding transaction");

        let entry = kv::Entity::find_by_id(key.clone())
            .one(&self.db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(id.to_string()))?;

        decode(ctx, &key, &entry.value)
    }
}

/// Process-local store, for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn store(
        &self,
        _ctx: &RequestContext,
        transaction: &Transaction,
    ) -> ResultEngine<String> {
        let id = transaction.id.to_string();
        let value = encode(transaction)?;
        self.entries.write().insert(transaction_key(&id), value);
        Ok(id)
    }

    async fn find_by_id(&self, ctx: &RequestContext, id: &str) -> ResultEngine<Transaction> {
        let key = transaction_key(id);
        let value = self
            .entries
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| EngineError::KeyNotFound(id.to_string()))?;
        decode(ctx, &key, &value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MoneyCents, commands::CreateTransactionCmd};
    use chrono::NaiveDate;

    fn sample() -> Transaction {
        CreateTransactionCmd::new("Test", "2023-04-15", "123.45".parse().unwrap())
            .validate(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .unwrap()
    }

    #[test]
    fn keys_are_prefixed() {
        assert_eq!(transaction_key("abc"), "tx:abc");
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        let ctx = RequestContext::default();
        let tx = sample();

        let id = store.store(&ctx, &tx).await.unwrap();
        assert_eq!(id, tx.id.to_string());

        let found = store.find_by_id(&ctx, &id).await.unwrap();
        assert_eq!(found, tx);
        assert_eq!(found.amount, MoneyCents::new(12345));
    }

    #[tokio::test]
    async fn memory_store_unknown_id() {
        let store = MemoryStore::new();
        let err = store
            .find_by_id(&RequestContext::default(), "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::KeyNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn corrupted_value_is_reported() {
        let store = MemoryStore::new();
        store
            .entries
            .write()
            .insert(transaction_key("bad"), "{not json".to_string());

        let err = store
            .find_by_id(&RequestContext::default(), "bad")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Corrupted { .. }));
    }
}
