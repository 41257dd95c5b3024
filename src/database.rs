//! Database initialization and table definitions
//!
//! Every collection is a redb table mapping a record id to its JSON document.
//! Secondary indexes are separate tables whose composite string keys are laid
//! out so that a range query over a `{owner}:` prefix returns the owner's
//! entries in chronological order.

use std::sync::Arc;

use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, Table, TableDefinition,
    WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::AppResult;

/// Users by id
pub const TABLE_USERS: TableDefinition<&str, &str> = TableDefinition::new("users_v1");

/// Unique index: normalized email -> user id
pub const TABLE_USER_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("user_emails_v1");

/// Products by id
pub const TABLE_PRODUCTS: TableDefinition<&str, &str> = TableDefinition::new("products_v1");

/// Orders by id
pub const TABLE_ORDERS: TableDefinition<&str, &str> = TableDefinition::new("orders_v1");

/// Index of a user's orders
///
/// Key: `"{user_id}:{created_micros}:{order_id}"`, value: order id
pub const TABLE_USER_ORDERS: TableDefinition<&str, &str> = TableDefinition::new("user_orders_v1");

/// Unique index: transaction reference -> order id
pub const TABLE_ORDER_REFS: TableDefinition<&str, &str> = TableDefinition::new("order_refs_v1");

/// Reviews by id
pub const TABLE_REVIEWS: TableDefinition<&str, &str> = TableDefinition::new("reviews_v1");

/// Index of a product's reviews
///
/// Key: `"{product_id}:{created_micros}:{review_id}"`, value: review id
pub const TABLE_PRODUCT_REVIEWS: TableDefinition<&str, &str> =
    TableDefinition::new("product_reviews_v1");

/// One review per user and product
///
/// Key: `"{user_id}:{product_id}"`, value: review id
pub const TABLE_USER_REVIEWS: TableDefinition<&str, &str> = TableDefinition::new("user_reviews_v1");

const ALL_TABLES: [TableDefinition<&str, &str>; 9] = [
    TABLE_USERS,
    TABLE_USER_EMAILS,
    TABLE_PRODUCTS,
    TABLE_ORDERS,
    TABLE_USER_ORDERS,
    TABLE_ORDER_REFS,
    TABLE_REVIEWS,
    TABLE_PRODUCT_REVIEWS,
    TABLE_USER_REVIEWS,
];

/// Creates or opens the database file and makes sure every table exists
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    for table in ALL_TABLES {
        write_txn.open_table(table)?;
    }
    write_txn.commit()?;

    Ok(db)
}

/// Shared handle to the embedded database, opened once at startup
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    pub fn new(db: Database) -> Self {
        Self { db: Arc::new(db) }
    }

    pub fn open(db_path: &str) -> Result<Self, redb::Error> {
        init_db(db_path).map(Self::new)
    }

    pub fn read(&self) -> AppResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    pub fn write(&self) -> AppResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Reads a single document outside of any caller-held transaction
    pub fn fetch<T: DeserializeOwned>(
        &self,
        definition: TableDefinition<&str, &str>,
        key: &str,
    ) -> AppResult<Option<T>> {
        let read_txn = self.read()?;
        let table = read_txn.open_table(definition)?;
        get_json(&table, key)
    }

    /// Reads every document of a table
    pub fn fetch_all<T: DeserializeOwned>(
        &self,
        definition: TableDefinition<&str, &str>,
    ) -> AppResult<Vec<T>> {
        let read_txn = self.read()?;
        let table = read_txn.open_table(definition)?;
        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            records.push(serde_json::from_str(value.value())?);
        }
        Ok(records)
    }
}

/// Looks up and deserializes one document
pub fn get_json<T, R>(table: &R, key: &str) -> AppResult<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static str>,
{
    match table.get(key)? {
        Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
        None => Ok(None),
    }
}

/// Serializes and stores one document, replacing any previous value
pub fn put_json<T: Serialize>(
    table: &mut Table<&'static str, &'static str>,
    key: &str,
    value: &T,
) -> AppResult<()> {
    let json = serde_json::to_string(value)?;
    table.insert(key, json.as_str())?;
    Ok(())
}

/// Values of an index table whose keys start with `"{prefix}:"`, oldest first
///
/// `'{'` sorts after `':'` and after every character used in ids and
/// timestamps, so `"{prefix}:{"` is an exclusive upper bound for the prefix.
pub fn index_values<R>(table: &R, prefix: &str) -> AppResult<Vec<String>>
where
    R: ReadableTable<&'static str, &'static str>,
{
    let start_key = format!("{}:", prefix);
    let end_key = format!("{}:{{", prefix);

    let mut values = Vec::new();
    for entry in table.range(start_key.as_str()..end_key.as_str())? {
        let (_, value) = entry?;
        values.push(value.value().to_string());
    }
    Ok(values)
}

/// Composite key for a chronological index entry
pub fn index_key(owner: &str, created_micros: i64, id: &str) -> String {
    format!("{}:{:020}:{}", owner, created_micros, id)
}
