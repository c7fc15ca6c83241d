//! # JSON Document Store
//!
//! File-backed, collection-scoped document store. Each collection is a single
//! JSON file mapping document ids to documents:
//!
//! ```text
//! data/
//! ├── users.json
//! ├── groups.json
//! ├── bills.json
//! ├── notifications.json
//! ├── credentials.json
//! └── sessions.json
//! ```
//!
//! Queries support equality, array membership and half-open string ranges,
//! which is all the repositories need. Writes go through a temp file and a
//! rename, and are serialised within the process by a mutex. Nothing stops two
//! processes from overwriting each other: last writer wins.

use anyhow::{anyhow, Context, Result};
use log::{debug, error};
use serde_json::{Map, Value};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::storage::traits::Connection;
use super::{
    BillRepository, GroupRepository, LocalIdentityProvider, NotificationRepository,
    UserRepository,
};

/// Upper bound appended to a prefix to turn it into a range query
pub const PREFIX_RANGE_END: char = '\u{f8ff}';

type Collection = BTreeMap<String, Value>;

/// A single query predicate over a document's top-level field
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `doc[field] == value`
    Eq(String, Value),
    /// `doc[field]` is an array containing `value`
    ArrayContains(String, Value),
    /// `start <= doc[field] < end`, compared as strings
    Range {
        field: String,
        start: String,
        end: String,
    },
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn array_contains(field: &str, value: impl Into<Value>) -> Self {
        Filter::ArrayContains(field.to_string(), value.into())
    }

    /// Range matching every string that starts with `prefix`
    pub fn prefix(field: &str, prefix: &str) -> Self {
        Filter::Range {
            field: field.to_string(),
            start: prefix.to_string(),
            end: format!("{}{}", prefix, PREFIX_RANGE_END),
        }
    }

    fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::Eq(field, expected) => document.get(field) == Some(expected),
            Filter::ArrayContains(field, expected) => document
                .get(field)
                .and_then(Value::as_array)
                .map(|values| values.contains(expected))
                .unwrap_or(false),
            Filter::Range { field, start, end } => document
                .get(field)
                .and_then(Value::as_str)
                .map(|value| value >= start.as_str() && value < end.as_str())
                .unwrap_or(false),
        }
    }
}

/// Sort order for query results
#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    pub field: String,
    pub descending: bool,
}

impl Ordering {
    pub fn ascending(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }

    pub fn descending(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.total_cmp(&b)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None, Some(_)) => CmpOrdering::Less,
        (Some(_), None) => CmpOrdering::Greater,
        _ => CmpOrdering::Equal,
    }
}

/// JsonConnection owns the data directory and all collection files in it
#[derive(Clone)]
pub struct JsonConnection {
    base_directory: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl JsonConnection {
    /// Create a new connection, creating the base directory if needed
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).with_context(|| {
                format!("Failed to create data directory {}", base_path.display())
            })?;
        }

        Ok(Self {
            base_directory: base_path,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.base_directory.join(format!("{}.json", collection))
    }

    fn load_collection(&self, collection: &str) -> Result<Collection> {
        let path = self.collection_path(collection);
        if !path.exists() {
            return Ok(Collection::new());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read collection {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Collection::new());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("Collection {} is not valid JSON", path.display()))
    }

    fn save_collection(&self, collection: &str, documents: &Collection) -> Result<()> {
        let path = self.collection_path(collection);
        let content = serde_json::to_string_pretty(documents)?;

        // Atomic write using temp file
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| {
            error!("Failed to write {}: {}", temp_path.display(), e);
            anyhow!("Failed to write collection '{}': {}", collection, e)
        })?;
        fs::rename(&temp_path, &path)?;

        debug!("Saved {} documents to {}", documents.len(), path.display());
        Ok(())
    }

    /// Run a read-modify-write cycle on one collection under the write lock
    fn modify_collection<T>(
        &self,
        collection: &str,
        change: impl FnOnce(&mut Collection) -> Result<T>,
    ) -> Result<T> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("Document store lock poisoned"))?;

        let mut documents = self.load_collection(collection)?;
        let result = change(&mut documents)?;
        self.save_collection(collection, &documents)?;
        Ok(result)
    }

    /// Fetch one document by id
    pub fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let documents = self.load_collection(collection)?;
        Ok(documents.get(id).cloned())
    }

    /// Return `(id, document)` pairs matching every filter, optionally sorted
    pub fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        ordering: Option<&Ordering>,
    ) -> Result<Vec<(String, Value)>> {
        let documents = self.load_collection(collection)?;

        let mut matches: Vec<(String, Value)> = documents
            .into_iter()
            .filter(|(_, document)| filters.iter().all(|filter| filter.matches(document)))
            .collect();

        if let Some(ordering) = ordering {
            matches.sort_by(|(_, a), (_, b)| {
                let order = compare_values(a.get(&ordering.field), b.get(&ordering.field));
                if ordering.descending {
                    order.reverse()
                } else {
                    order
                }
            });
        }

        debug!(
            "Query on '{}' with {} filters matched {} documents",
            collection,
            filters.len(),
            matches.len()
        );
        Ok(matches)
    }

    /// Insert a document under a freshly generated id and return the id
    pub fn add(&self, collection: &str, document: Value) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.set(collection, &id, document)?;
        Ok(id)
    }

    /// Insert or replace the document stored under `id`
    pub fn set(&self, collection: &str, id: &str, document: Value) -> Result<()> {
        self.modify_collection(collection, |documents| {
            documents.insert(id.to_string(), document);
            Ok(())
        })
    }

    /// Shallow-merge `partial`'s top-level fields into an existing document
    pub fn update(&self, collection: &str, id: &str, partial: Value) -> Result<()> {
        let fields = match partial {
            Value::Object(fields) => fields,
            other => return Err(anyhow!("Partial update must be an object, got {}", other)),
        };

        self.modify_collection(collection, |documents| {
            let document = documents
                .get_mut(id)
                .ok_or_else(|| anyhow!("No document '{}' in collection '{}'", id, collection))?;
            let target: &mut Map<String, Value> = document
                .as_object_mut()
                .ok_or_else(|| anyhow!("Document '{}' in '{}' is not an object", id, collection))?;
            for (key, value) in fields {
                target.insert(key, value);
            }
            Ok(())
        })
    }
}

impl Connection for JsonConnection {
    type BillRepository = BillRepository;
    type GroupRepository = GroupRepository;
    type NotificationRepository = NotificationRepository;
    type UserRepository = UserRepository;
    type IdentityProvider = LocalIdentityProvider;

    fn create_bill_repository(&self) -> Self::BillRepository {
        BillRepository::new(self.clone())
    }

    fn create_group_repository(&self) -> Self::GroupRepository {
        GroupRepository::new(self.clone())
    }

    fn create_notification_repository(&self) -> Self::NotificationRepository {
        NotificationRepository::new(self.clone())
    }

    fn create_user_repository(&self) -> Self::UserRepository {
        UserRepository::new(self.clone())
    }

    fn create_identity_provider(&self) -> Self::IdentityProvider {
        LocalIdentityProvider::new(self.clone())
    }
}
