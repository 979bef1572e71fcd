//! The query engine: one typed collection, five CRUD operations and list.
//!
//! A [`Query`] is a by-value builder. Configure it, then call a terminal
//! operation with a [`Context`]. Each operation is a single attempt: errors
//! from the store are labelled with the failing stage and returned, never
//! retried.
//!
//! Existence checks (create, update, delete, patch) are a separate store
//! round trip from the write that follows. Two concurrent creates of one key
//! can both pass the check; the last write wins.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use keyline_merge::{merge_patch_bytes, MergeError};
use keyline_store::{Context, DeleteResponse, KeyValue, KvStore, PutResponse, Revision};
use keyline_types::{HookMethod, Model};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{QueryError, QueryResult, Stage};
use crate::hook::{snapshot, Hook, HookParams, HookPipeline, QueryHandle};
use crate::key::{resource_prefix, KeyResolver};
use crate::list::{default_order, paginate, ListOutput};

/// Rewrites a decoded record before it is returned. Receives the storage key.
pub type FormatFn<M> = Box<dyn Fn(&str, M) -> M + Send + Sync>;
/// Keeps a decoded record in list results. Receives the storage key.
pub type FilterFn<M> = Box<dyn Fn(&str, &M) -> bool + Send + Sync>;
/// Orders list results.
pub type SortFn<M> = Box<dyn Fn(&M, &M) -> Ordering + Send + Sync>;

/// Typed query over the collection of model `M`.
pub struct Query<M: Model> {
    store: Arc<dyn KvStore>,
    root_prefix: String,
    resource_override: Option<String>,
    format: Option<FormatFn<M>>,
    filter: Option<FilterFn<M>>,
    sort: Option<SortFn<M>>,
    page: i64,
    page_size: i64,
    hooks: HookPipeline,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Query<M> {
    /// A query over `store` under `root_prefix`, observed by `hooks` plus any
    /// hooks added later with [`Query::hook`].
    pub fn new(store: Arc<dyn KvStore>, root_prefix: impl Into<String>, hooks: Arc<[Hook]>) -> Self {
        Self {
            store,
            root_prefix: root_prefix.into(),
            resource_override: None,
            format: None,
            filter: None,
            sort: None,
            page: 0,
            page_size: 0,
            hooks: HookPipeline::new(hooks),
            _model: PhantomData,
        }
    }

    // ---- Builder ----

    /// Re-target the query at model `N`.
    ///
    /// Prefixes, pagination and hooks carry over. Format, filter and sort
    /// functions are typed by the model and are dropped.
    pub fn with_type<N: Model>(self) -> Query<N> {
        Query {
            store: self.store,
            root_prefix: self.root_prefix,
            resource_override: self.resource_override,
            format: None,
            filter: None,
            sort: None,
            page: self.page,
            page_size: self.page_size,
            hooks: self.hooks,
            _model: PhantomData,
        }
    }

    /// Override the resource prefix derived from the model.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.resource_override = Some(prefix.into());
        self
    }

    pub fn format<F>(mut self, format: F) -> Self
    where
        F: Fn(&str, M) -> M + Send + Sync + 'static,
    {
        self.format = Some(Box::new(format));
        self
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str, &M) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn sort<F>(mut self, sort: F) -> Self
    where
        F: Fn(&M, &M) -> Ordering + Send + Sync + 'static,
    {
        self.sort = Some(Box::new(sort));
        self
    }

    /// 1-based page for list. Non-positive disables pagination.
    pub fn page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }

    /// Page size for list. Non-positive disables pagination.
    pub fn page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Add a hook observing only this query.
    pub fn hook(mut self, hook: Hook) -> Self {
        self.hooks.push(hook);
        self
    }

    // ---- Accessors ----

    pub fn resource_prefix(&self) -> String {
        resource_prefix::<M>(self.resource_override.as_deref())
    }

    pub fn resolver(&self) -> KeyResolver {
        KeyResolver::new(self.root_prefix.clone(), self.resource_prefix())
    }

    /// Full storage key of record `key`.
    pub fn storage_key(&self, key: &str) -> QueryResult<String> {
        self.resolver().record_key(key)
    }

    /// Untyped view of this query's connection and key layout, as handed to
    /// hook handlers.
    pub fn handle(&self) -> QueryHandle {
        QueryHandle::new(self.store.clone(), self.root_prefix.clone(), self.resource_prefix())
    }

    pub fn hooks(&self) -> &HookPipeline {
        &self.hooks
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    // ---- Operations ----

    /// Store `obj` under `key`, failing with [`QueryError::AlreadyExists`]
    /// if a record is already there.
    pub async fn create(&self, ctx: &Context, key: &str, obj: &M) -> QueryResult<PutResponse> {
        let storage_key = self.storage_key(key)?;
        if self.fetch(ctx, &storage_key, Stage::Create).await?.is_some() {
            return Err(QueryError::AlreadyExists { key: storage_key });
        }
        let raw = encode(obj)?;
        let resp = self.put(ctx, &storage_key, raw, Stage::Create).await?;
        debug!(key = %storage_key, revision = resp.revision, "created record");

        self.fire(ctx, HookMethod::Create, || {
            let value = snapshot(obj);
            self.params(HookMethod::Create, key, value.clone(), resp.revision, value)
        });
        Ok(resp)
    }

    /// Decode the record stored under `key`, applying the format function.
    pub async fn get(&self, ctx: &Context, key: &str) -> QueryResult<M> {
        let storage_key = self.storage_key(key)?;
        let value = self.read(ctx, &storage_key).await?;
        let value = self.apply_format(&storage_key, value);

        self.fire(ctx, HookMethod::Get, || {
            self.params(HookMethod::Get, key, None, 0, snapshot(&value))
        });
        Ok(value)
    }

    /// Overwrite the record under `key`.
    ///
    /// The existence check is a full [`Query::get`]: it applies the format
    /// function and fires get hooks. A missing record fails with a wrapped
    /// [`QueryError::NotFound`], unless `create_if_not_exist` is set, in
    /// which case this is a [`Query::create`] (and fires create hooks, not
    /// update hooks).
    pub async fn update(
        &self,
        ctx: &Context,
        key: &str,
        obj: &M,
        create_if_not_exist: bool,
    ) -> QueryResult<PutResponse> {
        let storage_key = self.storage_key(key)?;
        match self.get(ctx, key).await {
            Ok(_) => {}
            Err(err) if err.is_not_found() && create_if_not_exist => {
                debug!(key = %storage_key, "update of missing record falls back to create");
                return self.create(ctx, key, obj).await;
            }
            Err(err @ QueryError::Store { .. }) => return Err(err),
            Err(err) => return Err(err.wrap(Stage::Read)),
        }

        let raw = encode(obj)?;
        let resp = self.put(ctx, &storage_key, raw, Stage::Update).await?;
        debug!(key = %storage_key, revision = resp.revision, "updated record");

        self.fire(ctx, HookMethod::Update, || {
            let value = snapshot(obj);
            self.params(HookMethod::Update, key, value.clone(), resp.revision, value)
        });
        Ok(resp)
    }

    /// Remove the record under `key`. Hooks receive the removed value.
    pub async fn delete(&self, ctx: &Context, key: &str) -> QueryResult<DeleteResponse> {
        let storage_key = self.storage_key(key)?;
        let previous = self
            .fetch(ctx, &storage_key, Stage::Delete)
            .await?
            .ok_or_else(|| QueryError::NotFound {
                key: storage_key.clone(),
            })?;

        let resp = ctx
            .run(self.store.delete(&storage_key))
            .await
            .map_err(|e| QueryError::store(Stage::Delete, e))?;
        if resp.deleted == 0 {
            // Removed by someone else between the read and the delete.
            return Err(QueryError::NotFound { key: storage_key });
        }
        debug!(key = %storage_key, revision = resp.revision, "deleted record");

        self.fire(ctx, HookMethod::Delete, || {
            let val = match self.decode(&storage_key, &previous.value) {
                Ok(value) => snapshot(&value),
                Err(e) => {
                    warn!(key = %storage_key, error = %e, "deleted record did not decode; hooks get no value");
                    None
                }
            };
            self.params(HookMethod::Delete, key, val, resp.revision, None)
        });
        Ok(resp)
    }

    /// Apply `patch` to the record under `key` as a JSON merge patch.
    pub async fn patch<P>(&self, ctx: &Context, key: &str, patch: &P) -> QueryResult<PutResponse>
    where
        P: Serialize + ?Sized,
    {
        let doc = serde_json::to_vec(patch).map_err(QueryError::Encode)?;
        self.apply_patch(ctx, key, &doc).await
    }

    /// Apply a raw JSON merge-patch document to the record under `key`. A
    /// malformed document fails with [`QueryError::Patch`].
    pub async fn patch_raw(&self, ctx: &Context, key: &str, patch: &str) -> QueryResult<PutResponse> {
        self.apply_patch(ctx, key, patch.as_bytes()).await
    }

    /// Every record in the collection, filtered, formatted, sorted and
    /// paginated. One undecodable record fails the whole call.
    pub async fn list(&self, ctx: &Context) -> QueryResult<ListOutput<M>> {
        let prefix = self.resolver().scan_prefix();
        let kvs = ctx
            .run(self.store.scan(&prefix))
            .await
            .map_err(|e| QueryError::store(Stage::List, e))?;

        let mut rows = Vec::with_capacity(kvs.len());
        for kv in kvs {
            let value = self
                .decode(&kv.key, &kv.value)
                .map_err(|e| e.wrap(Stage::List))?;
            if let Some(filter) = &self.filter {
                if !filter(&kv.key, &value) {
                    continue;
                }
            }
            rows.push(self.apply_format(&kv.key, value));
        }

        let total_size = rows.len();
        match &self.sort {
            Some(sort) => rows.sort_by(|a, b| sort(a, b)),
            None => rows.sort_by(default_order::<M>),
        }
        let output = ListOutput {
            rows: paginate(rows, self.page, self.page_size),
            total_size,
        };
        debug!(prefix = %prefix, total = total_size, returned = output.rows.len(), "listed records");

        self.fire(ctx, HookMethod::List, || {
            self.params(HookMethod::List, "", None, 0, snapshot(&output))
        });
        Ok(output)
    }

    // ---- Internals ----

    async fn apply_patch(&self, ctx: &Context, key: &str, patch: &[u8]) -> QueryResult<PutResponse> {
        let storage_key = self.storage_key(key)?;
        let original = self
            .fetch(ctx, &storage_key, Stage::Patch)
            .await?
            .ok_or_else(|| QueryError::NotFound {
                key: storage_key.clone(),
            })?;

        let doc = merge_patch_bytes(original.value.as_bytes(), patch).map_err(|e| match e {
            MergeError::InvalidDocument(source) => QueryError::Decode {
                key: storage_key.clone(),
                type_name: M::type_name(),
                source,
            },
            other => QueryError::Patch {
                key: storage_key.clone(),
                source: other,
            },
        })?;

        // The merged document must still be a valid record before it is
        // written.
        let merged: M = serde_json::from_slice(&doc)
            .map_err(|source| QueryError::Decode {
                key: storage_key.clone(),
                type_name: M::type_name(),
                source,
            })
            .map_err(|e| e.wrap(Stage::Patch))?;

        let raw = String::from_utf8_lossy(&doc).into_owned();
        let resp = self.put(ctx, &storage_key, raw, Stage::Patch).await?;
        debug!(key = %storage_key, revision = resp.revision, "patched record");

        // Patch hooks carry the revision of the record the patch was applied
        // to, not the store-wide revision at read time.
        self.fire(ctx, HookMethod::Patch, || {
            let value = snapshot(&merged);
            self.params(HookMethod::Patch, key, value.clone(), original.mod_revision, value)
        });
        Ok(resp)
    }

    async fn fetch(&self, ctx: &Context, storage_key: &str, stage: Stage) -> QueryResult<Option<KeyValue>> {
        ctx.run(self.store.get(storage_key))
            .await
            .map_err(|e| QueryError::store(stage, e))
    }

    async fn read(&self, ctx: &Context, storage_key: &str) -> QueryResult<M> {
        let kv = self
            .fetch(ctx, storage_key, Stage::Read)
            .await?
            .ok_or_else(|| QueryError::NotFound {
                key: storage_key.to_string(),
            })?;
        self.decode(storage_key, &kv.value)
    }

    async fn put(&self, ctx: &Context, storage_key: &str, raw: String, stage: Stage) -> QueryResult<PutResponse> {
        ctx.run(self.store.put(storage_key, raw))
            .await
            .map_err(|e| QueryError::store(stage, e))
    }

    fn decode(&self, storage_key: &str, raw: &str) -> QueryResult<M> {
        serde_json::from_str(raw).map_err(|source| QueryError::Decode {
            key: storage_key.to_string(),
            type_name: M::type_name(),
            source,
        })
    }

    fn apply_format(&self, storage_key: &str, value: M) -> M {
        match &self.format {
            Some(format) => format(storage_key, value),
            None => value,
        }
    }

    fn fire<F>(&self, ctx: &Context, method: HookMethod, build: F)
    where
        F: FnOnce() -> HookParams,
    {
        self.hooks.dispatch(ctx, method, || (self.handle(), build()));
    }

    fn params(
        &self,
        method: HookMethod,
        key: &str,
        val: Option<Value>,
        revision: Revision,
        result: Option<Value>,
    ) -> HookParams {
        HookParams {
            method,
            resource_prefix: self.resource_prefix(),
            key: key.to_string(),
            val,
            revision,
            result,
        }
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> QueryResult<String> {
    serde_json::to_string(value).map_err(QueryError::Encode)
}

impl<M: Model> fmt::Debug for Query<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("model", &M::type_name())
            .field("root_prefix", &self.root_prefix)
            .field("resource_prefix", &self.resource_prefix())
            .field("page", &self.page)
            .field("page_size", &self.page_size)
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}
