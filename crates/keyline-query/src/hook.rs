//! Post-operation observers.
//!
//! Hooks run synchronously, in-process, after an operation has succeeded and
//! before it returns to the caller. A handler that blocks, blocks the
//! operation; a handler that panics, unwinds through it. Failed operations
//! never dispatch.
//!
//! Dispatch order: facade-level hooks first, then hooks added to the query,
//! each level in registration order.
//!
//! Handlers receive a [`QueryHandle`] on the connection the operation ran
//! against, so they can issue follow-up queries of their own.

use std::fmt;
use std::sync::Arc;

use keyline_store::{Context, KvStore, Revision};
use keyline_types::{HookMethod, Model};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::query::Query;

type Handler = dyn Fn(&Context, &QueryHandle, &HookParams) + Send + Sync;

/// A named, method-filtered observer.
#[derive(Clone)]
pub struct Hook {
    pub name: String,
    /// Methods this hook fires for. [`HookMethod::All`] matches everything.
    pub methods: Vec<HookMethod>,
    handler: Arc<Handler>,
}

impl Hook {
    pub fn new<F>(name: impl Into<String>, methods: impl Into<Vec<HookMethod>>, handler: F) -> Self
    where
        F: Fn(&Context, &QueryHandle, &HookParams) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            methods: methods.into(),
            handler: Arc::new(handler),
        }
    }

    /// Returns `true` if the hook fires for `method`.
    pub fn applies_to(&self, method: HookMethod) -> bool {
        self.methods
            .iter()
            .any(|m| *m == HookMethod::All || *m == method)
    }

    pub fn call(&self, ctx: &Context, handle: &QueryHandle, params: &HookParams) {
        (self.handler)(ctx, handle, params)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("name", &self.name)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

/// The issuing query's connection and key layout, minus its type and hooks.
///
/// Queries built from a handle carry no hooks, so a handler's follow-up
/// writes never re-enter the pipeline.
#[derive(Clone)]
pub struct QueryHandle {
    store: Arc<dyn KvStore>,
    root_prefix: String,
    resource_prefix: String,
}

impl QueryHandle {
    pub fn new(store: Arc<dyn KvStore>, root_prefix: impl Into<String>, resource_prefix: impl Into<String>) -> Self {
        Self {
            store,
            root_prefix: root_prefix.into(),
            resource_prefix: resource_prefix.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub fn root_prefix(&self) -> &str {
        &self.root_prefix
    }

    /// Resource prefix of the collection the issuing query addressed.
    pub fn resource_prefix(&self) -> &str {
        &self.resource_prefix
    }

    /// A fresh query over model `M` on the same connection and root prefix.
    pub fn query<M: Model>(&self) -> Query<M> {
        Query::new(self.store.clone(), self.root_prefix.clone(), Arc::from(Vec::new()))
    }
}

impl fmt::Debug for QueryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryHandle")
            .field("root_prefix", &self.root_prefix)
            .field("resource_prefix", &self.resource_prefix)
            .finish_non_exhaustive()
    }
}

/// Immutable snapshot handed to hook handlers.
///
/// Values are the JSON form of the typed objects: facade-level hooks see
/// every model type, so they observe records as documents.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HookParams {
    pub method: HookMethod,
    /// Resource prefix of the collection the query addressed.
    pub resource_prefix: String,
    /// The record key as passed by the caller (empty for list).
    pub key: String,
    /// The value the caller supplied, or the previous value for delete.
    pub val: Option<Value>,
    /// Store revision produced by the mutation (0 for reads).
    pub revision: Revision,
    /// The operation's result.
    pub result: Option<Value>,
}

/// Facade-level hooks followed by query-level hooks.
#[derive(Clone, Debug)]
pub struct HookPipeline {
    shared: Arc<[Hook]>,
    local: Vec<Hook>,
}

impl HookPipeline {
    pub fn new(shared: Arc<[Hook]>) -> Self {
        Self {
            shared,
            local: Vec::new(),
        }
    }

    pub fn push(&mut self, hook: Hook) {
        self.local.push(hook);
    }

    /// All hooks in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &Hook> {
        self.shared.iter().chain(self.local.iter())
    }

    pub fn len(&self) -> usize {
        self.shared.len() + self.local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if any hook fires for `method`.
    pub fn wants(&self, method: HookMethod) -> bool {
        self.iter().any(|h| h.applies_to(method))
    }

    /// Invoke every applicable hook. `build` runs only if at least one hook
    /// applies, so unobserved operations never pay for the JSON snapshot.
    pub fn dispatch<F>(&self, ctx: &Context, method: HookMethod, build: F)
    where
        F: FnOnce() -> (QueryHandle, HookParams),
    {
        if !self.wants(method) {
            return;
        }
        let (handle, params) = build();
        for hook in self.iter().filter(|h| h.applies_to(method)) {
            hook.call(ctx, &handle, &params);
        }
    }
}

impl Default for HookPipeline {
    fn default() -> Self {
        Self::new(Arc::from(Vec::new()))
    }
}

/// JSON snapshot of a value for hook params. Encoding failures degrade to
/// `None` rather than failing an operation that already succeeded.
pub(crate) fn snapshot<T: Serialize + ?Sized>(value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(error = %e, "hook value could not be encoded");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use keyline_store::InMemoryKvStore;

    use super::*;

    fn call(method: HookMethod) -> (QueryHandle, HookParams) {
        let handle = QueryHandle::new(Arc::new(InMemoryKvStore::new()), "/apisix", "routes");
        let params = HookParams {
            method,
            resource_prefix: "routes".into(),
            key: "1".into(),
            val: None,
            revision: 0,
            result: None,
        };
        (handle, params)
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &str, methods: Vec<HookMethod>) -> Hook {
        let log = log.clone();
        let tag = name.to_string();
        Hook::new(name, methods, move |_, _, p| {
            log.lock().unwrap().push(format!("{tag}:{}", p.method));
        })
    }

    #[test]
    fn method_filter() {
        let hook = Hook::new("h", vec![HookMethod::Create, HookMethod::Update], |_, _, _| {});
        assert!(hook.applies_to(HookMethod::Create));
        assert!(hook.applies_to(HookMethod::Update));
        assert!(!hook.applies_to(HookMethod::Get));
        assert!(!hook.applies_to(HookMethod::List));
    }

    #[test]
    fn wildcard_matches_everything() {
        let hook = Hook::new("h", vec![HookMethod::All], |_, _, _| {});
        for method in HookMethod::CONCRETE {
            assert!(hook.applies_to(method));
        }
    }

    #[test]
    fn no_methods_matches_nothing() {
        let hook = Hook::new("h", Vec::<HookMethod>::new(), |_, _, _| {});
        assert!(!hook.applies_to(HookMethod::Get));
    }

    #[test]
    fn shared_hooks_run_before_local_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let shared: Arc<[Hook]> = vec![
            recorder(&log, "s1", vec![HookMethod::All]),
            recorder(&log, "s2", vec![HookMethod::Get]),
        ]
        .into();
        let mut pipeline = HookPipeline::new(shared);
        pipeline.push(recorder(&log, "l1", vec![HookMethod::All]));
        pipeline.push(recorder(&log, "l2", vec![HookMethod::Delete]));

        pipeline.dispatch(&Context::background(), HookMethod::Get, || call(HookMethod::Get));
        assert_eq!(*log.lock().unwrap(), vec!["s1:get", "s2:get", "l1:get"]);
    }

    #[test]
    fn params_built_only_when_observed() {
        let pipeline = HookPipeline::new(
            vec![Hook::new("h", vec![HookMethod::Create], |_, _, _| {})].into(),
        );
        let mut built = false;
        pipeline.dispatch(&Context::background(), HookMethod::Get, || {
            built = true;
            call(HookMethod::Get)
        });
        assert!(!built);
    }

    #[test]
    fn local_hooks_do_not_leak_into_shared_set() {
        let shared: Arc<[Hook]> = vec![Hook::new("s", vec![HookMethod::All], |_, _, _| {})].into();
        let mut a = HookPipeline::new(shared.clone());
        a.push(Hook::new("l", vec![HookMethod::All], |_, _, _| {}));
        let b = HookPipeline::new(shared);
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn handlers_see_the_issuing_connection() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let pipeline = HookPipeline::new(
            vec![Hook::new("h", vec![HookMethod::All], move |_, handle, _| {
                *sink.lock().unwrap() = Some(handle.clone());
            })]
            .into(),
        );
        let (handle, params) = call(HookMethod::Update);
        let store = handle.store().clone();
        pipeline.dispatch(&Context::background(), HookMethod::Update, || (handle, params));

        let seen = seen.lock().unwrap().clone().unwrap();
        assert!(Arc::ptr_eq(seen.store(), &store));
        assert_eq!(seen.root_prefix(), "/apisix");
        assert_eq!(seen.resource_prefix(), "routes");
    }
}
