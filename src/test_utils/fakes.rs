//! Fault-injecting [`Cache`] and [`Store`] implementations.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::cache::{Cache, CacheError, CacheResult};
use crate::core::{NewParameter, NewTemplate, Parameter, ParameterId, Template, TemplateId};
use crate::query::TemplateFilter;
use crate::store::{InMemoryStore, Store, StoreError, StoreResult};

/// A cache whose every call fails, as if the cache server were down.
#[derive(Debug, Default)]
pub struct FailingCache {
    calls: AtomicUsize,
}

impl FailingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many calls were attempted.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self, operation: &str) -> CacheResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::unavailable(operation, "connection refused"))
    }
}

#[async_trait]
impl Cache for FailingCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.fail("get")
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> CacheResult<()> {
        self.fail("set")
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        self.fail("delete")
    }

    async fn increment_counter(&self, _name: &str) -> CacheResult<u64> {
        self.fail("increment_counter")
    }

    async fn get_counter(&self, _name: &str) -> CacheResult<u64> {
        self.fail("get_counter")
    }
}

/// An [`InMemoryStore`] that can be switched into failing every call.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    down: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail (`true`) or succeed again (`false`).
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self, operation: &str) -> StoreResult<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable(operation, "connection reset"));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn get_template(&self, id: TemplateId) -> StoreResult<Option<Template>> {
        self.check("get_template")?;
        self.inner.get_template(id).await
    }

    async fn get_template_by_name(&self, name: &str) -> StoreResult<Option<Template>> {
        self.check("get_template_by_name")?;
        self.inner.get_template_by_name(name).await
    }

    async fn list_templates(&self, filter: &TemplateFilter) -> StoreResult<Vec<Template>> {
        self.check("list_templates")?;
        self.inner.list_templates(filter).await
    }

    async fn insert_template(&self, template: NewTemplate) -> StoreResult<Template> {
        self.check("insert_template")?;
        self.inner.insert_template(template).await
    }

    async fn update_template(&self, template: &Template) -> StoreResult<bool> {
        self.check("update_template")?;
        self.inner.update_template(template).await
    }

    async fn delete_template(&self, id: TemplateId) -> StoreResult<bool> {
        self.check("delete_template")?;
        self.inner.delete_template(id).await
    }

    async fn get_outgoing_edges(&self, id: TemplateId) -> StoreResult<Vec<TemplateId>> {
        self.check("get_outgoing_edges")?;
        self.inner.get_outgoing_edges(id).await
    }

    async fn get_dependents(&self, id: TemplateId) -> StoreResult<Vec<TemplateId>> {
        self.check("get_dependents")?;
        self.inner.get_dependents(id).await
    }

    async fn replace_outgoing_edges(
        &self,
        id: TemplateId,
        dependencies: &[TemplateId],
    ) -> StoreResult<()> {
        self.check("replace_outgoing_edges")?;
        self.inner.replace_outgoing_edges(id, dependencies).await
    }

    async fn increment_parameter_count(&self, id: TemplateId, delta: i64) -> StoreResult<()> {
        self.check("increment_parameter_count")?;
        self.inner.increment_parameter_count(id, delta).await
    }

    async fn insert_parameter(&self, parameter: NewParameter) -> StoreResult<Parameter> {
        self.check("insert_parameter")?;
        self.inner.insert_parameter(parameter).await
    }

    async fn get_parameter(&self, id: ParameterId) -> StoreResult<Option<Parameter>> {
        self.check("get_parameter")?;
        self.inner.get_parameter(id).await
    }

    async fn update_parameter(&self, parameter: &Parameter) -> StoreResult<bool> {
        self.check("update_parameter")?;
        self.inner.update_parameter(parameter).await
    }

    async fn delete_parameter(&self, id: ParameterId) -> StoreResult<Option<Parameter>> {
        self.check("delete_parameter")?;
        self.inner.delete_parameter(id).await
    }

    async fn list_parameters(&self, template_id: TemplateId) -> StoreResult<Vec<Parameter>> {
        self.check("list_parameters")?;
        self.inner.list_parameters(template_id).await
    }
}
