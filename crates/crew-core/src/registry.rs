//! Name-keyed registries of agent and skill factories.
//!
//! A registry maps a unique name to a factory closure plus a category.
//! Instances are built on demand: `get_instance` caches exactly one shared
//! instance per name while `create` always builds a fresh one.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

use crate::error::RegistryError;
use crate::models::Metadata;

/// Builds one instance of a registered item.
pub type Factory<T> = Arc<dyn Fn() -> Arc<T> + Send + Sync>;

struct Entry<T: ?Sized> {
    factory: Factory<T>,
    category: String,
    metadata: Metadata,
}

struct RegistryInner<T: ?Sized> {
    entries: HashMap<String, Entry<T>>,
    /// Registration order, used for every listing.
    order: Vec<String>,
    instances: HashMap<String, Arc<T>>,
}

pub struct Registry<T: ?Sized> {
    kind: String,
    inner: RwLock<RegistryInner<T>>,
}

impl<T: ?Sized> Registry<T> {
    /// `kind` names the registry in errors and logs ("Agent", "Skill").
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            inner: RwLock::new(RegistryInner {
                entries: HashMap::new(),
                order: Vec::new(),
                instances: HashMap::new(),
            }),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Register a factory. Fails with `Duplicate` if the name is taken.
    pub fn register<F>(&self, name: &str, category: &str, factory: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        self.add(name, category, Metadata::new(), Arc::new(factory), false)
    }

    /// Register a factory, replacing any existing entry with the same name.
    pub fn register_replacing<F>(&self, name: &str, category: &str, factory: F)
    where
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        // Replacement never reports a duplicate.
        let _ = self.add(name, category, Metadata::new(), Arc::new(factory), true);
    }

    pub fn add(
        &self,
        name: &str,
        category: &str,
        metadata: Metadata,
        factory: Factory<T>,
        replace: bool,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.entries.contains_key(name) {
            if !replace {
                return Err(RegistryError::Duplicate {
                    registry: self.kind.clone(),
                    name: name.to_string(),
                });
            }
            inner.instances.remove(name);
        } else {
            inner.order.push(name.to_string());
        }
        inner.entries.insert(
            name.to_string(),
            Entry {
                factory,
                category: category.to_string(),
                metadata,
            },
        );
        tracing::debug!("[Registry:{}] Registered '{}' ({})", self.kind, name, category);
        Ok(())
    }

    pub fn remove(&self, name: &str) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.entries.remove(name).is_none() {
            return false;
        }
        inner.instances.remove(name);
        inner.order.retain(|n| n != name);
        true
    }

    pub fn get(&self, name: &str) -> Option<Factory<T>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.entries.get(name).map(|e| e.factory.clone())
    }

    /// The shared instance for `name`, built on first use.
    pub fn get_instance(&self, name: &str) -> Option<Arc<T>> {
        let factory = {
            let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(instance) = inner.instances.get(name) {
                return Some(instance.clone());
            }
            inner.entries.get(name)?.factory.clone()
        };

        // Build outside the lock so factories may consult other registries.
        let built = factory();
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if !inner.entries.contains_key(name) {
            return None;
        }
        Some(inner.instances.entry(name.to_string()).or_insert(built).clone())
    }

    /// Like `get_instance`, but a missing name is an error.
    pub fn require_instance(&self, name: &str) -> Result<Arc<T>, RegistryError> {
        self.get_instance(name).ok_or_else(|| RegistryError::NotFound {
            registry: self.kind.clone(),
            name: name.to_string(),
        })
    }

    /// A fresh instance, never cached.
    pub fn create(&self, name: &str) -> Option<Arc<T>> {
        self.get(name).map(|factory| factory())
    }

    pub fn has(&self, name: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.entries.contains_key(name)
    }

    pub fn list_all(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.order.clone()
    }

    pub fn list_by_category(&self, category: &str) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .order
            .iter()
            .filter(|name| inner.entries.get(*name).is_some_and(|e| e.category == category))
            .cloned()
            .collect()
    }

    pub fn categories(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut seen: Vec<String> = Vec::new();
        for name in &inner.order {
            if let Some(entry) = inner.entries.get(name) {
                if !seen.contains(&entry.category) {
                    seen.push(entry.category.clone());
                }
            }
        }
        seen
    }

    /// Registration metadata, with the category included under `category`.
    pub fn metadata(&self, name: &str) -> Option<Metadata> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.entries.get(name).map(|entry| {
            let mut meta = entry.metadata.clone();
            meta.insert("category".into(), Value::String(entry.category.clone()));
            meta
        })
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.entries.clear();
        inner.order.clear();
        inner.instances.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Fixed(&'static str);

    impl Greeter for Fixed {
        fn greet(&self) -> String {
            self.0.to_string()
        }
    }

    fn registry() -> Registry<dyn Greeter> {
        Registry::new("Greeter")
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let reg = registry();
        reg.register("hello", "basic", || Arc::new(Fixed("hi")) as Arc<dyn Greeter>)
            .unwrap();
        let err = reg
            .register("hello", "basic", || Arc::new(Fixed("again")) as Arc<dyn Greeter>)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate { ref name, .. } if name == "hello"));
        assert_eq!(reg.create("hello").unwrap().greet(), "hi");
    }

    #[test]
    fn test_replacement_swaps_mapping_and_cache() {
        let reg = registry();
        reg.register("hello", "basic", || Arc::new(Fixed("hi")) as Arc<dyn Greeter>)
            .unwrap();
        assert_eq!(reg.get_instance("hello").unwrap().greet(), "hi");

        reg.register_replacing("hello", "fancy", || Arc::new(Fixed("salut")) as Arc<dyn Greeter>);
        assert_eq!(reg.get_instance("hello").unwrap().greet(), "salut");
        assert_eq!(reg.list_by_category("fancy"), vec!["hello"]);
        assert!(reg.list_by_category("basic").is_empty());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_get_instance_caches_one_instance() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let reg = registry();
        reg.register("counted", "basic", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(Fixed("x")) as Arc<dyn Greeter>
        })
        .unwrap();

        let a = reg.get_instance("counted").unwrap();
        let b = reg.get_instance("counted").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(built.load(Ordering::SeqCst), 1);

        let fresh = reg.create("counted").unwrap();
        assert!(!Arc::ptr_eq(&a, &fresh));
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_missing_names() {
        let reg = registry();
        assert!(reg.get("nope").is_none());
        assert!(reg.get_instance("nope").is_none());
        assert!(matches!(
            reg.require_instance("nope"),
            Err(RegistryError::NotFound { .. })
        ));
        assert!(!reg.remove("nope"));
    }

    #[test]
    fn test_listing_and_categories_follow_registration_order() {
        let reg = registry();
        for (name, category) in [("b", "content"), ("a", "search"), ("c", "content")] {
            reg.register(name, category, || Arc::new(Fixed("x")) as Arc<dyn Greeter>)
                .unwrap();
        }
        assert_eq!(reg.list_all(), vec!["b", "a", "c"]);
        assert_eq!(reg.list_by_category("content"), vec!["b", "c"]);
        assert_eq!(reg.categories(), vec!["content", "search"]);
        assert_eq!(reg.metadata("a").unwrap()["category"], "search");

        assert!(reg.remove("b"));
        assert_eq!(reg.list_all(), vec!["a", "c"]);
        reg.clear();
        assert!(reg.is_empty());
    }
}
