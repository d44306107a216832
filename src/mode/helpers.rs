//! Helper registry
//!
//! Grammars publish auxiliary behavior (comment syntax, folding, hinting)
//! under a helper category. Callers find helpers either by mode name or by
//! asking every global helper's predicate whether it applies.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::Mode;

/// A registered helper value
pub type HelperValue = Arc<dyn Any + Send + Sync>;

/// Decides whether a global helper applies to a mode in a host context
pub type HelperPredicate = Arc<dyn Fn(&Mode, &dyn Any) -> bool + Send + Sync>;

/// A helper found by predicate rather than by name
#[derive(Clone)]
pub struct GlobalHelper {
    pub predicate: HelperPredicate,
    pub value: HelperValue,
}

/// All helpers of one category
#[derive(Clone, Default)]
pub struct HelperCategory {
    by_name: HashMap<String, HelperValue>,
    global: Vec<GlobalHelper>,
}

impl HelperCategory {
    /// Helper registered under `name`
    pub fn get(&self, name: &str) -> Option<&HelperValue> {
        self.by_name.get(name)
    }

    /// Names with a helper in this category
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// Predicate-based helpers
    pub fn global(&self) -> &[GlobalHelper] {
        &self.global
    }
}

impl fmt::Debug for HelperCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort();
        f.debug_struct("HelperCategory")
            .field("names", &names)
            .field("global", &self.global.len())
            .finish()
    }
}

/// Category → name → helper maps plus predicate-based helpers
#[derive(Debug, Clone, Default)]
pub struct HelperRegistry {
    categories: HashMap<String, HelperCategory>,
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` under `name` in `category`
    pub fn register_helper<T>(&mut self, category: &str, name: &str, value: T)
    where
        T: Any + Send + Sync,
    {
        self.insert(category, name, Arc::new(value));
    }

    /// Register a helper that is also found through `predicate`
    pub fn register_global_helper<T, P>(&mut self, category: &str, name: &str, predicate: P, value: T)
    where
        T: Any + Send + Sync,
        P: Fn(&Mode, &dyn Any) -> bool + Send + Sync + 'static,
    {
        let value: HelperValue = Arc::new(value);
        self.insert(category, name, Arc::clone(&value));
        self.categories
            .entry(category.to_string())
            .or_default()
            .global
            .push(GlobalHelper {
                predicate: Arc::new(predicate),
                value,
            });
    }

    fn insert(&mut self, category: &str, name: &str, value: HelperValue) {
        trace!(category, name, "registering helper");
        self.categories
            .entry(category.to_string())
            .or_default()
            .by_name
            .insert(name.to_string(), value);
    }

    /// All helpers of a category
    pub fn category(&self, category: &str) -> Option<&HelperCategory> {
        self.categories.get(category)
    }

    /// Helper registered under `name`
    pub fn get(&self, category: &str, name: &str) -> Option<&HelperValue> {
        self.category(category)?.get(name)
    }

    /// Helper registered under `name`, as its concrete type
    pub fn get_as<T: Any>(&self, category: &str, name: &str) -> Option<&T> {
        self.get(category, name)?.downcast_ref::<T>()
    }

    /// Global helpers whose predicate accepts `mode` in `ctx`
    pub fn global_matches(&self, category: &str, mode: &Mode, ctx: &dyn Any) -> Vec<&HelperValue> {
        self.category(category)
            .map(|cat| {
                cat.global
                    .iter()
                    .filter(|helper| (helper.predicate)(mode, ctx))
                    .map(|helper| &helper.value)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Helpers that apply to a mode
    ///
    /// The helper registered under the mode's helper type (or its name when
    /// it has none) comes first, followed by matching global helpers. A value
    /// found both ways is returned once.
    pub fn helpers_for(&self, category: &str, mode: &Mode, ctx: &dyn Any) -> Vec<&HelperValue> {
        let Some(cat) = self.category(category) else {
            return Vec::new();
        };

        let mut found: Vec<&HelperValue> = Vec::new();
        let key = mode.helper_type().unwrap_or(mode.name());
        if let Some(value) = cat.get(key) {
            found.push(value);
        }
        for helper in &cat.global {
            if (helper.predicate)(mode, ctx) && !found.iter().any(|v| Arc::ptr_eq(v, &helper.value)) {
                found.push(&helper.value);
            }
        }
        found
    }

    /// Typed variant of [`HelperRegistry::helpers_for`], skipping other types
    pub fn helpers_for_as<T: Any>(&self, category: &str, mode: &Mode, ctx: &dyn Any) -> Vec<&T> {
        self.helpers_for(category, mode, ctx)
            .into_iter()
            .filter_map(|value| value.downcast_ref::<T>())
            .collect()
    }
}
