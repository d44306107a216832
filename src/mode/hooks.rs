//! Opaque hook registries for the host editor
//!
//! The framework only stores these; the host decides when to run init hooks
//! and what an editor or document extension value is.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Called with every new editor instance
pub type InitHook = Arc<dyn Fn(&mut dyn Any) + Send + Sync>;

/// Init hooks plus named editor and document extensions
#[derive(Clone, Default)]
pub struct HookRegistry {
    init_hooks: Vec<InitHook>,
    editor_extensions: HashMap<String, Arc<dyn Any + Send + Sync>>,
    doc_extensions: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hook run for every new editor instance
    pub fn define_init_hook<F>(&mut self, hook: F)
    where
        F: Fn(&mut dyn Any) + Send + Sync + 'static,
    {
        self.init_hooks.push(Arc::new(hook));
    }

    /// Run all init hooks, in registration order, on an editor instance
    pub fn run_init_hooks(&self, instance: &mut dyn Any) {
        for hook in &self.init_hooks {
            hook(instance);
        }
    }

    pub fn define_extension<T: Any + Send + Sync>(&mut self, name: &str, value: T) {
        self.editor_extensions
            .insert(name.to_string(), Arc::new(value));
    }

    pub fn extension(&self, name: &str) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.editor_extensions.get(name)
    }

    pub fn define_doc_extension<T: Any + Send + Sync>(&mut self, name: &str, value: T) {
        self.doc_extensions.insert(name.to_string(), Arc::new(value));
    }

    pub fn doc_extension(&self, name: &str) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.doc_extensions.get(name)
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("init_hooks", &self.init_hooks.len())
            .field("editor_extensions", &self.editor_extensions.len())
            .field("doc_extensions", &self.doc_extensions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeEditor {
        calls: Vec<&'static str>,
    }

    #[test]
    fn test_init_hooks_run_in_order() {
        let mut hooks = HookRegistry::new();
        hooks.define_init_hook(|editor| {
            if let Some(editor) = editor.downcast_mut::<FakeEditor>() {
                editor.calls.push("first");
            }
        });
        hooks.define_init_hook(|editor| {
            if let Some(editor) = editor.downcast_mut::<FakeEditor>() {
                editor.calls.push("second");
            }
        });

        let mut editor = FakeEditor::default();
        hooks.run_init_hooks(&mut editor);
        assert_eq!(editor.calls, vec!["first", "second"]);
    }

    #[test]
    fn test_extensions_by_name() {
        let mut hooks = HookRegistry::new();
        hooks.define_extension("toggleComment", 1u8);
        hooks.define_doc_extension("lineCount", "doc");
        assert!(hooks.extension("toggleComment").is_some());
        assert!(hooks.extension("lineCount").is_none());
        assert_eq!(
            hooks.doc_extension("lineCount").and_then(|v| v.downcast_ref::<&str>()),
            Some(&"doc")
        );
    }
}
