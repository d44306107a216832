//! Mode registry
//!
//! The registry maps mode names to factories and MIME types to mode specs,
//! keeps per-name extension sets, and owns the helper and hook registries.
//! The host builds one registry at startup, registers grammars, and then
//! shares it read-only.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::helpers::HelperRegistry;
use super::hooks::HookRegistry;
use super::{Mode, ModeConfig, ModeExtension, ModeOptions, ModeSpec};
use crate::error::{ModeError, Result};
use crate::syntax::builtin;

/// Name of the built-in plain text mode
pub const NULL_MODE: &str = "null";
/// MIME type aliased to the plain text mode
pub const PLAIN_TEXT_MIME: &str = "text/plain";
/// MIME type unregistered `*/*+xml` types resolve to
pub const XML_MIME: &str = "application/xml";

/// Builds a mode object from editor options and a resolved spec
pub type ModeFactory = Arc<dyn Fn(&ModeOptions, &ModeConfig, &ModeRegistry) -> Mode + Send + Sync>;

struct ModeEntry {
    factory: ModeFactory,
    dependencies: Vec<String>,
}

/// Registry of modes, MIME aliases, mode extensions, helpers and hooks
pub struct ModeRegistry {
    /// Mode factories by name
    modes: HashMap<String, ModeEntry>,
    /// Mode specs by MIME type
    mime_modes: HashMap<String, ModeSpec>,
    /// Extension sets by mode name
    extensions: HashMap<String, ModeExtension>,
    /// First non-null mode registered, unless set explicitly
    default_mode: Option<String>,
    helpers: HelperRegistry,
    hooks: HookRegistry,
}

impl ModeRegistry {
    /// Create a registry holding only the plain text mode
    pub fn new() -> Self {
        let mut registry = Self {
            modes: HashMap::new(),
            mime_modes: HashMap::new(),
            extensions: HashMap::new(),
            default_mode: None,
            helpers: HelperRegistry::new(),
            hooks: HookRegistry::new(),
        };
        registry.define_mode(NULL_MODE, |_, _, _| null_mode(), &[]);
        registry.define_mime(PLAIN_TEXT_MIME, NULL_MODE);
        registry
    }

    /// Create a registry with all bundled grammars
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Register a mode factory
    ///
    /// `dependencies` names modes this one embeds; they are recorded for
    /// loaders and not enforced. The first mode other than `null` becomes
    /// the default mode.
    pub fn define_mode<F>(&mut self, name: &str, factory: F, dependencies: &[&str])
    where
        F: Fn(&ModeOptions, &ModeConfig, &ModeRegistry) -> Mode + Send + Sync + 'static,
    {
        trace!(mode = name, ?dependencies, "defining mode");
        if self.default_mode.is_none() && name != NULL_MODE {
            self.default_mode = Some(name.to_string());
        }
        self.modes.insert(
            name.to_string(),
            ModeEntry {
                factory: Arc::new(factory),
                dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            },
        );
    }

    /// Register a MIME type alias
    pub fn define_mime(&mut self, mime: &str, spec: impl Into<ModeSpec>) {
        let spec = spec.into();
        trace!(mime, ?spec, "defining MIME alias");
        self.mime_modes.insert(mime.to_string(), spec);
    }

    /// Attach properties to a mode by name, independently of its factory
    ///
    /// Repeated calls merge, later properties replacing earlier ones.
    pub fn extend_mode(&mut self, name: &str, extension: ModeExtension) {
        self.extensions
            .entry(name.to_string())
            .or_default()
            .merge(extension);
    }

    /// Normalize a spec into a structured config
    ///
    /// MIME aliases are followed until a non-alias name is reached. An
    /// unregistered `type/subtype+xml` resolves like `application/xml`.
    pub fn resolve_mode(&self, spec: &ModeSpec) -> Result<ModeConfig> {
        let mut seen = Vec::new();
        self.resolve_chain(spec.clone(), &mut seen)
    }

    fn resolve_chain(&self, spec: ModeSpec, seen: &mut Vec<String>) -> Result<ModeConfig> {
        match spec {
            ModeSpec::Name(name) => {
                if let Some(found) = self.mime_modes.get(&name) {
                    enter_alias(&name, seen)?;
                    return self.resolve_chain(found.clone(), seen);
                }
                if is_custom_xml_mime(&name) {
                    return self.resolve_chain(ModeSpec::from(XML_MIME), seen);
                }
                Ok(ModeConfig::new(name))
            }
            ModeSpec::Config(config) => match self.mime_modes.get(&config.name) {
                Some(found) => {
                    enter_alias(&config.name, seen)?;
                    let base = self.resolve_chain(found.clone(), seen)?;
                    Ok(base.overlay(config))
                }
                None => Ok(config),
            },
        }
    }

    /// Instantiate the mode a spec selects
    ///
    /// Never fails: a spec that cannot be resolved or names an unknown mode
    /// yields the plain text mode.
    pub fn get_mode(&self, options: &ModeOptions, spec: impl Into<ModeSpec>) -> Arc<Mode> {
        let spec = spec.into();
        let config = match self.resolve_mode(&spec) {
            Ok(config) => config,
            Err(err) => {
                warn!(%err, "cannot resolve mode spec, using plain text");
                return self.plain_text_mode(options);
            }
        };

        match self.instantiate(options, &config) {
            Some(mode) => mode,
            None => {
                debug!(mode = %config.name, "unknown mode, using plain text");
                self.plain_text_mode(options)
            }
        }
    }

    /// Instantiate a mode by name, failing on unknown names
    pub fn try_get_mode(&self, options: &ModeOptions, spec: impl Into<ModeSpec>) -> Result<Arc<Mode>> {
        let config = self.resolve_mode(&spec.into())?;
        self.instantiate(options, &config)
            .ok_or(ModeError::UnknownMode(config.name))
    }

    fn instantiate(&self, options: &ModeOptions, config: &ModeConfig) -> Option<Arc<Mode>> {
        let entry = self.modes.get(&config.name)?;
        let mut mode = (entry.factory)(options, config, self);

        if let Some(extension) = self.extensions.get(&config.name) {
            mode.apply_extension(extension);
        }
        mode.set_name(&config.name);
        if let Some(helper_type) = &config.helper_type {
            mode.set_helper_type(helper_type);
        }
        for (key, value) in &config.mode_props {
            mode.set_prop(key, value.clone());
        }
        Some(Arc::new(mode))
    }

    fn plain_text_mode(&self, options: &ModeOptions) -> Arc<Mode> {
        self.resolve_mode(&ModeSpec::from(PLAIN_TEXT_MIME))
            .ok()
            .and_then(|config| self.instantiate(options, &config))
            .unwrap_or_else(|| {
                let mut mode = null_mode();
                mode.set_name(NULL_MODE);
                Arc::new(mode)
            })
    }

    /// Name of the default mode
    pub fn default_mode(&self) -> Option<&str> {
        self.default_mode.as_deref()
    }

    /// Override the default mode
    pub fn set_default_mode(&mut self, name: &str) {
        self.default_mode = Some(name.to_string());
    }

    /// Check if a mode is registered
    pub fn has_mode(&self, name: &str) -> bool {
        self.modes.contains_key(name)
    }

    /// Declared dependencies of a mode
    pub fn dependencies(&self, name: &str) -> Option<&[String]> {
        self.modes.get(name).map(|entry| entry.dependencies.as_slice())
    }

    /// Registered mode names, sorted
    pub fn mode_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.modes.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    /// Registered MIME types, sorted
    pub fn mime_types(&self) -> Vec<&str> {
        let mut mimes: Vec<_> = self.mime_modes.keys().map(|s| s.as_str()).collect();
        mimes.sort();
        mimes
    }

    /// Spec registered for a MIME type
    pub fn mime_spec(&self, mime: &str) -> Option<&ModeSpec> {
        self.mime_modes.get(mime)
    }

    pub fn helpers(&self) -> &HelperRegistry {
        &self.helpers
    }

    pub fn helpers_mut(&mut self) -> &mut HelperRegistry {
        &mut self.helpers
    }

    /// Register a helper under a category and name
    pub fn register_helper<T: Any + Send + Sync>(&mut self, category: &str, name: &str, value: T) {
        self.helpers.register_helper(category, name, value);
    }

    /// Register a helper that is also found by predicate
    pub fn register_global_helper<T, P>(&mut self, category: &str, name: &str, predicate: P, value: T)
    where
        T: Any + Send + Sync,
        P: Fn(&Mode, &dyn Any) -> bool + Send + Sync + 'static,
    {
        self.helpers
            .register_global_helper(category, name, predicate, value);
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut HookRegistry {
        &mut self.hooks
    }

    /// Add a hook run for every new editor instance
    pub fn define_init_hook<F>(&mut self, hook: F)
    where
        F: Fn(&mut dyn Any) + Send + Sync + 'static,
    {
        self.hooks.define_init_hook(hook);
    }
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The plain text mode: one unclassified token per line
fn null_mode() -> Mode {
    Mode::new(|_, stream, _| {
        stream.skip_to_end();
        None
    })
}

fn enter_alias(mime: &str, seen: &mut Vec<String>) -> Result<()> {
    if seen.iter().any(|s| s == mime) {
        let mut chain = seen.clone();
        chain.push(mime.to_string());
        return Err(ModeError::AliasCycle(chain));
    }
    seen.push(mime.to_string());
    Ok(())
}

/// Matches `type/subtype+xml` with word characters and dashes
fn is_custom_xml_mime(spec: &str) -> bool {
    let is_part = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    };
    let Some((kind, subtype)) = spec.split_once('/') else {
        return false;
    };
    let Some(base) = subtype.strip_suffix("+xml") else {
        return false;
    };
    is_part(kind) && is_part(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::{PropValue, State};
    use crate::stream::StringStream;
    use crate::syntax::TokenType;

    fn word_mode(_: &ModeOptions, config: &ModeConfig, _: &ModeRegistry) -> Mode {
        let class = match config.option("class").and_then(PropValue::as_str) {
            Some("keyword") => TokenType::Keyword,
            _ => TokenType::Variable,
        };
        Mode::new(move |_, stream, _| {
            if stream.eat_space() {
                return None;
            }
            stream.eat_while(|c: char| !c.is_whitespace());
            Some(class)
        })
        .with_prop("lineComment", "#")
    }

    fn registry() -> ModeRegistry {
        let mut registry = ModeRegistry::new();
        registry.define_mode("words", word_mode, &[]);
        registry
    }

    #[test]
    fn test_get_mode_stamps_name() {
        let mut registry = registry();
        registry.define_mode(
            "renamed",
            |opts, config, reg| {
                let mut mode = word_mode(opts, config, reg);
                mode.set_name("something-else");
                mode
            },
            &[],
        );
        for name in registry.mode_names() {
            let mode = registry.get_mode(&ModeOptions::default(), name);
            assert_eq!(mode.name(), name);
        }
    }

    #[test]
    fn test_unknown_mode_falls_back_to_plain_text() {
        let registry = registry();
        let opts = ModeOptions::default();
        let unknown = registry.get_mode(&opts, "nonexistent-xyz");
        let plain = registry.get_mode(&opts, PLAIN_TEXT_MIME);
        assert_eq!(unknown.name(), NULL_MODE);
        assert_eq!(plain.name(), NULL_MODE);
        assert_eq!(unknown.has_start_state(), plain.has_start_state());

        let mut stream = StringStream::new("some text");
        assert_eq!(unknown.token(&mut stream, &mut State::Stateless), None);
        assert!(stream.eol());
    }

    #[test]
    fn test_try_get_mode_reports_unknown() {
        let registry = registry();
        let err = registry
            .try_get_mode(&ModeOptions::default(), "nonexistent-xyz")
            .unwrap_err();
        assert!(matches!(err, ModeError::UnknownMode(name) if name == "nonexistent-xyz"));
    }

    #[test]
    fn test_default_mode_is_first_non_null() {
        let mut registry = ModeRegistry::new();
        assert_eq!(registry.default_mode(), None);
        registry.define_mode("first", word_mode, &[]);
        registry.define_mode("second", word_mode, &[]);
        assert_eq!(registry.default_mode(), Some("first"));
    }

    #[test]
    fn test_dependencies_recorded() {
        let mut registry = registry();
        registry.define_mode("embedding", word_mode, &["words", "xml"]);
        assert_eq!(
            registry.dependencies("embedding"),
            Some(&["words".to_string(), "xml".to_string()][..])
        );
        assert_eq!(registry.dependencies("words"), Some(&[][..]));
        assert_eq!(registry.dependencies("missing"), None);
    }

    #[test]
    fn test_resolve_plain_name_and_mime() {
        let mut registry = registry();
        registry.define_mime("text/x-words", "words");
        assert_eq!(
            registry.resolve_mode(&ModeSpec::from("words")).unwrap(),
            ModeConfig::new("words")
        );
        assert_eq!(
            registry.resolve_mode(&ModeSpec::from("text/x-words")).unwrap(),
            ModeConfig::new("words")
        );
    }

    #[test]
    fn test_resolve_structured_mime_merges_options() {
        let mut registry = registry();
        registry.define_mime(
            "text/x-keywords",
            ModeConfig::new("words").with_option("class", "keyword").with_option("depth", 1),
        );
        let spec = ModeConfig::new("text/x-keywords").with_option("depth", 3);
        let resolved = registry.resolve_mode(&spec.into()).unwrap();
        assert_eq!(resolved.name, "words");
        assert_eq!(resolved.option("class"), Some(&PropValue::from("keyword")));
        assert_eq!(resolved.option("depth"), Some(&PropValue::Int(3)));

        let mode = registry.get_mode(&ModeOptions::default(), "text/x-keywords");
        let mut stream = StringStream::new("if");
        assert_eq!(mode.token(&mut stream, &mut State::Stateless), Some(TokenType::Keyword));
    }

    #[test]
    fn test_resolve_follows_alias_chains() {
        let mut registry = registry();
        registry.define_mime("text/x-words", "words");
        registry.define_mime("application/x-words", "text/x-words");
        assert_eq!(
            registry
                .resolve_mode(&ModeSpec::from("application/x-words"))
                .unwrap()
                .name,
            "words"
        );
    }

    #[test]
    fn test_resolve_rejects_alias_cycle() {
        let mut registry = registry();
        registry.define_mime("text/a", "text/b");
        registry.define_mime("text/b", "text/a");
        let err = registry.resolve_mode(&ModeSpec::from("text/a")).unwrap_err();
        assert!(matches!(err, ModeError::AliasCycle(ref chain) if chain.len() == 3));

        let mode = registry.get_mode(&ModeOptions::default(), "text/a");
        assert_eq!(mode.name(), NULL_MODE);
    }

    #[test]
    fn test_custom_xml_mime_resolves_to_xml() {
        let mut registry = registry();
        registry.define_mime(XML_MIME, "words");
        assert_eq!(
            registry
                .resolve_mode(&ModeSpec::from("image/svg+xml"))
                .unwrap()
                .name,
            "words"
        );
        assert_eq!(
            registry.resolve_mode(&ModeSpec::from("text/plain+json")).unwrap().name,
            "text/plain+json"
        );
    }

    #[test]
    fn test_custom_xml_mime_without_xml_mode() {
        let registry = registry();
        let config = registry.resolve_mode(&ModeSpec::from("image/svg+xml")).unwrap();
        assert_eq!(config.name, XML_MIME);
        assert_eq!(
            registry.get_mode(&ModeOptions::default(), "image/svg+xml").name(),
            NULL_MODE
        );
    }

    #[test]
    fn test_is_custom_xml_mime() {
        assert!(is_custom_xml_mime("image/svg+xml"));
        assert!(is_custom_xml_mime("application/atom-feed+xml"));
        assert!(!is_custom_xml_mime("application/xml"));
        assert!(!is_custom_xml_mime("svg+xml"));
        assert!(!is_custom_xml_mime("a b/c+xml"));
    }

    #[test]
    fn test_extend_mode_shadows_and_merges() {
        let mut registry = registry();
        registry.extend_mode("words", ModeExtension::new().with_prop("lineComment", "//"));
        registry.extend_mode("words", ModeExtension::new().with_prop("fold", "indent"));
        registry.extend_mode("words", ModeExtension::new().with_prop("fold", "brace"));

        let mode = registry.get_mode(&ModeOptions::default(), "words");
        assert_eq!(mode.prop("lineComment"), Some(&PropValue::from("//")));
        assert_eq!(mode.original_prop("lineComment"), Some(&PropValue::from("#")));
        assert_eq!(mode.prop("fold"), Some(&PropValue::from("brace")));
    }

    #[test]
    fn test_helper_type_and_mode_props_copied() {
        let registry = registry();
        let spec = ModeConfig::new("words")
            .with_helper_type("shell")
            .with_mode_prop("closeBrackets", "()[]");
        let mode = registry.get_mode(&ModeOptions::default(), spec);
        assert_eq!(mode.helper_type(), Some("shell"));
        assert_eq!(mode.prop("closeBrackets"), Some(&PropValue::from("()[]")));
    }

    #[test]
    fn test_broken_plain_text_alias_still_yields_null_mode() {
        let mut registry = registry();
        registry.define_mime(PLAIN_TEXT_MIME, "missing");
        let mode = registry.get_mode(&ModeOptions::default(), "nonexistent");
        assert_eq!(mode.name(), NULL_MODE);
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ModeRegistry>();
        assert_send_sync::<Arc<Mode>>();
    }

    #[test]
    fn test_with_builtins_lists_modes() {
        let registry = ModeRegistry::with_builtins();
        let names = registry.mode_names();
        for name in ["null", "clike", "xml", "toml", "htmlmixed", "patch"] {
            assert!(names.contains(&name), "missing {name}");
        }
        assert_eq!(registry.default_mode(), Some("clike"));
    }
}
