//! Mode objects and mode specifications
//!
//! A [`Mode`] is a tokenizing grammar: one required token operation plus a
//! set of optional operations (start state, state copying, nested mode
//! reporting, indentation). Modes are produced by factories registered on a
//! [`ModeRegistry`] and are selected with a [`ModeSpec`].

mod helpers;
mod hooks;
mod registry;
mod state;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::stream::StringStream;
use crate::syntax::TokenType;

pub use helpers::{GlobalHelper, HelperCategory, HelperPredicate, HelperRegistry, HelperValue};
pub use hooks::{HookRegistry, InitHook};
pub use registry::{ModeFactory, ModeRegistry, NULL_MODE, PLAIN_TEXT_MIME, XML_MIME};
pub use state::{copy_state, inner_mode, start_state, InnerMode, ModeState, State, StateRecord, StateValue};

/// Token operation: consume at least one character and classify it
pub type TokenFn =
    Arc<dyn Fn(&Mode, &mut StringStream<'_>, &mut State) -> Option<TokenType> + Send + Sync>;
/// Start state operation, given the base indentation
pub type StartStateFn = Arc<dyn Fn(&Mode, usize) -> State + Send + Sync>;
/// State copy operation
pub type CopyStateFn = Arc<dyn Fn(&Mode, &State) -> State + Send + Sync>;
/// Nested mode report for a state
pub type InnerModeFn =
    Arc<dyn for<'s> Fn(&Mode, &'s State) -> Option<InnerMode<'s>> + Send + Sync>;
/// Indentation for the line whose text (after leading whitespace) is given
pub type IndentFn = Arc<dyn Fn(&Mode, &State, &str) -> Handling<usize> + Send + Sync>;
/// Called instead of the token operation for empty lines
pub type BlankLineFn = Arc<dyn Fn(&Mode, &mut State) + Send + Sync>;

/// Marker for a protocol that declines to handle a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pass;

/// The declined-to-handle marker
pub const PASS: Pass = Pass;

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("lexmode::Pass")
    }
}

/// Outcome of an operation a mode may decline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handling<T> {
    /// The mode produced a value
    Handled(T),
    /// The mode defers to the caller's default handling
    Declined,
}

impl<T> Handling<T> {
    /// Check whether the mode declined
    pub fn is_declined(&self) -> bool {
        matches!(self, Handling::Declined)
    }

    /// The handled value, if any
    pub fn handled(self) -> Option<T> {
        match self {
            Handling::Handled(value) => Some(value),
            Handling::Declined => None,
        }
    }

    /// Convert to a result carrying [`Pass`] when declined
    pub fn or_pass(self) -> Result<T, Pass> {
        self.handled().ok_or(PASS)
    }
}

impl<T> From<Option<T>> for Handling<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Handling::Handled(value),
            None => Handling::Declined,
        }
    }
}

/// Loosely typed value used for mode options and properties
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<PropValue>),
}

impl PropValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PropValue]> {
        match self {
            PropValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(i64::from(value))
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl<T: Into<PropValue>> From<Vec<T>> for PropValue {
    fn from(values: Vec<T>) -> Self {
        PropValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Editor-level options handed to every mode factory
#[derive(Debug, Clone, PartialEq)]
pub struct ModeOptions {
    /// Tab width for column computations
    pub tab_size: usize,
    /// Width of one indentation level
    pub indent_unit: usize,
}

impl Default for ModeOptions {
    fn default() -> Self {
        Self {
            tab_size: 4,
            indent_unit: 2,
        }
    }
}

/// Structured mode specification: a mode name plus options
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModeConfig {
    /// Mode name (or MIME type before resolution)
    pub name: String,
    /// Helper lookup name overriding the mode name
    #[serde(default, rename = "helper-type")]
    pub helper_type: Option<String>,
    /// Properties copied onto the mode object after construction
    #[serde(default, rename = "mode-props")]
    pub mode_props: BTreeMap<String, PropValue>,
    /// Options read by the mode factory
    #[serde(flatten)]
    pub options: BTreeMap<String, PropValue>,
}

impl ModeConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder: set a factory option
    pub fn with_option(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    /// Builder: set the helper type
    pub fn with_helper_type(mut self, helper_type: &str) -> Self {
        self.helper_type = Some(helper_type.to_string());
        self
    }

    /// Builder: add a property copied onto the mode object
    pub fn with_mode_prop(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.mode_props.insert(key.to_string(), value.into());
        self
    }

    /// Get a factory option
    pub fn option(&self, key: &str) -> Option<&PropValue> {
        self.options.get(key)
    }

    /// Layer a caller's spec over this (alias target) spec
    ///
    /// The caller's options, helper type and mode properties win; the base
    /// keeps its name.
    pub(crate) fn overlay(mut self, spec: ModeConfig) -> ModeConfig {
        self.options.extend(spec.options);
        self.mode_props.extend(spec.mode_props);
        if spec.helper_type.is_some() {
            self.helper_type = spec.helper_type;
        }
        self
    }
}

/// Anything that selects a mode: a name, a MIME type or a structured config
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ModeSpec {
    /// A mode name or MIME type
    Name(String),
    /// A structured spec
    Config(ModeConfig),
}

impl From<&str> for ModeSpec {
    fn from(value: &str) -> Self {
        ModeSpec::Name(value.to_string())
    }
}

impl From<String> for ModeSpec {
    fn from(value: String) -> Self {
        ModeSpec::Name(value)
    }
}

impl From<ModeConfig> for ModeSpec {
    fn from(value: ModeConfig) -> Self {
        ModeSpec::Config(value)
    }
}

/// A value that an extension may replace while keeping the original reachable
#[derive(Clone)]
pub struct Overridable<T> {
    current: Option<T>,
    shadowed: Option<T>,
}

impl<T> Overridable<T> {
    fn new(value: Option<T>) -> Self {
        Self {
            current: value,
            shadowed: None,
        }
    }

    /// The active value
    pub fn get(&self) -> Option<&T> {
        self.current.as_ref()
    }

    /// The value that was active before the last override
    pub fn original(&self) -> Option<&T> {
        self.shadowed.as_ref()
    }

    /// Whether an override replaced an existing value
    pub fn is_overridden(&self) -> bool {
        self.shadowed.is_some()
    }

    /// Replace the value, keeping an existing one as the original
    fn replace(&mut self, value: T) {
        if let Some(previous) = self.current.take() {
            self.shadowed = Some(previous);
        }
        self.current = Some(value);
    }

    /// Set the value without shadowing
    fn set(&mut self, value: T) {
        self.current = Some(value);
    }
}

impl<T> Default for Overridable<T> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<T: fmt::Debug> fmt::Debug for Overridable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overridable")
            .field("current", &self.current)
            .field("shadowed", &self.shadowed)
            .finish()
    }
}

/// Properties attached to modes by name, independently of the factory
#[derive(Clone, Default)]
pub struct ModeExtension {
    token: Option<TokenFn>,
    start_state: Option<StartStateFn>,
    copy_state: Option<CopyStateFn>,
    inner_mode: Option<InnerModeFn>,
    indent: Option<IndentFn>,
    blank_line: Option<BlankLineFn>,
    props: BTreeMap<String, PropValue>,
}

impl ModeExtension {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token<F>(mut self, f: F) -> Self
    where
        F: Fn(&Mode, &mut StringStream<'_>, &mut State) -> Option<TokenType> + Send + Sync + 'static,
    {
        self.token = Some(Arc::new(f));
        self
    }

    pub fn with_start_state<F>(mut self, f: F) -> Self
    where
        F: Fn(&Mode, usize) -> State + Send + Sync + 'static,
    {
        self.start_state = Some(Arc::new(f));
        self
    }

    pub fn with_copy_state<F>(mut self, f: F) -> Self
    where
        F: Fn(&Mode, &State) -> State + Send + Sync + 'static,
    {
        self.copy_state = Some(Arc::new(f));
        self
    }

    pub fn with_inner_mode<F>(mut self, f: F) -> Self
    where
        F: for<'s> Fn(&Mode, &'s State) -> Option<InnerMode<'s>> + Send + Sync + 'static,
    {
        self.inner_mode = Some(Arc::new(f));
        self
    }

    pub fn with_indent<F>(mut self, f: F) -> Self
    where
        F: Fn(&Mode, &State, &str) -> Handling<usize> + Send + Sync + 'static,
    {
        self.indent = Some(Arc::new(f));
        self
    }

    pub fn with_blank_line<F>(mut self, f: F) -> Self
    where
        F: Fn(&Mode, &mut State) + Send + Sync + 'static,
    {
        self.blank_line = Some(Arc::new(f));
        self
    }

    pub fn with_prop(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    /// Merge another extension into this one, the other's properties winning
    pub(crate) fn merge(&mut self, other: ModeExtension) {
        if other.token.is_some() {
            self.token = other.token;
        }
        if other.start_state.is_some() {
            self.start_state = other.start_state;
        }
        if other.copy_state.is_some() {
            self.copy_state = other.copy_state;
        }
        if other.inner_mode.is_some() {
            self.inner_mode = other.inner_mode;
        }
        if other.indent.is_some() {
            self.indent = other.indent;
        }
        if other.blank_line.is_some() {
            self.blank_line = other.blank_line;
        }
        self.props.extend(other.props);
    }
}

/// An instantiated tokenizing grammar
#[derive(Clone)]
pub struct Mode {
    name: String,
    token: Overridable<TokenFn>,
    start_state: Overridable<StartStateFn>,
    copy_state: Overridable<CopyStateFn>,
    inner_mode: Overridable<InnerModeFn>,
    indent: Overridable<IndentFn>,
    blank_line: Overridable<BlankLineFn>,
    helper_type: Option<String>,
    props: BTreeMap<String, Overridable<PropValue>>,
}

impl Mode {
    /// Create a mode from its token operation
    pub fn new<F>(token: F) -> Self
    where
        F: Fn(&Mode, &mut StringStream<'_>, &mut State) -> Option<TokenType> + Send + Sync + 'static,
    {
        let token: TokenFn = Arc::new(token);
        Self {
            name: String::new(),
            token: Overridable::new(Some(token)),
            start_state: Overridable::default(),
            copy_state: Overridable::default(),
            inner_mode: Overridable::default(),
            indent: Overridable::default(),
            blank_line: Overridable::default(),
            helper_type: None,
            props: BTreeMap::new(),
        }
    }

    pub fn with_start_state<F>(mut self, f: F) -> Self
    where
        F: Fn(&Mode, usize) -> State + Send + Sync + 'static,
    {
        self.start_state.set(Arc::new(f));
        self
    }

    pub fn with_copy_state<F>(mut self, f: F) -> Self
    where
        F: Fn(&Mode, &State) -> State + Send + Sync + 'static,
    {
        self.copy_state.set(Arc::new(f));
        self
    }

    pub fn with_inner_mode<F>(mut self, f: F) -> Self
    where
        F: for<'s> Fn(&Mode, &'s State) -> Option<InnerMode<'s>> + Send + Sync + 'static,
    {
        self.inner_mode.set(Arc::new(f));
        self
    }

    pub fn with_indent<F>(mut self, f: F) -> Self
    where
        F: Fn(&Mode, &State, &str) -> Handling<usize> + Send + Sync + 'static,
    {
        self.indent.set(Arc::new(f));
        self
    }

    pub fn with_blank_line<F>(mut self, f: F) -> Self
    where
        F: Fn(&Mode, &mut State) + Send + Sync + 'static,
    {
        self.blank_line.set(Arc::new(f));
        self
    }

    /// Builder: attach a property
    pub fn with_prop(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.props
            .insert(key.to_string(), Overridable::new(Some(value.into())));
        self
    }

    /// Registered name of the mode
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name used for helper lookups
    pub fn helper_type(&self) -> Option<&str> {
        self.helper_type.as_deref()
    }

    /// Read the next token from the stream
    pub fn token(&self, stream: &mut StringStream<'_>, state: &mut State) -> Option<TokenType> {
        match self.token.get() {
            Some(token) => token(self, stream, state),
            None => {
                stream.skip_to_end();
                None
            }
        }
    }

    /// Call the token operation that an extension replaced
    pub fn original_token(&self, stream: &mut StringStream<'_>, state: &mut State) -> Option<TokenType> {
        match self.token.original() {
            Some(token) => token(self, stream, state),
            None => self.token(stream, state),
        }
    }

    pub fn has_start_state(&self) -> bool {
        self.start_state.get().is_some()
    }

    pub fn has_copy_state(&self) -> bool {
        self.copy_state.get().is_some()
    }

    pub fn has_inner_mode(&self) -> bool {
        self.inner_mode.get().is_some()
    }

    pub fn has_indent(&self) -> bool {
        self.indent.get().is_some()
    }

    pub(crate) fn call_start_state(&self, base_indent: usize) -> Option<State> {
        self.start_state.get().map(|f| f(self, base_indent))
    }

    pub(crate) fn call_copy_state(&self, state: &State) -> Option<State> {
        self.copy_state.get().map(|f| f(self, state))
    }

    /// Report the nested mode active for `state`, if the mode delegates
    pub fn inner_mode<'s>(&self, state: &'s State) -> Option<InnerMode<'s>> {
        self.inner_mode.get().and_then(|f| f(self, state))
    }

    /// Indentation for a new line, or `Declined` when the mode has no opinion
    pub fn indent(&self, state: &State, text_after: &str) -> Handling<usize> {
        match self.indent.get() {
            Some(indent) => indent(self, state, text_after),
            None => Handling::Declined,
        }
    }

    /// Call the indent operation that an extension replaced
    pub fn original_indent(&self, state: &State, text_after: &str) -> Handling<usize> {
        match self.indent.original() {
            Some(indent) => indent(self, state, text_after),
            None => Handling::Declined,
        }
    }

    /// Advance the state over an empty line
    pub fn blank_line(&self, state: &mut State) {
        if let Some(blank_line) = self.blank_line.get() {
            blank_line(self, state);
        }
    }

    /// Get a property
    pub fn prop(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key).and_then(Overridable::get)
    }

    /// Get the value a property had before an extension replaced it
    pub fn original_prop(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key).and_then(Overridable::original)
    }

    /// Names of all properties
    pub fn prop_names(&self) -> impl Iterator<Item = &str> {
        self.props.keys().map(String::as_str)
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub(crate) fn set_helper_type(&mut self, helper_type: &str) {
        self.helper_type = Some(helper_type.to_string());
    }

    pub(crate) fn set_prop(&mut self, key: &str, value: PropValue) {
        self.props.entry(key.to_string()).or_default().set(value);
    }

    /// Merge an extension set, shadowing every replaced property
    pub(crate) fn apply_extension(&mut self, ext: &ModeExtension) {
        if let Some(f) = &ext.token {
            self.token.replace(Arc::clone(f));
        }
        if let Some(f) = &ext.start_state {
            self.start_state.replace(Arc::clone(f));
        }
        if let Some(f) = &ext.copy_state {
            self.copy_state.replace(Arc::clone(f));
        }
        if let Some(f) = &ext.inner_mode {
            self.inner_mode.replace(Arc::clone(f));
        }
        if let Some(f) = &ext.indent {
            self.indent.replace(Arc::clone(f));
        }
        if let Some(f) = &ext.blank_line {
            self.blank_line.replace(Arc::clone(f));
        }
        for (key, value) in &ext.props {
            self.props
                .entry(key.clone())
                .or_default()
                .replace(value.clone());
        }
    }
}

impl fmt::Debug for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mode")
            .field("name", &self.name)
            .field("start_state", &self.has_start_state())
            .field("copy_state", &self.has_copy_state())
            .field("inner_mode", &self.has_inner_mode())
            .field("indent", &self.has_indent())
            .field("helper_type", &self.helper_type)
            .field("props", &self.props)
            .finish()
    }
}
