//! Tokenizer state and the state protocol
//!
//! State is owned by the caller and threaded through every token call.
//! Incremental re-tokenization keeps a copy of the state at the end of each
//! line, so copying has to be cheap and must never let a copy alias the
//! original.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::Mode;

/// Mode-defined state value
///
/// Implemented for every `Clone + Debug + 'static` type, so a grammar can
/// keep its own struct in [`State::Custom`].
pub trait ModeState: Any + fmt::Debug {
    fn clone_box(&self) -> Box<dyn ModeState>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any + fmt::Debug + Clone> ModeState for T {
    fn clone_box(&self) -> Box<dyn ModeState> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Tokenizer state for one position in a document
#[derive(Debug)]
pub enum State {
    /// The mode keeps no state
    Stateless,
    /// A plain field mapping
    Record(StateRecord),
    /// A mode-defined value
    Custom(Box<dyn ModeState>),
}

impl State {
    /// An empty record state
    pub fn record() -> Self {
        State::Record(StateRecord::new())
    }

    /// Wrap a mode-defined value
    pub fn custom<T: ModeState>(value: T) -> Self {
        State::Custom(Box::new(value))
    }

    pub fn is_stateless(&self) -> bool {
        matches!(self, State::Stateless)
    }

    pub fn as_record(&self) -> Option<&StateRecord> {
        match self {
            State::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut StateRecord> {
        match self {
            State::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Borrow a custom state as its concrete type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            State::Custom(value) => (**value).as_any().downcast_ref(),
            _ => None,
        }
    }

    /// Mutably borrow a custom state as its concrete type
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        match self {
            State::Custom(value) => (**value).as_any_mut().downcast_mut(),
            _ => None,
        }
    }
}

impl Clone for State {
    fn clone(&self) -> Self {
        match self {
            State::Stateless => State::Stateless,
            State::Record(record) => State::Record(record.clone()),
            State::Custom(value) => State::Custom((**value).clone_box()),
        }
    }
}

/// A field value inside a [`StateRecord`]
#[derive(Debug, Clone)]
pub enum StateValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<StateValue>),
    /// Nested state, usually owned by an inner mode
    State(Box<State>),
}

impl StateValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            StateValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StateValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        StateValue::Bool(value)
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        StateValue::Int(value)
    }
}

impl From<i32> for StateValue {
    fn from(value: i32) -> Self {
        StateValue::Int(i64::from(value))
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        StateValue::Str(value.to_string())
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        StateValue::Str(value)
    }
}

impl From<Vec<StateValue>> for StateValue {
    fn from(value: Vec<StateValue>) -> Self {
        StateValue::List(value)
    }
}

impl From<State> for StateValue {
    fn from(value: State) -> Self {
        StateValue::State(Box::new(value))
    }
}

/// Plain field mapping used as mode state
#[derive(Debug, Clone, Default)]
pub struct StateRecord {
    fields: BTreeMap<String, StateValue>,
}

impl StateRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.fields.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut StateValue> {
        self.fields.get_mut(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<StateValue>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<StateValue> {
        self.fields.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Boolean field, false when missing
    pub fn bool(&self, key: &str) -> bool {
        self.get(key).and_then(StateValue::as_bool).unwrap_or(false)
    }

    /// Integer field, 0 when missing
    pub fn int(&self, key: &str) -> i64 {
        self.get(key).and_then(StateValue::as_int).unwrap_or(0)
    }

    /// String field
    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(StateValue::as_str)
    }

    /// List field, empty when missing
    pub fn list(&self, key: &str) -> &[StateValue] {
        match self.get(key) {
            Some(StateValue::List(items)) => items,
            _ => &[],
        }
    }

    /// Mutable list field, created (replacing any non-list value) on demand
    pub fn list_mut(&mut self, key: &str) -> &mut Vec<StateValue> {
        let slot = self
            .fields
            .entry(key.to_string())
            .or_insert_with(|| StateValue::List(Vec::new()));
        if !matches!(slot, StateValue::List(_)) {
            *slot = StateValue::List(Vec::new());
        }
        match slot {
            StateValue::List(items) => items,
            _ => unreachable!("slot was just set to a list"),
        }
    }

    /// Nested state field
    pub fn state(&self, key: &str) -> Option<&State> {
        match self.get(key) {
            Some(StateValue::State(state)) => Some(&**state),
            _ => None,
        }
    }

    /// Mutable nested state field
    pub fn state_mut(&mut self, key: &str) -> Option<&mut State> {
        match self.get_mut(key) {
            Some(StateValue::State(state)) => Some(&mut **state),
            _ => None,
        }
    }

    /// Field names in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// A nested mode and the state it is in
#[derive(Debug, Clone)]
pub struct InnerMode<'s> {
    pub mode: Arc<Mode>,
    pub state: &'s State,
}

/// Create the initial state for a mode
///
/// Modes without a start state operation keep no state.
pub fn start_state(mode: &Mode, base_indent: usize) -> State {
    mode.call_start_state(base_indent).unwrap_or(State::Stateless)
}

/// Copy a state so that tokenizing the copy never affects the original
///
/// `Stateless` is returned as-is without consulting the mode. Otherwise the
/// mode's copy operation is used when it has one; records are copied field
/// by field with list fields duplicated, custom values through `clone_box`.
pub fn copy_state(mode: &Mode, state: &State) -> State {
    if state.is_stateless() {
        return State::Stateless;
    }
    if let Some(copy) = mode.call_copy_state(state) {
        return copy;
    }
    state.clone()
}

/// Find the innermost mode and state for a (possibly nested) state
///
/// Follows the inner mode reports until a mode reports nothing or reports
/// itself. A mode that keeps reporting fresh mode objects never terminates.
pub fn inner_mode<'s>(mode: &Arc<Mode>, state: &'s State) -> InnerMode<'s> {
    let mut current = InnerMode {
        mode: Arc::clone(mode),
        state,
    };
    while let Some(info) = current.mode.inner_mode(current.state) {
        let same = Arc::ptr_eq(&info.mode, &current.mode);
        current = info;
        if same {
            break;
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Mode;
    use crate::syntax::TokenType;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter {
        count: usize,
    }

    fn plain_mode() -> Mode {
        Mode::new(|_, stream, _| {
            stream.skip_to_end();
            None
        })
    }

    fn counting_mode() -> Mode {
        Mode::new(|_, stream, state| {
            stream.next();
            if let Some(counter) = state.downcast_mut::<Counter>() {
                counter.count += 1;
            }
            Some(TokenType::Variable)
        })
        .with_start_state(|_, base| State::custom(Counter { count: base }))
    }

    #[test]
    fn test_start_state_default_is_stateless() {
        assert!(start_state(&plain_mode(), 0).is_stateless());
    }

    #[test]
    fn test_start_state_uses_mode() {
        let state = start_state(&counting_mode(), 3);
        assert_eq!(state.downcast_ref::<Counter>(), Some(&Counter { count: 3 }));
    }

    #[test]
    fn test_copy_stateless_is_preserved() {
        let mode = plain_mode().with_copy_state(|_, _| panic!("must not be called"));
        assert!(copy_state(&mode, &State::Stateless).is_stateless());
    }

    #[test]
    fn test_copy_record_duplicates_lists() {
        let mut record = StateRecord::new();
        record.set("list", vec![StateValue::Int(1), StateValue::Int(2)]);
        let source = State::Record(record);

        let mut copy = copy_state(&plain_mode(), &source);
        copy.as_record_mut()
            .unwrap()
            .list_mut("list")
            .push(StateValue::Int(3));

        assert_eq!(source.as_record().unwrap().list("list").len(), 2);
        assert_eq!(copy.as_record().unwrap().list("list").len(), 3);
        assert_eq!(copy.as_record().unwrap().list("list")[1].as_int(), Some(2));
    }

    #[test]
    fn test_copy_custom_is_independent() {
        let mode = counting_mode();
        let source = start_state(&mode, 0);
        let mut copy = copy_state(&mode, &source);
        copy.downcast_mut::<Counter>().unwrap().count = 9;
        assert_eq!(source.downcast_ref::<Counter>().unwrap().count, 0);
    }

    #[test]
    fn test_copy_delegates_to_mode() {
        let mode = plain_mode().with_copy_state(|_, _| {
            let mut record = StateRecord::new();
            record.set("copied", true);
            State::Record(record)
        });
        let copy = copy_state(&mode, &State::record());
        assert!(copy.as_record().unwrap().bool("copied"));
    }

    #[test]
    fn test_inner_mode_without_delegation() {
        let mode = Arc::new(plain_mode());
        let state = State::Stateless;
        let inner = inner_mode(&mode, &state);
        assert!(Arc::ptr_eq(&inner.mode, &mode));
        assert!(inner.state.is_stateless());
    }

    #[test]
    fn test_inner_mode_walks_chain() {
        let innermost = Arc::new(plain_mode());
        let middle = {
            let innermost = Arc::clone(&innermost);
            Arc::new(plain_mode().with_inner_mode(move |_, state| {
                let inner = state.as_record()?.state("inner")?;
                Some(InnerMode {
                    mode: Arc::clone(&innermost),
                    state: inner,
                })
            }))
        };
        let outer = {
            let middle = Arc::clone(&middle);
            Arc::new(plain_mode().with_inner_mode(move |_, state| {
                let inner = state.as_record()?.state("inner")?;
                Some(InnerMode {
                    mode: Arc::clone(&middle),
                    state: inner,
                })
            }))
        };

        let mut deepest = StateRecord::new();
        deepest.set("depth", 2);
        let mut mid = StateRecord::new();
        mid.set("inner", State::Record(deepest));
        let mut top = StateRecord::new();
        top.set("inner", State::Record(mid));
        let state = State::Record(top);

        let inner = inner_mode(&outer, &state);
        assert!(Arc::ptr_eq(&inner.mode, &innermost));
        assert_eq!(inner.state.as_record().unwrap().int("depth"), 2);
    }

    #[test]
    fn test_inner_mode_single_step() {
        let mode = Arc::new(plain_mode());
        let outer = {
            let mode = Arc::clone(&mode);
            Arc::new(plain_mode().with_inner_mode(move |_, state| {
                Some(InnerMode {
                    mode: Arc::clone(&mode),
                    state,
                })
            }))
        };
        let state = State::Stateless;
        let inner = inner_mode(&outer, &state);
        assert!(Arc::ptr_eq(&inner.mode, &mode));
    }

    #[test]
    fn test_inner_mode_stops_on_self_report() {
        let mode = Arc::new_cyclic(|weak: &std::sync::Weak<Mode>| {
            let weak = weak.clone();
            plain_mode().with_inner_mode(move |_, state| {
                Some(InnerMode {
                    mode: weak.upgrade()?,
                    state,
                })
            })
        });
        let state = State::Stateless;
        let inner = inner_mode(&mode, &state);
        assert!(Arc::ptr_eq(&inner.mode, &mode));
    }
}
