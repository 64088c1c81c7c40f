//! Component arguments - volatile VM arguments, captured arguments and the
//! frozen snapshot handed to instances.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use crate::reactive::{ReferenceRef, Tag};
use crate::value::Value;

// =============================================================================
// ArgsSnapshot
// =============================================================================

/// Immutable named-argument values.
///
/// A new snapshot is built on every update pass; an existing one is never
/// mutated, so a reader holding it mid-render always sees a consistent view.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArgsSnapshot(Rc<BTreeMap<String, Value>>);

impl ArgsSnapshot {
    /// Value of `name`, `Undefined` if not passed.
    pub fn get(&self, name: &str) -> Value {
        self.0.get(name).cloned().unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The snapshot as an object value (`this.args` in templates).
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ArgsSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(Rc::new(iter.into_iter().map(|(k, v)| (k.into(), v)).collect()))
    }
}

// =============================================================================
// Arguments
// =============================================================================

/// Arguments as the VM passes them to a component invocation.
///
/// Each argument is a reference, so values are pulled lazily and can change
/// between render passes.
#[derive(Clone, Default)]
pub struct Arguments {
    positional: Vec<ReferenceRef>,
    named: BTreeMap<String, ReferenceRef>,
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("positional", &self.positional.len())
            .field("named", &self.named.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional_arg(mut self, reference: ReferenceRef) -> Self {
        self.positional.push(reference);
        self
    }

    pub fn named_arg(mut self, name: impl Into<String>, reference: ReferenceRef) -> Self {
        self.named.insert(name.into(), reference);
        self
    }

    pub fn positional(&self) -> &[ReferenceRef] {
        &self.positional
    }

    pub fn named(&self) -> &BTreeMap<String, ReferenceRef> {
        &self.named
    }

    /// Freeze the current set of argument references.
    pub fn capture(&self) -> CapturedArguments {
        CapturedArguments {
            positional: self.positional.clone().into(),
            named: Rc::new(self.named.clone()),
        }
    }
}

/// Argument references captured for the lifetime of a placement.
///
/// The references stay live: [`CapturedArguments::named_snapshot`] re-reads
/// them, which is how updates pick up new values.
#[derive(Clone)]
pub struct CapturedArguments {
    positional: Rc<[ReferenceRef]>,
    named: Rc<BTreeMap<String, ReferenceRef>>,
}

impl fmt::Debug for CapturedArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedArguments")
            .field("positional", &self.positional.len())
            .field("named", &self.named.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CapturedArguments {
    pub fn positional(&self) -> &[ReferenceRef] {
        &self.positional
    }

    pub fn named(&self, name: &str) -> Option<&ReferenceRef> {
        self.named.get(name)
    }

    /// Current positional values.
    pub fn positional_values(&self) -> Vec<Value> {
        self.positional.iter().map(|r| r.value()).collect()
    }

    /// Fresh snapshot of the named values.
    pub fn named_snapshot(&self) -> ArgsSnapshot {
        self.named
            .iter()
            .map(|(name, reference)| (name.clone(), reference.value()))
            .collect()
    }

    /// Combined tag of every argument.
    pub fn tag(&self) -> Tag {
        Tag::combine(
            self.positional
                .iter()
                .chain(self.named.values())
                .map(|r| r.tag()),
        )
    }
}

// =============================================================================
// DynamicScope
// =============================================================================

/// Scope variables the VM threads through component updates.
#[derive(Clone, Default)]
pub struct DynamicScope {
    bindings: HashMap<String, ReferenceRef>,
}

impl DynamicScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<ReferenceRef> {
        self.bindings.get(name).cloned()
    }

    pub fn set(&mut self, name: impl Into<String>, reference: ReferenceRef) {
        self.bindings.insert(name.into(), reference);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{ConstReference, RevisionClock, UpdatableReference};

    #[test]
    fn test_snapshot_reflects_current_values() {
        let clock = RevisionClock::new();
        let title = Rc::new(UpdatableReference::new(&clock, "first"));
        let args = Arguments::new()
            .named_arg("title", title.clone())
            .named_arg("count", Rc::new(ConstReference::new(3)));

        let captured = args.capture();
        let before = captured.named_snapshot();
        assert_eq!(before.get("title"), Value::from("first"));
        assert_eq!(before.get("count"), Value::from(3));
        assert!(before.get("missing").is_undefined());

        title.update("second");
        let after = captured.named_snapshot();

        // The old snapshot is untouched
        assert_eq!(before.get("title"), Value::from("first"));
        assert_eq!(after.get("title"), Value::from("second"));
    }

    #[test]
    fn test_captured_tag_combines_arguments() {
        let clock = RevisionClock::new();
        let item = Rc::new(UpdatableReference::new(&clock, 1));
        let captured = Arguments::new()
            .positional_arg(item.clone())
            .positional_arg(Rc::new(ConstReference::new("x")))
            .capture();

        let snapshot = clock.current();
        assert!(captured.tag().validate(snapshot));
        assert_eq!(captured.positional_values(), vec![Value::from(1), Value::from("x")]);

        item.update(2);
        assert!(!captured.tag().validate(snapshot));
    }

    #[test]
    fn test_snapshot_as_value() {
        let snapshot: ArgsSnapshot = [("name", Value::from("Ada"))].into_iter().collect();
        assert_eq!(snapshot.to_value().get("name"), Value::from("Ada"));
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.is_empty());
    }
}
