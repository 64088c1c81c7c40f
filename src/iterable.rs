//! Iterable Adapter - keyed iteration for `{{#each}}`.
//!
//! An [`Iterable`] wraps the reference to a list and a key strategy. Iterating
//! re-reads the list and derives each item's key lazily:
//!
//! - `@index` - the item's position
//! - `@primitive` - the item's own string form
//! - any other path - that property of the item (`None` when missing)
//!
//! Keys within one pass are unique: a repeated key is renamed `key#1`,
//! `key#2`, ... and a warning is logged.
//!
//! [`ListReconciler`] applies the keyed update policy across passes: new keys
//! insert, known keys update their item reference in place, vanished keys are
//! removed.
//!
//! ```ignore
//! let iterable = env.iterable_for(list_ref, "id")?;
//! let mut reconciler = ListReconciler::new();
//! for change in reconciler.sync(&iterable) {
//!     match change {
//!         ListChange::Insert { index, reference, .. } => render_row(index, reference),
//!         ListChange::Retain { .. } => {}
//!         ListChange::Remove { key } => remove_row(&key),
//!     }
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::reactive::{ReferenceRef, RevisionClock, Tag, UpdatableReference};
use crate::value::Value;

// =============================================================================
// Key strategy
// =============================================================================

/// How an item's key is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStrategy {
    /// `@index`
    Index,
    /// `@primitive`
    Primitive,
    /// A dotted property path.
    Path(String),
}

impl KeyStrategy {
    /// Parse a key path as written in `{{#each list key="..."}}`.
    pub fn from_key_path(key_path: &str) -> Result<Self> {
        match key_path {
            "" => Err(Error::MissingKeyPath),
            "@index" => Ok(Self::Index),
            "@primitive" => Ok(Self::Primitive),
            path => Ok(Self::Path(path.to_string())),
        }
    }

    /// Key for `item` at `index`.
    pub fn key_for(&self, item: &Value, index: usize) -> Option<String> {
        match self {
            Self::Index => Some(index.to_string()),
            Self::Primitive => Some(item.to_string()),
            Self::Path(path) => {
                let value = path
                    .split('.')
                    .fold(item.clone(), |current, segment| current.get(segment));
                (!value.is_undefined()).then(|| value.to_string())
            }
        }
    }
}

// =============================================================================
// Iterable
// =============================================================================

/// One item of an iteration pass.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationItem {
    pub key: Option<String>,
    pub value: Value,
    pub memo: Value,
}

/// A keyed view over a list reference.
pub struct Iterable {
    reference: ReferenceRef,
    strategy: KeyStrategy,
    clock: RevisionClock,
}

impl Iterable {
    pub fn new(reference: ReferenceRef, strategy: KeyStrategy, clock: &RevisionClock) -> Self {
        Self {
            reference,
            strategy,
            clock: clock.clone(),
        }
    }

    pub fn strategy(&self) -> &KeyStrategy {
        &self.strategy
    }

    /// Follows the list reference.
    pub fn tag(&self) -> Tag {
        self.reference.tag()
    }

    /// Start a pass over the current list. Each call re-reads the source.
    pub fn iterate(&self) -> ListIterator {
        let items = match self.reference.value() {
            Value::Array(items) => items,
            _ => Rc::from(Vec::new()),
        };
        ListIterator {
            items,
            position: 0,
            strategy: self.strategy.clone(),
            seen: HashSet::new(),
        }
    }

    /// Reference to hand the block for `item`'s value.
    pub fn value_reference_for(&self, item: &IterationItem) -> Rc<UpdatableReference> {
        Rc::new(UpdatableReference::new(&self.clock, item.value.clone()))
    }

    /// Point an existing value reference at `item`'s value.
    pub fn update_value_reference(&self, reference: &UpdatableReference, item: &IterationItem) {
        reference.update(item.value.clone());
    }
}

/// Lazy iterator over one pass. Keys are derived as items are pulled.
pub struct ListIterator {
    items: Rc<[Value]>,
    position: usize,
    strategy: KeyStrategy,
    seen: HashSet<String>,
}

impl ListIterator {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn unique(&mut self, key: String) -> String {
        if self.seen.insert(key.clone()) {
            return key;
        }

        let mut n = 1;
        let renamed = loop {
            let candidate = format!("{key}#{n}");
            if !self.seen.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        warn!(
            key = key.as_str(),
            renamed = renamed.as_str(),
            "duplicate key in #each; keys must be unique"
        );
        self.seen.insert(renamed.clone());
        renamed
    }
}

impl Iterator for ListIterator {
    type Item = IterationItem;

    fn next(&mut self) -> Option<IterationItem> {
        let index = self.position;
        let value = self.items.get(index)?.clone();
        self.position += 1;

        let key = self
            .strategy
            .key_for(&value, index)
            .map(|key| self.unique(key));

        Some(IterationItem {
            key,
            value,
            memo: Value::from(index),
        })
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

/// What changed for one position between two passes.
pub enum ListChange {
    /// A new item. Items without a key are always inserted fresh.
    Insert {
        key: Option<String>,
        index: usize,
        reference: Rc<UpdatableReference>,
    },
    /// A known item; its reference now holds the current value.
    Retain {
        key: String,
        index: usize,
        reference: Rc<UpdatableReference>,
    },
    /// An item gone from the list.
    Remove { key: String },
}

impl std::fmt::Debug for ListChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert { key, index, .. } => write!(f, "Insert({key:?} @ {index})"),
            Self::Retain { key, index, .. } => write!(f, "Retain({key:?} @ {index})"),
            Self::Remove { key } => write!(f, "Remove({key:?})"),
        }
    }
}

/// Keyed reconciliation state for one `{{#each}}` block.
#[derive(Default)]
pub struct ListReconciler {
    entries: HashMap<String, Rc<UpdatableReference>>,
    order: Vec<String>,
}

impl ListReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys retained from the last pass, in list order.
    pub fn keys(&self) -> &[String] {
        &self.order
    }

    /// Reference currently held for `key`.
    pub fn reference(&self, key: &str) -> Option<Rc<UpdatableReference>> {
        self.entries.get(key).cloned()
    }

    /// Run one pass and report what changed.
    ///
    /// Inserts and retains come in list order, followed by removals in the
    /// previous pass's order.
    pub fn sync(&mut self, iterable: &Iterable) -> Vec<ListChange> {
        let mut changes = Vec::new();
        let mut order = Vec::new();

        for (index, item) in iterable.iterate().enumerate() {
            let Some(key) = item.key.clone() else {
                changes.push(ListChange::Insert {
                    key: None,
                    index,
                    reference: iterable.value_reference_for(&item),
                });
                continue;
            };

            match self.entries.get(&key) {
                Some(reference) => {
                    if reference.peek() != item.value {
                        iterable.update_value_reference(reference, &item);
                    }
                    changes.push(ListChange::Retain {
                        key: key.clone(),
                        index,
                        reference: reference.clone(),
                    });
                }
                None => {
                    let reference = iterable.value_reference_for(&item);
                    self.entries.insert(key.clone(), reference.clone());
                    changes.push(ListChange::Insert {
                        key: Some(key.clone()),
                        index,
                        reference,
                    });
                }
            }
            order.push(key);
        }

        let current: HashSet<&String> = order.iter().collect();
        for key in &self.order {
            if !current.contains(key) {
                self.entries.remove(key);
                changes.push(ListChange::Remove { key: key.clone() });
            }
        }

        trace!(items = order.len(), changes = changes.len(), "reconciled list");
        self.order = order;
        changes
    }

    /// Forget every item, reporting each as removed.
    pub fn clear(&mut self) -> Vec<ListChange> {
        self.entries.clear();
        self.order
            .drain(..)
            .map(|key| ListChange::Remove { key })
            .collect()
    }
}
