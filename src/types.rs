//! Core types shared by the resolver, the component manager and the VM
//! boundary.

use std::fmt;
use std::str::FromStr;

// =============================================================================
// Specifier
// =============================================================================

/// Kinds of artifact the resolver can hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecifierKind {
    Helper,
    Modifier,
    Component,
    Partial,
    Template,
    Layout,
}

impl SpecifierKind {
    /// Name used as the key prefix (`component:Foo`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Helper => "helper",
            Self::Modifier => "modifier",
            Self::Component => "component",
            Self::Partial => "partial",
            Self::Template => "template",
            Self::Layout => "layout",
        }
    }
}

impl fmt::Display for SpecifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpecifierKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "helper" => Ok(Self::Helper),
            "modifier" => Ok(Self::Modifier),
            "component" => Ok(Self::Component),
            "partial" => Ok(Self::Partial),
            "template" => Ok(Self::Template),
            "layout" => Ok(Self::Layout),
            _ => Err(()),
        }
    }
}

/// A resolved `(kind, name)` pair. Only the resolver produces these.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Specifier {
    pub kind: SpecifierKind,
    pub name: String,
}

impl Specifier {
    pub fn new(kind: SpecifierKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Parse a `kind:name` key as returned by the naming authority.
    pub fn parse(key: &str) -> Option<Self> {
        let (kind, name) = key.split_once(':')?;
        Some(Self::new(kind.parse().ok()?, name))
    }

    /// The `kind:name` key.
    pub fn key(&self) -> String {
        format!("{}:{}", self.kind, self.name)
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

// =============================================================================
// Capabilities (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// What a component definition asks of the VM.
    ///
    /// Combine with bitwise OR: `Capabilities::DYNAMIC_TAG | Capabilities::CREATE_ARGS`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        const DYNAMIC_LAYOUT = 1 << 0;
        const DYNAMIC_TAG = 1 << 1;
        const PREPARE_ARGS = 1 << 2;
        const CREATE_ARGS = 1 << 3;
        const ATTRIBUTE_HOOK = 1 << 4;
        const ELEMENT_HOOK = 1 << 5;
    }
}

impl Capabilities {
    /// Capabilities of every definition built by the resolver.
    pub const STANDARD: Self = Self::DYNAMIC_TAG
        .union(Self::CREATE_ARGS)
        .union(Self::ATTRIBUTE_HOOK);
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::STANDARD
    }
}

// =============================================================================
// TemplateMeta
// =============================================================================

/// Where a lookup comes from: the module specifier of the referring template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateMeta {
    pub specifier: Option<String>,
}

impl TemplateMeta {
    pub fn new(specifier: impl Into<String>) -> Self {
        Self {
            specifier: Some(specifier.into()),
        }
    }

    pub fn referrer(&self) -> Option<&str> {
        self.specifier.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specifier_parse() {
        let spec = Specifier::parse("component:UserCard").unwrap();
        assert_eq!(spec.kind, SpecifierKind::Component);
        assert_eq!(spec.name, "UserCard");
        assert_eq!(spec.key(), "component:UserCard");

        // Only the first colon separates kind from name
        let scoped = Specifier::parse("template:app:Nested").unwrap();
        assert_eq!(scoped.name, "app:Nested");

        assert!(Specifier::parse("widget:Foo").is_none());
        assert!(Specifier::parse("no-colon").is_none());
    }

    #[test]
    fn test_specifier_value_equality() {
        let a = Specifier::new(SpecifierKind::Helper, "format");
        let b = Specifier::new(SpecifierKind::Helper, "format");
        assert_eq!(a, b);
        assert_ne!(a, Specifier::new(SpecifierKind::Modifier, "format"));
    }

    #[test]
    fn test_standard_capabilities() {
        let caps = Capabilities::default();
        assert!(caps.contains(Capabilities::DYNAMIC_TAG));
        assert!(caps.contains(Capabilities::CREATE_ARGS));
        assert!(caps.contains(Capabilities::ATTRIBUTE_HOOK));
        assert!(!caps.intersects(
            Capabilities::DYNAMIC_LAYOUT | Capabilities::PREPARE_ARGS | Capabilities::ELEMENT_HOOK
        ));
    }
}
