use std::fmt;

/// Opaque caller-defined identifier stored next to a payload.
///
/// The box never looks at it. Callers can use it as an enum discriminant, an index into a type
/// table, or leave it at [`TypeTag::UNTYPED`].
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct TypeTag(u64);

impl TypeTag {
    /// The default tag, for payloads nobody cares to label.
    pub const UNTYPED: TypeTag = TypeTag(0);

    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(id: u64) -> TypeTag {
        TypeTag(id)
    }

    /// The raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_untyped(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for TypeTag {
    fn from(id: u64) -> Self {
        TypeTag(id)
    }
}

impl From<TypeTag> for u64 {
    fn from(tag: TypeTag) -> Self {
        tag.0
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_untyped() {
            f.write_str("TypeTag::UNTYPED")
        } else {
            f.debug_tuple("TypeTag").field(&self.0).finish()
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
