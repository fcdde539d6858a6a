//! Host type representation.
//!
//! Every type the resolver knows about lives in the [`TypeSystem`] arena and
//! is addressed by a [`TypeId`]. A type's identity is its descriptor: asking
//! for the same class twice always yields the same `TypeId`.
//!
//! [`TypeSystem`]: crate::registry::TypeSystem

use std::fmt;

use rowan::TextRange;

use crate::cell::CellId;
use crate::future::FutureId;

/// Handle to a [`HostType`] in the type arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// The distinguished error marker. Reading an unresolved or failed future
    /// yields this type.
    pub const ERROR: TypeId = TypeId(0);
    /// The type of the `nil` literal.
    pub const NULL: TypeId = TypeId(1);

    pub fn is_error(self) -> bool {
        self == TypeId::ERROR
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Access flags, using the host runtime's bit values.
pub mod flags {
    pub const ACC_PUBLIC: u16 = 0x0001;
    pub const ACC_PRIVATE: u16 = 0x0002;
    pub const ACC_PROTECTED: u16 = 0x0004;
    pub const ACC_STATIC: u16 = 0x0008;
    pub const ACC_FINAL: u16 = 0x0010;
    pub const ACC_INTERFACE: u16 = 0x0200;
    pub const ACC_ABSTRACT: u16 = 0x0400;
    pub const ACC_SYNTHETIC: u16 = 0x1000;
}

/// The fixed primitive vocabulary of the host runtime.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
}

impl Primitive {
    pub const ALL: [Primitive; 9] = [
        Primitive::Boolean,
        Primitive::Byte,
        Primitive::Char,
        Primitive::Short,
        Primitive::Int,
        Primitive::Long,
        Primitive::Float,
        Primitive::Double,
        Primitive::Void,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Char => "char",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Void => "void",
        }
    }

    /// Single-letter descriptor code.
    pub fn code(self) -> char {
        match self {
            Primitive::Boolean => 'Z',
            Primitive::Byte => 'B',
            Primitive::Char => 'C',
            Primitive::Short => 'S',
            Primitive::Int => 'I',
            Primitive::Long => 'J',
            Primitive::Float => 'F',
            Primitive::Double => 'D',
            Primitive::Void => 'V',
        }
    }

    pub fn from_name(name: &str) -> Option<Primitive> {
        Primitive::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn from_code(code: char) -> Option<Primitive> {
        Primitive::ALL.into_iter().find(|p| p.code() == code)
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, Primitive::Boolean | Primitive::Void)
    }

    /// Identity or primitive widening conversion.
    pub fn widens_to(self, to: Primitive) -> bool {
        use Primitive::*;
        if self == to {
            return true;
        }
        match self {
            Byte => matches!(to, Short | Int | Long | Float | Double),
            Short | Char => matches!(to, Int | Long | Float | Double),
            Int => matches!(to, Long | Float | Double),
            Long => matches!(to, Float | Double),
            Float => matches!(to, Double),
            Boolean | Double | Void => false,
        }
    }

    /// Unary numeric promotion: sub-int types compute as `int`.
    pub fn promoted(self) -> Primitive {
        match self {
            Primitive::Byte | Primitive::Short | Primitive::Char => Primitive::Int,
            other => other,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Error,
    Null,
    Primitive(Primitive),
    /// Array of the given component type.
    Array(TypeId),
    Class,
    Interface,
    /// The class object of the given instance type.
    Meta(TypeId),
}

/// A type in the host runtime's type system.
#[derive(Clone, Debug)]
pub struct HostType {
    /// Source-level name: `java.lang.String`, `int`, `int[]`.
    pub name: String,
    /// Canonical descriptor: `Ljava/lang/String;`, `I`, `[I`.
    pub descriptor: String,
    pub kind: TypeKind,
    /// Pending superclasses stay unresolved futures until their definition
    /// is known.
    pub superclass: Option<FutureId>,
    pub interfaces: Vec<FutureId>,
    pub members: Vec<MemberId>,
    pub flags: u16,
    pub(crate) meta: Option<TypeId>,
    /// Created implicitly as a script's main class; an explicit definition
    /// may still supply its superclass.
    pub(crate) implicit: bool,
}

impl HostType {
    pub(crate) fn new(name: impl Into<String>, descriptor: impl Into<String>, kind: TypeKind) -> Self {
        HostType {
            name: name.into(),
            descriptor: descriptor.into(),
            kind,
            superclass: None,
            interfaces: Vec::new(),
            members: Vec::new(),
            flags: flags::ACC_PUBLIC,
            meta: None,
            implicit: false,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, TypeKind::Error)
    }

    pub fn is_meta(&self) -> bool {
        matches!(self.kind, TypeKind::Meta(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array(_))
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.kind, TypeKind::Interface)
    }

    pub fn primitive(&self) -> Option<Primitive> {
        match self.kind {
            TypeKind::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        self.primitive() == Some(Primitive::Void)
    }

    pub fn component_type(&self) -> Option<TypeId> {
        match self.kind {
            TypeKind::Array(component) => Some(component),
            _ => None,
        }
    }
}

/// Handle to a [`Member`] in the member arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub(crate) u32);

impl MemberId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a selected member is, as far as instruction selection cares.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Constructor,
    Method,
    StaticMethod,
    FieldAccess,
    StaticFieldAccess,
    ArrayLength,
    ArrayAccess,
    ArrayAssign,
    /// A primitive operator such as `int#+(int)`.
    Intrinsic,
}

impl MemberKind {
    pub fn is_static(self) -> bool {
        matches!(self, MemberKind::StaticMethod | MemberKind::StaticFieldAccess)
    }

    pub fn is_field(self) -> bool {
        matches!(self, MemberKind::FieldAccess | MemberKind::StaticFieldAccess)
    }

    pub fn name(self) -> &'static str {
        match self {
            MemberKind::Constructor => "CONSTRUCTOR",
            MemberKind::Method => "METHOD",
            MemberKind::StaticMethod => "STATIC_METHOD",
            MemberKind::FieldAccess => "FIELD_ACCESS",
            MemberKind::StaticFieldAccess => "STATIC_FIELD_ACCESS",
            MemberKind::ArrayLength => "ARRAY_LENGTH",
            MemberKind::ArrayAccess => "ARRAY_ACCESS",
            MemberKind::ArrayAssign => "ARRAY_ASSIGN",
            MemberKind::Intrinsic => "INTRINSIC",
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A method, constructor, field or built-in operation on a type.
#[derive(Clone, Debug)]
pub struct Member {
    /// Host-level name; constructors are `<init>`.
    pub name: String,
    pub owner: TypeId,
    pub kind: MemberKind,
    pub params: Vec<FutureId>,
    pub return_type: FutureId,
    pub flags: u16,
    pub span: Option<TextRange>,
    /// Set when the return (or field) type is inferred rather than fixed.
    pub(crate) cell: Option<CellId>,
}

impl Member {
    pub fn is_synthetic(&self) -> bool {
        self.flags & flags::ACC_SYNTHETIC != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_codes_round_trip() {
        for p in Primitive::ALL {
            assert_eq!(Primitive::from_code(p.code()), Some(p));
            assert_eq!(Primitive::from_name(p.name()), Some(p));
        }
        assert_eq!(Primitive::from_name("String"), None);
    }

    #[test]
    fn widening_follows_host_rules() {
        assert!(Primitive::Short.widens_to(Primitive::Int));
        assert!(Primitive::Int.widens_to(Primitive::Double));
        assert!(Primitive::Char.widens_to(Primitive::Long));
        assert!(!Primitive::Int.widens_to(Primitive::Short));
        assert!(!Primitive::Char.widens_to(Primitive::Short));
        assert!(!Primitive::Boolean.widens_to(Primitive::Int));
        assert!(Primitive::Boolean.widens_to(Primitive::Boolean));
    }

    #[test]
    fn promotion() {
        assert_eq!(Primitive::Byte.promoted(), Primitive::Int);
        assert_eq!(Primitive::Long.promoted(), Primitive::Long);
    }
}
