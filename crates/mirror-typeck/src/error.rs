//! Inference errors.
//!
//! Errors never cross into code generation as failures. They ride inside
//! error future states, propagate to every dependent future by value, and are
//! collected once the driver finalizes. Each one remembers where it came from.

use std::fmt;

use rowan::TextRange;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeError {
    /// A type name not found by any resolution step.
    UnresolvedType {
        name: String,
        span: Option<TextRange>,
    },
    /// No member of that name and arity accepts the argument types.
    NoApplicableMethod {
        receiver: String,
        name: String,
        args: Vec<String>,
        span: Option<TextRange>,
    },
    /// Several applicable members, none more specific than the rest.
    AmbiguousMethod {
        receiver: String,
        name: String,
        candidates: Vec<String>,
        span: Option<TextRange>,
    },
    /// A local, field or return value assigned a type incompatible with the
    /// one already established.
    IncompatibleAssignment {
        name: String,
        expected: String,
        found: String,
        span: Option<TextRange>,
    },
    /// The fixpoint did not settle within its pass or step budget.
    NonTerminating { passes: usize },
    /// A cell was still unresolved when inference finished.
    Uninferred {
        what: String,
        span: Option<TextRange>,
    },
    /// A single-assignment future was resolved twice with different types.
    InconsistentResolution { previous: String, attempted: String },
    /// A superclass was requested for a type that has none.
    NoSuperclass {
        ty: String,
        span: Option<TextRange>,
    },
    /// A method parameter without a declared type.
    UntypedParameter { name: String, span: TextRange },
}

impl TypeError {
    pub fn span(&self) -> Option<TextRange> {
        match self {
            TypeError::UnresolvedType { span, .. }
            | TypeError::NoApplicableMethod { span, .. }
            | TypeError::AmbiguousMethod { span, .. }
            | TypeError::IncompatibleAssignment { span, .. }
            | TypeError::Uninferred { span, .. }
            | TypeError::NoSuperclass { span, .. } => *span,
            TypeError::UntypedParameter { span, .. } => Some(*span),
            TypeError::NonTerminating { .. } | TypeError::InconsistentResolution { .. } => None,
        }
    }

    /// Whether the error aborts the compilation unit rather than degrading a
    /// single cell.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TypeError::NonTerminating { .. } | TypeError::InconsistentResolution { .. }
        )
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::UnresolvedType { name, .. } => {
                write!(f, "cannot find type `{}`", name)
            }
            TypeError::NoApplicableMethod {
                receiver,
                name,
                args,
                ..
            } => {
                write!(
                    f,
                    "no method `{}({})` on `{}`",
                    name,
                    args.join(", "),
                    receiver
                )
            }
            TypeError::AmbiguousMethod {
                receiver,
                name,
                candidates,
                ..
            } => {
                write!(
                    f,
                    "ambiguous call to `{}` on `{}`: candidates {}",
                    name,
                    receiver,
                    candidates.join(", ")
                )
            }
            TypeError::IncompatibleAssignment {
                name,
                expected,
                found,
                ..
            } => {
                write!(
                    f,
                    "cannot assign `{}` to `{}` of type `{}`",
                    found, name, expected
                )
            }
            TypeError::NonTerminating { passes } => {
                write!(f, "type inference did not settle after {} passes", passes)
            }
            TypeError::Uninferred { what, .. } => {
                write!(f, "could not infer the type of {}", what)
            }
            TypeError::InconsistentResolution {
                previous,
                attempted,
            } => {
                write!(
                    f,
                    "future already resolved to `{}`, cannot resolve to `{}`",
                    previous, attempted
                )
            }
            TypeError::NoSuperclass { ty, .. } => {
                write!(f, "`{}` has no superclass", ty)
            }
            TypeError::UntypedParameter { name, .. } => {
                write!(f, "parameter `{}` needs a type", name)
            }
        }
    }
}

impl std::error::Error for TypeError {}

#[cfg(test)]
mod tests {
    use super::*;
    use rowan::TextSize;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::from(start), TextSize::from(end))
    }

    #[test]
    fn display_messages() {
        let err = TypeError::NoApplicableMethod {
            receiver: "FooBar".into(),
            name: "foo".into(),
            args: vec!["int".into(), "java.lang.String".into()],
            span: None,
        };
        assert_eq!(err.to_string(), "no method `foo(int, java.lang.String)` on `FooBar`");

        let err = TypeError::IncompatibleAssignment {
            name: "a".into(),
            expected: "int".into(),
            found: "java.lang.String".into(),
            span: None,
        };
        assert_eq!(err.to_string(), "cannot assign `java.lang.String` to `a` of type `int`");
    }

    #[test]
    fn span_and_fatality() {
        let err = TypeError::UnresolvedType {
            name: "Nope".into(),
            span: Some(range(3, 7)),
        };
        assert_eq!(err.span(), Some(range(3, 7)));
        assert!(!err.is_fatal());
        assert!(TypeError::NonTerminating { passes: 3 }.is_fatal());
        assert_eq!(TypeError::NonTerminating { passes: 3 }.span(), None);
    }
}
