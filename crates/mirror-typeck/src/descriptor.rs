//! Host type descriptor codec.
//!
//! Field descriptors: a primitive code (`I`), a reference `L<internal>;`, or
//! `[` followed by a component descriptor. Method descriptors wrap parameter
//! descriptors in parentheses followed by the return descriptor:
//! `(ILjava/lang/String;)V`.

use std::fmt;

use crate::ty::Primitive;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldDescriptor {
    Primitive(Primitive),
    /// Internal (slash separated) class name.
    Object(String),
    Array(Box<FieldDescriptor>),
}

impl FieldDescriptor {
    pub fn parse(input: &str) -> Result<FieldDescriptor, DescriptorError> {
        let (descriptor, rest) = parse_prefix(input, input, false)?;
        if !rest.is_empty() {
            return Err(DescriptorError::new(input, "trailing characters"));
        }
        Ok(descriptor)
    }

    /// Dotted source-level class name for reference types.
    pub fn class_name(&self) -> Option<String> {
        match self {
            FieldDescriptor::Object(internal) => Some(mirror_common::names::to_dotted(internal)),
            _ => None,
        }
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDescriptor::Primitive(p) => write!(f, "{}", p.code()),
            FieldDescriptor::Object(internal) => write!(f, "L{};", internal),
            FieldDescriptor::Array(component) => write!(f, "[{}", component),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub params: Vec<FieldDescriptor>,
    pub ret: FieldDescriptor,
}

impl MethodDescriptor {
    pub fn parse(input: &str) -> Result<MethodDescriptor, DescriptorError> {
        let mut rest = input
            .strip_prefix('(')
            .ok_or_else(|| DescriptorError::new(input, "expected `(`"))?;
        let mut params = Vec::new();
        while !rest.starts_with(')') {
            if rest.is_empty() {
                return Err(DescriptorError::new(input, "unterminated parameter list"));
            }
            let (param, tail) = parse_prefix(input, rest, false)?;
            params.push(param);
            rest = tail;
        }
        let (ret, tail) = parse_prefix(input, &rest[1..], true)?;
        if !tail.is_empty() {
            return Err(DescriptorError::new(input, "trailing characters"));
        }
        Ok(MethodDescriptor { params, ret })
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for param in &self.params {
            write!(f, "{}", param)?;
        }
        write!(f, "){}", self.ret)
    }
}

fn parse_prefix<'a>(
    input: &str,
    text: &'a str,
    allow_void: bool,
) -> Result<(FieldDescriptor, &'a str), DescriptorError> {
    let mut chars = text.chars();
    let first = chars
        .next()
        .ok_or_else(|| DescriptorError::new(input, "unexpected end of descriptor"))?;
    let rest = chars.as_str();
    match first {
        'L' => {
            let end = rest
                .find(';')
                .ok_or_else(|| DescriptorError::new(input, "unterminated class name"))?;
            if end == 0 {
                return Err(DescriptorError::new(input, "empty class name"));
            }
            Ok((FieldDescriptor::Object(rest[..end].to_string()), &rest[end + 1..]))
        }
        '[' => {
            let (component, tail) = parse_prefix(input, rest, false)?;
            Ok((FieldDescriptor::Array(Box::new(component)), tail))
        }
        'V' if !allow_void => Err(DescriptorError::new(input, "void is only valid as a return type")),
        code => match Primitive::from_code(code) {
            Some(p) => Ok((FieldDescriptor::Primitive(p), rest)),
            None => Err(DescriptorError::new(input, "unknown type code")),
        },
    }
}

/// A malformed descriptor string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DescriptorError {
    pub input: String,
    pub reason: &'static str,
}

impl DescriptorError {
    fn new(input: &str, reason: &'static str) -> Self {
        DescriptorError {
            input: input.to_string(),
            reason,
        }
    }
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid descriptor `{}`: {}", self.input, self.reason)
    }
}

impl std::error::Error for DescriptorError {}
