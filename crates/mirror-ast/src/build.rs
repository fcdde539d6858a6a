//! Hand-assembly of syntax trees.
//!
//! Every node gets a fresh, non-overlapping range so that per-node results
//! keyed by range never collide.

use std::cell::Cell;

use rowan::{TextRange, TextSize};

use crate::node::{ClassDef, Literal, MethodDef, MethodKind, Node, Param, Script, TypeRef};

#[derive(Debug, Default)]
pub struct AstBuilder {
    next: Cell<u32>,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next unused range.
    pub fn span(&self) -> TextRange {
        let start = self.next.get();
        self.next.set(start + 2);
        TextRange::new(TextSize::from(start), TextSize::from(start + 1))
    }

    pub fn script(&self, filename: &str, body: Vec<Node>) -> Script {
        Script {
            filename: filename.to_string(),
            body,
            span: self.span(),
        }
    }

    // ── Types ───────────────────────────────────────────────────────────

    pub fn typeref(&self, name: &str) -> TypeRef {
        TypeRef {
            name: name.to_string(),
            is_array: false,
            is_static: false,
            span: self.span(),
        }
    }

    pub fn array_typeref(&self, name: &str) -> TypeRef {
        TypeRef {
            is_array: true,
            ..self.typeref(name)
        }
    }

    // ── Declarations ────────────────────────────────────────────────────

    pub fn package(&self, name: &str) -> Node {
        Node::Package {
            name: name.to_string(),
            span: self.span(),
        }
    }

    pub fn import(&self, full_name: &str, alias: &str) -> Node {
        Node::Import {
            full_name: full_name.to_string(),
            alias: alias.to_string(),
            span: self.span(),
        }
    }

    pub fn class(&self, name: &str, superclass: Option<&str>, body: Vec<Node>) -> Node {
        Node::ClassDef(ClassDef {
            name: name.to_string(),
            is_interface: false,
            superclass: superclass.map(|s| self.typeref(s)),
            interfaces: Vec::new(),
            body,
            span: self.span(),
        })
    }

    pub fn class_implementing(
        &self,
        name: &str,
        superclass: Option<&str>,
        interfaces: &[&str],
        body: Vec<Node>,
    ) -> Node {
        Node::ClassDef(ClassDef {
            name: name.to_string(),
            is_interface: false,
            superclass: superclass.map(|s| self.typeref(s)),
            interfaces: interfaces.iter().map(|i| self.typeref(i)).collect(),
            body,
            span: self.span(),
        })
    }

    pub fn interface(&self, name: &str, extends: &[&str], body: Vec<Node>) -> Node {
        Node::ClassDef(ClassDef {
            name: name.to_string(),
            is_interface: true,
            superclass: None,
            interfaces: extends.iter().map(|i| self.typeref(i)).collect(),
            body,
            span: self.span(),
        })
    }

    pub fn param(&self, name: &str, ty: &str) -> Param {
        Param {
            name: name.to_string(),
            ty: Some(self.typeref(ty)),
            span: self.span(),
        }
    }

    pub fn untyped_param(&self, name: &str) -> Param {
        Param {
            name: name.to_string(),
            ty: None,
            span: self.span(),
        }
    }

    pub fn method(
        &self,
        name: &str,
        params: Vec<Param>,
        return_type: Option<&str>,
        body: Vec<Node>,
    ) -> Node {
        self.method_of_kind(MethodKind::Instance, name, params, return_type, body)
    }

    pub fn static_method(
        &self,
        name: &str,
        params: Vec<Param>,
        return_type: Option<&str>,
        body: Vec<Node>,
    ) -> Node {
        self.method_of_kind(MethodKind::Static, name, params, return_type, body)
    }

    pub fn constructor(&self, params: Vec<Param>, body: Vec<Node>) -> Node {
        self.method_of_kind(MethodKind::Constructor, "initialize", params, None, body)
    }

    fn method_of_kind(
        &self,
        kind: MethodKind,
        name: &str,
        params: Vec<Param>,
        return_type: Option<&str>,
        body: Vec<Node>,
    ) -> Node {
        Node::MethodDef(MethodDef {
            name: name.to_string(),
            kind,
            params,
            return_type: return_type.map(|t| self.typeref(t)),
            body,
            span: self.span(),
        })
    }

    pub fn field_decl(&self, name: &str, ty: &str, is_static: bool) -> Node {
        Node::FieldDecl {
            name: name.to_string(),
            ty: self.typeref(ty),
            is_static,
            span: self.span(),
        }
    }

    // ── Literals ────────────────────────────────────────────────────────

    fn literal(&self, value: Literal) -> Node {
        Node::Literal {
            value,
            span: self.span(),
        }
    }

    pub fn fixnum(&self, value: i64) -> Node {
        self.literal(Literal::Fixnum(value))
    }

    pub fn float(&self, value: f64) -> Node {
        self.literal(Literal::Float(value))
    }

    pub fn bool(&self, value: bool) -> Node {
        self.literal(Literal::Bool(value))
    }

    pub fn char(&self, value: char) -> Node {
        self.literal(Literal::Char(value))
    }

    pub fn string(&self, value: &str) -> Node {
        self.literal(Literal::String(value.to_string()))
    }

    pub fn regex(&self, value: &str) -> Node {
        self.literal(Literal::Regex(value.to_string()))
    }

    pub fn nil(&self) -> Node {
        self.literal(Literal::Nil)
    }

    pub fn array(&self, elements: Vec<Node>) -> Node {
        Node::ArrayLiteral {
            elements,
            span: self.span(),
        }
    }

    pub fn hash(&self, entries: Vec<(Node, Node)>) -> Node {
        Node::HashLiteral {
            entries,
            span: self.span(),
        }
    }

    // ── Variables and fields ────────────────────────────────────────────

    pub fn local(&self, name: &str) -> Node {
        Node::LocalRef {
            name: name.to_string(),
            span: self.span(),
        }
    }

    pub fn assign(&self, name: &str, value: Node) -> Node {
        Node::LocalAssign {
            name: name.to_string(),
            value: Box::new(value),
            span: self.span(),
        }
    }

    pub fn declare(&self, name: &str, ty: &str) -> Node {
        Node::LocalDecl {
            name: name.to_string(),
            ty: self.typeref(ty),
            span: self.span(),
        }
    }

    pub fn field(&self, name: &str) -> Node {
        Node::FieldRef {
            name: name.to_string(),
            is_static: false,
            span: self.span(),
        }
    }

    pub fn field_assign(&self, name: &str, value: Node) -> Node {
        Node::FieldAssign {
            name: name.to_string(),
            value: Box::new(value),
            is_static: false,
            span: self.span(),
        }
    }

    pub fn static_field_assign(&self, name: &str, value: Node) -> Node {
        Node::FieldAssign {
            name: name.to_string(),
            value: Box::new(value),
            is_static: true,
            span: self.span(),
        }
    }

    // ── Calls ───────────────────────────────────────────────────────────

    pub fn call(&self, target: Node, name: &str, args: Vec<Node>) -> Node {
        Node::Call {
            target: Some(Box::new(target)),
            name: name.to_string(),
            args,
            span: self.span(),
        }
    }

    /// A call with an implicit `self` receiver.
    pub fn fcall(&self, name: &str, args: Vec<Node>) -> Node {
        Node::Call {
            target: None,
            name: name.to_string(),
            args,
            span: self.span(),
        }
    }

    pub fn super_call(&self, args: Vec<Node>) -> Node {
        Node::Super {
            args,
            span: self.span(),
        }
    }

    pub fn self_ref(&self) -> Node {
        Node::SelfRef { span: self.span() }
    }

    pub fn constant(&self, name: &str) -> Node {
        Node::Constant {
            ty: self.typeref(name),
            span: self.span(),
        }
    }

    // ── Control flow ────────────────────────────────────────────────────

    pub fn if_else(&self, condition: Node, then_body: Vec<Node>, else_body: Option<Vec<Node>>) -> Node {
        Node::If {
            condition: Box::new(condition),
            then_body,
            else_body,
            span: self.span(),
        }
    }

    pub fn while_loop(&self, condition: Node, body: Vec<Node>) -> Node {
        Node::While {
            condition: Box::new(condition),
            body,
            span: self.span(),
        }
    }

    pub fn ret(&self, value: Option<Node>) -> Node {
        Node::Return {
            value: value.map(Box::new),
            span: self.span(),
        }
    }

    pub fn cast(&self, ty: &str, value: Node) -> Node {
        Node::Cast {
            ty: self.typeref(ty),
            value: Box::new(value),
            span: self.span(),
        }
    }

    pub fn new_array(&self, component: &str, size: Node) -> Node {
        Node::NewArray {
            component: self.typeref(component),
            size: Box::new(size),
            span: self.span(),
        }
    }

    pub fn block(&self, body: Vec<Node>) -> Node {
        Node::Block {
            body,
            span: self.span(),
        }
    }
}
