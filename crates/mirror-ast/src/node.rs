use rowan::TextRange;

/// A compilation unit: one source file.
#[derive(Clone, Debug, PartialEq)]
pub struct Script {
    /// File name the unit was read from. The implicit main class is derived
    /// from it.
    pub filename: String,
    pub body: Vec<Node>,
    pub span: TextRange,
}

/// A syntactic reference to a type: `int`, `String`, `java.util.List`,
/// `int[]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeRef {
    pub name: String,
    pub is_array: bool,
    /// Refers to the class object rather than an instance.
    pub is_static: bool,
    pub span: TextRange,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Fixnum(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    String(String),
    Regex(String),
    Nil,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodKind {
    Instance,
    Static,
    Constructor,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    /// Parameters without a type are an inference error; the resolver never
    /// guesses a parameter type.
    pub ty: Option<TypeRef>,
    pub span: TextRange,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodDef {
    pub name: String,
    pub kind: MethodKind,
    pub params: Vec<Param>,
    /// `None` means the return type is inferred from the body.
    pub return_type: Option<TypeRef>,
    pub body: Vec<Node>,
    pub span: TextRange,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub is_interface: bool,
    pub superclass: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub body: Vec<Node>,
    pub span: TextRange,
}

/// Every syntactic construct the type resolver understands.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// `package foo.bar`; applies to the rest of the file.
    Package { name: String, span: TextRange },
    /// `import java.util.Map as JavaMap`, or `import bar.*` with alias `*`.
    Import {
        full_name: String,
        alias: String,
        span: TextRange,
    },
    ClassDef(ClassDef),
    MethodDef(MethodDef),
    /// `@foo:int` or `@@foo:int`.
    FieldDecl {
        name: String,
        ty: TypeRef,
        is_static: bool,
        span: TextRange,
    },
    FieldAssign {
        name: String,
        value: Box<Node>,
        is_static: bool,
        span: TextRange,
    },
    FieldRef {
        name: String,
        is_static: bool,
        span: TextRange,
    },
    /// `a:int`.
    LocalDecl {
        name: String,
        ty: TypeRef,
        span: TextRange,
    },
    LocalAssign {
        name: String,
        value: Box<Node>,
        span: TextRange,
    },
    /// A bare identifier. Falls back to a zero-argument call on `self` when no
    /// local of that name is in scope.
    LocalRef { name: String, span: TextRange },
    /// `target.name(args)`; a missing target means `self`.
    Call {
        target: Option<Box<Node>>,
        name: String,
        args: Vec<Node>,
        span: TextRange,
    },
    Super { args: Vec<Node>, span: TextRange },
    SelfRef { span: TextRange },
    /// A type name used as a value, e.g. the `System` in `System.out`.
    Constant { ty: TypeRef, span: TextRange },
    Literal { value: Literal, span: TextRange },
    ArrayLiteral { elements: Vec<Node>, span: TextRange },
    HashLiteral {
        entries: Vec<(Node, Node)>,
        span: TextRange,
    },
    If {
        condition: Box<Node>,
        then_body: Vec<Node>,
        else_body: Option<Vec<Node>>,
        span: TextRange,
    },
    While {
        condition: Box<Node>,
        body: Vec<Node>,
        span: TextRange,
    },
    Return {
        value: Option<Box<Node>>,
        span: TextRange,
    },
    Cast {
        ty: TypeRef,
        value: Box<Node>,
        span: TextRange,
    },
    /// `int[size]`.
    NewArray {
        component: TypeRef,
        size: Box<Node>,
        span: TextRange,
    },
    /// A nested lexical scope (closure body, `do ... end` block).
    Block { body: Vec<Node>, span: TextRange },
}

impl Node {
    pub fn span(&self) -> TextRange {
        match self {
            Node::ClassDef(class) => class.span,
            Node::MethodDef(method) => method.span,
            Node::Package { span, .. }
            | Node::Import { span, .. }
            | Node::FieldDecl { span, .. }
            | Node::FieldAssign { span, .. }
            | Node::FieldRef { span, .. }
            | Node::LocalDecl { span, .. }
            | Node::LocalAssign { span, .. }
            | Node::LocalRef { span, .. }
            | Node::Call { span, .. }
            | Node::Super { span, .. }
            | Node::SelfRef { span }
            | Node::Constant { span, .. }
            | Node::Literal { span, .. }
            | Node::ArrayLiteral { span, .. }
            | Node::HashLiteral { span, .. }
            | Node::If { span, .. }
            | Node::While { span, .. }
            | Node::Return { span, .. }
            | Node::Cast { span, .. }
            | Node::NewArray { span, .. }
            | Node::Block { span, .. } => *span,
        }
    }

    /// Declarations produce no value of their own.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            Node::Package { .. }
                | Node::Import { .. }
                | Node::ClassDef(_)
                | Node::MethodDef(_)
                | Node::FieldDecl { .. }
        )
    }
}
