//! The type system's registry: built-in types, user definitions, scopes
//! and name resolution.

use mirror_ast::{AstBuilder, TypeRef};
use mirror_common::classname_from_filename;
use mirror_typeck::{FutureId, FutureState, MemberKind, ScopeContext, ScopeId, TypeSystem};

struct Fixture {
    ts: TypeSystem,
    scope: ScopeId,
    b: AstBuilder,
}

impl Fixture {
    fn new() -> Self {
        let mut ts = TypeSystem::new();
        let scope = ts.new_scope(None);
        ts.set_context(scope, ScopeContext::Script);
        Fixture {
            ts,
            scope,
            b: AstBuilder::new(),
        }
    }

    fn main_type(&mut self) -> FutureId {
        self.ts.get_main_type(self.scope, "foo_bar.mirah")
    }

    fn define(&mut self, name: &str) -> FutureId {
        self.ts.define_type(self.scope, name, None, &[])
    }

    fn get(&mut self, name: &str) -> FutureId {
        let type_ref: TypeRef = self.b.typeref(name);
        self.ts.get(self.scope, &type_ref)
    }

    fn descriptor(&self, future: FutureId) -> String {
        match self.ts.state(future) {
            FutureState::Resolved(ty) => self.ts.descriptor(*ty).to_string(),
            other => panic!("expected a resolved future, got {:?}", other),
        }
    }
}

// ── Built-in types ─────────────────────────────────────────────────────

#[test]
fn test_literal_types() {
    let ts = TypeSystem::new();
    let descriptors: Vec<&str> = [
        ts.fixnum(0),
        ts.string(),
        ts.void(),
        ts.regex(),
        ts.hash(),
        ts.float(),
        ts.default_exception(),
        ts.base_exception(),
        ts.boolean(),
        ts.list(),
    ]
    .into_iter()
    .map(|ty| ts.descriptor(ty))
    .collect();
    assert_eq!(
        descriptors,
        [
            "I",
            "Ljava/lang/String;",
            "V",
            "Ljava/util/regex/Pattern;",
            "Ljava/util/HashMap;",
            "D",
            "Ljava/lang/Exception;",
            "Ljava/lang/Throwable;",
            "Z",
            "Ljava/util/List;",
        ]
    );
}

#[test]
fn test_null_type() {
    let ts = TypeSystem::new();
    let null = ts.null();
    assert_eq!(ts.type_name(null), "null");
    assert_eq!(ts.descriptor(null), "Ljava/lang/Object;");
}

#[test]
fn test_default_imports() {
    let mut f = Fixture::new();
    f.ts.add_default_imports(f.scope);
    let found = f.get("StackTraceElement");
    assert_eq!(f.descriptor(found), "Ljava/lang/StackTraceElement;");
}

#[test]
fn test_get_primitive() {
    let mut f = Fixture::new();
    let void = f.get("void");
    assert_eq!(f.descriptor(void), "V");
}

// ── Main type ──────────────────────────────────────────────────────────

#[test]
fn test_main_type() {
    let mut f = Fixture::new();
    let main = f.main_type();
    assert_eq!(f.descriptor(main), "LFooBar;");
    assert!(f.ts.host_type(f.ts.resolve(main)).is_meta());

    let other = f.ts.get_main_type(f.scope, "some_class.mirah");
    assert_eq!(f.descriptor(other), "LSomeClass;");
}

#[test]
fn test_main_type_with_package() {
    let mut f = Fixture::new();
    f.ts.set_package(f.scope, Some("foo.bar"));
    let main = f.main_type();
    assert_eq!(f.descriptor(main), "Lfoo/bar/FooBar;");
}

#[test]
fn test_main_type_superclass_is_object() {
    let mut f = Fixture::new();
    let main = f.main_type();
    let sup = f.ts.get_super_class(main);
    assert_eq!(f.descriptor(sup), "Ljava/lang/Object;");
}

#[test]
fn test_redefine_main_type() {
    let mut f = Fixture::new();
    let main = f.main_type();
    let existing = f.ts.unmeta(f.ts.resolve(main));
    let redefined = f.define("FooBar");
    assert_eq!(f.ts.resolve(redefined), existing);
}

#[test]
fn test_classname_from_filename() {
    assert_eq!(classname_from_filename("SomeClass.mirah"), "SomeClass");
    assert_eq!(classname_from_filename("FooBar.mirah"), "FooBar");
    assert_eq!(classname_from_filename("some_class.mirah"), "SomeClass");
    assert_eq!(classname_from_filename("foo-bar.mirah"), "FooBar");
    assert_eq!(classname_from_filename("foo/bar/some_class.mirah"), "SomeClass");
}

// ── Definitions ────────────────────────────────────────────────────────

#[test]
fn test_define_type_with_superclass() {
    let mut f = Fixture::new();
    let main = f.main_type();
    let main_instance = f.ts.unmeta(f.ts.resolve(main));
    let main_instance = f.ts.type_future(main_instance);
    let sub = f.ts.define_type(f.scope, "Subclass", Some(main_instance), &[]);
    assert_eq!(f.descriptor(sub), "LSubclass;");
    let sup = f.ts.get_super_class(sub);
    assert_eq!(f.descriptor(sup), "LFooBar;");
}

#[test]
fn test_object_constructor_is_public() {
    let ts = TypeSystem::new();
    let object = ts.object_type();
    let constructor = ts.get_method(object, "<init>", &[]).expect("Object()");
    let member = ts.member(constructor);
    assert_eq!(member.kind, MemberKind::Constructor);
    assert_ne!(member.flags & mirror_typeck::ty::flags::ACC_PUBLIC, 0);
}

#[test]
fn test_package_applies_to_definitions() {
    let mut f = Fixture::new();
    f.ts.set_package(f.scope, Some("foo"));
    let bar = f.define("Bar");
    assert_eq!(f.descriptor(bar), "Lfoo/Bar;");

    f.ts.set_package(f.scope, Some("foo.bar"));
    let baz = f.define("Baz");
    assert_eq!(f.descriptor(baz), "Lfoo/bar/Baz;");
}

#[test]
fn test_method_def_without_return_type_is_pending() {
    let mut f = Fixture::new();
    let main = f.main_type();
    let def = f.ts.get_method_def_type(main, "foobar", &[], None, None);
    assert!(!f.ts.is_resolved(def.return_type));

    let void = f.ts.type_future(f.ts.void());
    let declared = f.ts.get_method_def_type(main, "barfoo", &[], Some(void), None);
    assert_eq!(f.descriptor(declared.return_type), "V");
    let member = f.ts.member(declared.member.expect("member"));
    assert_eq!(member.kind, MemberKind::StaticMethod);
}

#[test]
fn test_meta_types() {
    let mut ts = TypeSystem::new();
    let string = ts.string();
    assert!(!ts.host_type(string).is_meta());
    let meta = ts.meta_type(string);
    assert!(ts.host_type(meta).is_meta());
    assert_eq!(ts.descriptor(meta), ts.descriptor(string));

    let future = ts.type_future(string);
    let meta_future = ts.meta_future(future);
    assert_eq!(ts.resolve(meta_future), meta);
}

// ── Locals ─────────────────────────────────────────────────────────────

#[test]
fn test_same_local_shares_a_cell() {
    let mut f = Fixture::new();
    let first = f.ts.get_local_type(f.scope, "ARGV", None);
    let second = f.ts.get_local_type(f.scope, "ARGV", None);
    let int = f.ts.type_future(f.ts.fixnum(0));
    f.ts.assign(second, int, None);
    assert_eq!(f.descriptor(f.ts.cell_type(first)), "I");
    assert_eq!(first, second);
}

#[test]
fn test_multiple_locals() {
    let mut f = Fixture::new();
    let a = f.ts.get_local_type(f.scope, "a", None);
    let b = f.ts.get_local_type(f.scope, "b", None);
    assert!(!f.ts.is_resolved(f.ts.cell_type(a)));
    assert!(!f.ts.is_resolved(f.ts.cell_type(b)));

    let int = f.ts.type_future(f.ts.fixnum(0));
    f.ts.assign(a, int, None);
    assert_eq!(f.descriptor(f.ts.cell_type(a)), "I");
    assert!(!f.ts.is_resolved(f.ts.cell_type(b)));

    let string = f.ts.type_future(f.ts.string());
    f.ts.assign(b, string, None);
    assert_eq!(f.descriptor(f.ts.cell_type(a)), "I");
    assert_eq!(f.descriptor(f.ts.cell_type(b)), "Ljava/lang/String;");
}

#[test]
fn test_multiple_scopes() {
    let mut f = Fixture::new();
    let other = f.ts.new_scope(None);
    let a = f.ts.get_local_type(f.scope, "a", None);
    let a_elsewhere = f.ts.get_local_type(other, "a", None);
    assert_ne!(a, a_elsewhere);

    let int = f.ts.type_future(f.ts.fixnum(0));
    f.ts.assign(a, int, None);
    assert!(!f.ts.is_resolved(f.ts.cell_type(a_elsewhere)));
    let string = f.ts.type_future(f.ts.string());
    f.ts.assign(a_elsewhere, string, None);
    assert_eq!(f.descriptor(f.ts.cell_type(a)), "I");
    assert_eq!(f.descriptor(f.ts.cell_type(a_elsewhere)), "Ljava/lang/String;");
}

// ── Name resolution ────────────────────────────────────────────────────

#[test]
fn test_search_packages() {
    let mut f = Fixture::new();
    f.define("A");
    f.define("B");
    f.ts.set_package(f.scope, Some("foo"));
    f.define("A");
    f.ts.set_package(f.scope, Some("bar"));
    f.define("A");
    f.ts.import(f.scope, "bar.*", "*");

    f.ts.set_package(f.scope, None);
    let a = f.get("A");
    assert_eq!(f.descriptor(a), "LA;");

    f.ts.set_package(f.scope, Some("foo"));
    let a = f.get("A");
    assert_eq!(f.descriptor(a), "Lfoo/A;");

    f.ts.set_package(f.scope, Some("baz"));
    let a = f.get("A");
    assert_eq!(f.descriptor(a), "Lbar/A;");

    // classes in the unnamed package stay visible from named ones
    let b = f.get("B");
    assert_eq!(f.descriptor(b), "LB;");
}

#[test]
fn test_import_alias() {
    let mut f = Fixture::new();
    f.ts.import(f.scope, "java.util.Map", "JavaMap");
    let map = f.get("JavaMap");
    assert_eq!(f.descriptor(map), "Ljava/util/Map;");
}

#[test]
fn test_unknown_type_fails() {
    let mut f = Fixture::new();
    let missing = f.get("DoesNotExist");
    assert!(matches!(
        f.ts.state(missing).error(),
        Some(mirror_typeck::TypeError::UnresolvedType { name, .. }) if name == "DoesNotExist"
    ));
}

// ── Arrays ─────────────────────────────────────────────────────────────

#[test]
fn test_primitive_array() {
    let mut f = Fixture::new();
    let type_ref = f.b.array_typeref("int");
    let array = f.ts.get(f.scope, &type_ref);
    assert_eq!(f.descriptor(array), "[I");

    let array_ty = f.ts.resolve(array);
    let host = f.ts.host_type(array_ty).clone();
    assert!(host.is_array());
    let sup = host.superclass.expect("arrays extend Object");
    assert_eq!(f.descriptor(sup), "Ljava/lang/Object;");
    let component = host.component_type().expect("component");
    assert_eq!(f.ts.descriptor(component), "I");

    for name in ["java.lang.Cloneable", "java.io.Serializable"] {
        let iface = f.ts.lookup_type(name).expect("interface");
        assert!(f.ts.assignable(iface, array_ty), "{} should accept int[]", name);
    }

    let short = f.get("short");
    let shorts = f.ts.array_future(short);
    assert_eq!(f.descriptor(shorts), "[S");
}
