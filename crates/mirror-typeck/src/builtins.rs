//! Built-in library classes and primitive operators.
//!
//! The host library is described by a JSON catalog embedded in the crate
//! (`library.json`); [`TypeSystem::load_catalog`] accepts further catalogs
//! for imported libraries. Primitive arithmetic and comparison operators are
//! registered as intrinsic members so that they resolve through the same
//! overload rules as ordinary methods.

use std::fmt;

use serde::Deserialize;

use crate::descriptor::{DescriptorError, FieldDescriptor, MethodDescriptor};
use crate::registry::TypeSystem;
use crate::ty::{flags, Member, MemberKind, Primitive, TypeId, TypeKind};

pub(crate) const LIBRARY: &str = include_str!("library.json");

#[derive(Debug, Deserialize)]
struct Catalog {
    classes: Vec<CatalogClass>,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum ClassKind {
    #[default]
    Class,
    Interface,
}

#[derive(Debug, Deserialize)]
struct CatalogClass {
    name: String,
    #[serde(default)]
    kind: ClassKind,
    #[serde(default)]
    superclass: Option<String>,
    #[serde(default)]
    interfaces: Vec<String>,
    #[serde(default)]
    methods: Vec<CatalogMember>,
    #[serde(default)]
    fields: Vec<CatalogMember>,
    #[serde(default, rename = "abstract")]
    is_abstract: bool,
    #[serde(default, rename = "final")]
    is_final: bool,
}

#[derive(Debug, Deserialize)]
struct CatalogMember {
    name: String,
    descriptor: String,
    #[serde(default, rename = "static")]
    is_static: bool,
}

#[derive(Debug)]
pub enum CatalogError {
    Json(serde_json::Error),
    Descriptor(DescriptorError),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Json(e) => write!(f, "malformed library catalog: {}", e),
            CatalogError::Descriptor(e) => write!(f, "malformed library catalog: {}", e),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        CatalogError::Json(e)
    }
}

impl From<DescriptorError> for CatalogError {
    fn from(e: DescriptorError) -> Self {
        CatalogError::Descriptor(e)
    }
}

enum Signature {
    Method(MethodDescriptor),
    Field(FieldDescriptor),
}

impl TypeSystem {
    /// Add the classes of a JSON library catalog. Returns how many classes
    /// it described.
    ///
    /// Every descriptor is validated before anything is registered, so a
    /// malformed catalog leaves the registry untouched. Classes may refer to
    /// each other in any order.
    pub fn load_catalog(&mut self, json: &str) -> Result<usize, CatalogError> {
        let catalog: Catalog = serde_json::from_str(json)?;

        let mut signatures = Vec::with_capacity(catalog.classes.len());
        for class in &catalog.classes {
            let mut members = Vec::new();
            for method in &class.methods {
                members.push(Signature::Method(MethodDescriptor::parse(&method.descriptor)?));
            }
            for field in &class.fields {
                members.push(Signature::Field(FieldDescriptor::parse(&field.descriptor)?));
            }
            signatures.push(members);
        }

        // First pass: make every name known so supertypes resolve.
        let ids: Vec<TypeId> = catalog
            .classes
            .iter()
            .map(|class| {
                let id = self.ensure_class(&class.name);
                let host = self.host_type_mut(id);
                let mut access = flags::ACC_PUBLIC;
                if class.kind == ClassKind::Interface {
                    host.kind = TypeKind::Interface;
                    host.superclass = None;
                    access |= flags::ACC_INTERFACE | flags::ACC_ABSTRACT;
                }
                if class.is_abstract {
                    access |= flags::ACC_ABSTRACT;
                }
                if class.is_final {
                    access |= flags::ACC_FINAL;
                }
                host.flags = access;
                id
            })
            .collect();

        for ((class, id), signatures) in catalog.classes.iter().zip(ids).zip(signatures) {
            if class.kind == ClassKind::Class {
                if let Some(sup) = &class.superclass {
                    let sup = self.ensure_class(sup);
                    let future = self.type_future(sup);
                    self.host_type_mut(id).superclass = Some(future);
                }
            }
            let interfaces = class
                .interfaces
                .iter()
                .map(|name| {
                    let iface = self.ensure_class(name);
                    self.type_future(iface)
                })
                .collect();
            self.host_type_mut(id).interfaces = interfaces;

            let declared = class.methods.iter().chain(class.fields.iter());
            for (entry, signature) in declared.zip(signatures) {
                let mut access = flags::ACC_PUBLIC;
                if entry.is_static {
                    access |= flags::ACC_STATIC;
                }
                let (kind, params, ret) = match signature {
                    Signature::Method(method) => {
                        let kind = if entry.name == "<init>" {
                            MemberKind::Constructor
                        } else if entry.is_static {
                            MemberKind::StaticMethod
                        } else {
                            MemberKind::Method
                        };
                        let params = method
                            .params
                            .iter()
                            .map(|p| {
                                let ty = self.type_for_field(p);
                                self.type_future(ty)
                            })
                            .collect();
                        let ret = self.type_for_field(&method.ret);
                        (kind, params, ret)
                    }
                    Signature::Field(field) => {
                        let kind = if entry.is_static {
                            MemberKind::StaticFieldAccess
                        } else {
                            MemberKind::FieldAccess
                        };
                        (kind, Vec::new(), self.type_for_field(&field))
                    }
                };
                let return_type = self.type_future(ret);
                self.add_member(Member {
                    name: entry.name.clone(),
                    owner: id,
                    kind,
                    params,
                    return_type,
                    flags: access,
                    span: None,
                    cell: None,
                });
            }
        }
        Ok(catalog.classes.len())
    }

    /// Register `+ - * / %` and comparisons on the numeric primitives,
    /// equality on `boolean`, and string concatenation.
    pub(crate) fn register_operators(&mut self) {
        const ARITHMETIC: [&str; 5] = ["+", "-", "*", "/", "%"];
        const COMPARISON: [&str; 6] = ["<", ">", "<=", ">=", "==", "!="];
        let operands = [Primitive::Int, Primitive::Long, Primitive::Float, Primitive::Double];
        let boolean = self.boolean();

        for receiver in Primitive::ALL.into_iter().filter(|p| p.is_numeric()) {
            let receiver_ty = self.primitive(receiver);
            let promoted = receiver.promoted();
            for operand in operands {
                let operand_ty = self.primitive(operand);
                let result = if promoted.widens_to(operand) { operand } else { promoted };
                let result_ty = self.primitive(result);
                for op in ARITHMETIC {
                    self.intrinsic(receiver_ty, op, operand_ty, result_ty);
                }
                for op in COMPARISON {
                    self.intrinsic(receiver_ty, op, operand_ty, boolean);
                }
            }
        }

        for op in ["==", "!="] {
            self.intrinsic(boolean, op, boolean, boolean);
        }

        let string = self.string();
        let object = self.object_type();
        self.intrinsic(string, "+", object, string);
        for p in Primitive::ALL.into_iter().filter(|&p| p != Primitive::Void) {
            let operand = self.primitive(p);
            self.intrinsic(string, "+", operand, string);
        }
    }

    fn intrinsic(&mut self, owner: TypeId, name: &str, operand: TypeId, result: TypeId) {
        let params = vec![self.type_future(operand)];
        let return_type = self.type_future(result);
        self.add_member(Member {
            name: name.to_string(),
            owner,
            kind: MemberKind::Intrinsic,
            params,
            return_type,
            flags: flags::ACC_PUBLIC,
            span: None,
            cell: None,
        });
    }
}
