//! Lowering of syntax trees into declarations.
//!
//! Top-level functions, types, variables and constants become [`Decl`]s.
//! Methods are attached to their receiver type as children; a method whose
//! receiver type is not declared in the same file produces a
//! [`DeclKind::MethodsStub`] which the package merge later folds into the
//! real type.

use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::decl::{Decl, DeclKind, Origin, ValueMode};
use crate::syntax::{DeclKeyword, Expr, Field, FuncDecl, GenDecl, Item, SourceFile, Spec, TypeExpr};

/// Top-level declarations of one file, in source order.
pub type DeclMap = IndexMap<SmolStr, Arc<Decl>>;

/// Lower every top-level item of `file`.
pub fn lower_file(file: &SourceFile, origin: &Origin) -> DeclMap {
    let mut decls: IndexMap<SmolStr, Decl> = IndexMap::new();
    lower_items(&file.items, origin, &mut decls);
    decls
        .into_iter()
        .map(|(name, decl)| (name, Arc::new(decl)))
        .collect()
}

/// Lower `items` into an existing map, attaching methods to types already
/// present.
pub fn lower_items(items: &[Item], origin: &Origin, decls: &mut IndexMap<SmolStr, Decl>) {
    for item in items {
        match item {
            Item::Func(func) => lower_func(func, origin, decls),
            Item::Gen(gen_decl) => lower_gen_decl(gen_decl, origin, &mut |decl| {
                insert_top_level(decls, decl)
            }),
        }
    }
}

fn insert_top_level(decls: &mut IndexMap<SmolStr, Decl>, decl: Decl) {
    match decls.get_mut(&decl.name) {
        Some(existing) if existing.kind == DeclKind::MethodsStub => {
            let methods = std::mem::take(&mut existing.children);
            *existing = decl;
            for (name, method) in methods {
                existing.children.entry(name).or_insert(method);
            }
        }
        Some(existing) => *existing = decl,
        None => {
            decls.insert(decl.name.clone(), decl);
        }
    }
}

fn lower_func(func: &FuncDecl, origin: &Origin, decls: &mut IndexMap<SmolStr, Decl>) {
    if func.name == "_" {
        return;
    }
    let decl = Decl::new(func.name.clone(), DeclKind::Func, origin.clone())
        .with_type(Expr::FuncType(func.ty.clone()));

    let Some(recv) = &func.recv else {
        insert_top_level(decls, decl);
        return;
    };
    let Some(type_name) = receiver_type_name(&recv.ty) else {
        return;
    };
    let owner = decls.entry(type_name.clone()).or_insert_with(|| {
        Decl::new(type_name.clone(), DeclKind::MethodsStub, origin.clone())
    });
    owner.add_child(Arc::new(decl));
}

/// Name of the type a method is declared on: `T`, `*T`, `(*T)`.
pub fn receiver_type_name(ty: &TypeExpr) -> Option<SmolStr> {
    match ty.unparen() {
        Expr::Ident(name) => Some(name.clone()),
        Expr::Star(inner) => receiver_type_name(inner),
        // Receivers of generic types: `T[K]`.
        Expr::Index { base, .. } => receiver_type_name(base),
        _ => None,
    }
}

/// Lower a `const`, `var` or `type` declaration, handing each resulting
/// declaration to `emit`. `_` names are dropped.
pub fn lower_gen_decl(gen_decl: &GenDecl, origin: &Origin, emit: &mut dyn FnMut(Decl)) {
    // Implicit repetition in const groups: `B` after `A = iota` reuses
    // `A`'s type and expression list.
    let mut last_ty: Option<TypeExpr> = None;
    let mut last_values: Vec<Expr> = Vec::new();

    for spec in &gen_decl.specs {
        match spec {
            Spec::Type(spec) => {
                if spec.name == "_" {
                    continue;
                }
                let mut decl = Decl::new(spec.name.clone(), DeclKind::Type, origin.clone())
                    .with_type(spec.ty.clone());
                decl.alias = spec.alias;
                if !spec.alias {
                    add_members(&mut decl, &spec.ty, origin);
                }
                emit(decl);
            }
            Spec::Value(spec) => {
                let kind = match gen_decl.keyword {
                    DeclKeyword::Const => DeclKind::Const,
                    _ => DeclKind::Var,
                };
                let (ty, values) = if kind == DeclKind::Const
                    && spec.ty.is_none()
                    && spec.values.is_empty()
                {
                    (last_ty.clone(), last_values.clone())
                } else {
                    (spec.ty.clone(), spec.values.clone())
                };
                for decl in value_decls(&spec.names, ty.as_ref(), &values, kind, origin) {
                    emit(decl);
                }
                if kind == DeclKind::Const {
                    last_ty = ty;
                    last_values = values;
                }
            }
            Spec::Import(_) => {}
        }
    }
}

/// Declarations for `names [ty] = values`, pairing each name with its
/// initializer or with its position in a multi-value expression.
pub fn value_decls(
    names: &[SmolStr],
    ty: Option<&TypeExpr>,
    values: &[Expr],
    kind: DeclKind,
    origin: &Origin,
) -> Vec<Decl> {
    let mut out = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        if name == "_" {
            continue;
        }
        let mut decl = Decl::new(name.clone(), kind, origin.clone());
        if let Some(ty) = ty {
            decl.ty = Some(ty.clone());
        } else if values.len() == names.len() {
            decl = decl.with_value(values[i].clone(), 0, ValueMode::Direct);
        } else if let [value] = values {
            decl = decl.with_value(value.clone(), i, ValueMode::Direct);
        }
        out.push(decl);
    }
    out
}

/// Fields and methods of a struct or interface type expression.
pub fn add_members(decl: &mut Decl, ty: &TypeExpr, origin: &Origin) {
    match ty.unparen() {
        Expr::StructType(fields) => {
            for field in fields {
                add_struct_field(decl, field, origin);
            }
        }
        Expr::InterfaceType(elems) => {
            for elem in elems {
                if elem.names.is_empty() {
                    decl.embedded.push(elem.ty.clone());
                    continue;
                }
                for name in &elem.names {
                    let method = Decl::new(name.clone(), DeclKind::Func, origin.clone())
                        .with_type(elem.ty.clone());
                    decl.add_child(Arc::new(method));
                }
            }
        }
        _ => {}
    }
}

fn add_struct_field(decl: &mut Decl, field: &Field, origin: &Origin) {
    if field.names.is_empty() {
        decl.embedded.push(field.ty.clone());
        if let Some(name) = embedded_field_name(&field.ty) {
            let member = Decl::new(name, DeclKind::Var, origin.clone()).with_type(field.ty.clone());
            decl.add_child(Arc::new(member));
        }
        return;
    }
    for name in &field.names {
        if name == "_" {
            continue;
        }
        let member = Decl::new(name.clone(), DeclKind::Var, origin.clone())
            .with_type(field.ty.clone());
        decl.add_child(Arc::new(member));
    }
}

/// The implicit field name of an embedded type: `T`, `*T`, `pkg.T`.
fn embedded_field_name(ty: &TypeExpr) -> Option<SmolStr> {
    match ty.unparen() {
        Expr::Ident(name) => Some(name.clone()),
        Expr::Selector { name, .. } => Some(name.clone()),
        Expr::Star(inner) => embedded_field_name(inner),
        _ => None,
    }
}

/// An unnamed type declaration standing for a struct or interface literal.
pub fn anonymous_type(ty: &TypeExpr, origin: &Origin) -> Option<Decl> {
    if !matches!(ty.unparen(), Expr::StructType(_) | Expr::InterfaceType(_)) {
        return None;
    }
    let mut decl = Decl::new("$anon", DeclKind::Type, origin.clone()).with_type(ty.clone());
    add_members(&mut decl, ty, origin);
    Some(decl)
}
