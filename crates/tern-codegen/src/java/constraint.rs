//! Constraint objects: dictionary passing for bounded generics.
//!
//! Java generics cannot call a method through a type parameter's bound, and
//! primitives cannot implement Tern interfaces at all. Each interface `I<A>`
//! therefore gets a companion
//!
//! ```java
//! public interface I$Constraint<ThisConstraint, A> extends Any$Constraint<ThisConstraint> {
//!     default I<A> upcast$(ThisConstraint $this) { return (I<A>) $this; }
//!     default R m(ThisConstraint $this, P p) { return upcast$($this).m(p); }
//! }
//! ```
//!
//! and every type parameter `T: I<A>` of a generic function or record takes
//! an `I$Constraint<T, A> T$dict` alongside its values. Call sites pass the
//! in-scope `U$dict` for a type parameter argument, or an instance for a
//! concrete one. Instances for closed types are cached as static fields of
//! the `Dictionaries` holder; for a primitive the instance overrides
//! `upcast$` to wrap the value through its extension holder.

use log::trace;
use rustc_hash::FxHashMap;
use tern_common::Span;
use tern_typeck::tast::{self, Instantiation};
use tern_typeck::ty::{Type, TypeParameter};

use crate::error::CodegenError;

use super::types::{mangle, type_name, type_params_decl, value_name};
use super::writer::Writer;
use super::{Dictionary, JavaGen};

/// The holder class of a primitive's extension methods.
pub(crate) fn extension_holder(prim: tern_typeck::ty::Primitive) -> String {
    format!("{}$Extension", prim.name())
}

/// The holder method wrapping a primitive as `iface`.
pub(crate) fn adapter_name(iface: &Type) -> String {
    format!("as${}", mangle(&iface.name()))
}

/// The constraint object interface for an interface type, without
/// arguments: `Show$Constraint`.
/// Bounds that are not interfaces get the plain `Any$Constraint`.
fn constraint_interface(iface: &Type) -> String {
    match iface {
        Type::Interface(nominal) if !iface.is_any() => format!("{}$Constraint", nominal.raw_name()),
        _ => "Any$Constraint".to_string(),
    }
}

impl JavaGen<'_> {
    /// `I$Constraint<This, A...>`: the type of a constraint object for
    /// values of type `this` under the bound `iface`.
    pub(crate) fn constraint_type(&self, iface: &Type, this: &str) -> Result<String, CodegenError> {
        let mut args = vec![this.to_string()];
        if let Type::Interface(nominal) = iface {
            for arg in nominal.args() {
                args.push(self.jtype(arg)?);
            }
        }
        Ok(format!("{}<{}>", constraint_interface(iface), args.join(", ")))
    }

    /// The leading `I$Constraint<T, ...> T$dict` parameters of a generic
    /// function or record constructor.
    pub(crate) fn dictionary_params(&self, params: &[TypeParameter]) -> Result<Vec<String>, CodegenError> {
        params
            .iter()
            .map(|param| {
                let bound = param.constraint().cloned().unwrap_or_else(Type::any);
                let this = type_name(&param.name, &self.class);
                let ty = self.constraint_type(&bound, &this)?;
                Ok(format!("{} {}", ty, dictionary_name(param, &self.class)))
            })
            .collect()
    }

    /// The in-scope constraint object of a type parameter.
    pub(crate) fn param_dictionary(&self, param: &TypeParameter, span: Span) -> Result<String, CodegenError> {
        if !self.body.has_dictionaries {
            return Err(CodegenError::unsupported(
                "java",
                format!("calls through the bound of `{}` in an interface default method", param.name),
                span,
            ));
        }
        Ok(dictionary_name(param, &self.class))
    }

    /// The explicit type arguments of a generic call: `<Integer, String>`.
    pub(crate) fn type_args(&self, instantiation: &Instantiation) -> Result<String, CodegenError> {
        let args = instantiation
            .args
            .iter()
            .map(|arg| self.jtype(arg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("<{}>", args.join(", ")))
    }

    /// One constraint object per type parameter of an instantiation.
    pub(crate) fn dictionary_args(
        &mut self,
        instantiation: &Instantiation,
        span: Span,
    ) -> Result<Vec<String>, CodegenError> {
        let map: FxHashMap<String, Type> = instantiation
            .params
            .iter()
            .zip(&instantiation.args)
            .map(|(param, arg)| (param.name.clone(), arg.clone()))
            .collect();
        instantiation
            .params
            .iter()
            .zip(&instantiation.args)
            .map(|(param, arg)| {
                let needed = param
                    .constraint()
                    .map(|bound| bound.substitute(&map))
                    .unwrap_or_else(Type::any);
                self.dictionary_for(&needed, arg, span)
            })
            .collect()
    }

    /// A constraint object showing that `arg` satisfies `needed`.
    fn dictionary_for(&mut self, needed: &Type, arg: &Type, span: Span) -> Result<String, CodegenError> {
        if let Type::Param(param) = arg {
            // Every constraint object extends `Any$Constraint`, so the
            // parameter's own object also serves an `Any` bound.
            return self.param_dictionary(param, span);
        }
        let this = self.jtype(arg)?;
        let ty = self.constraint_type(needed, &this)?;
        if arg.has_params() {
            return Ok(format!("new {}() {{}}", ty));
        }

        let key = (needed.name(), arg.name());
        if let Some(dictionary) = self.dictionaries.get(&key) {
            return Ok(format!("Dictionaries.{}", dictionary.field));
        }

        let mut field = format!("{}$for${}", mangle(&key.0), mangle(&key.1));
        let mut n = 2;
        while self.dictionaries.values().any(|d| d.field == field) {
            field = format!("{}$for${}${}", mangle(&key.0), mangle(&key.1), n);
            n += 1;
        }

        let declaration = match arg {
            Type::Primitive(prim) if matches!(needed, Type::Interface(_)) && !needed.is_any() => {
                let mut w = Writer::new();
                w.open(format!("static final {} {} = new {}() {{", ty, field, ty));
                w.line("@Override");
                w.open(format!("public {} upcast$({} $this) {{", self.jtype(needed)?, this));
                w.line(format!(
                    "return {}.{}($this);",
                    extension_holder(*prim),
                    adapter_name(needed)
                ));
                w.close("}");
                w.close("};");
                w.into_text()
            }
            _ => format!("static final {} {} = new {}() {{}};", ty, field, ty),
        };
        trace!("constraint object {} for {}", key.0, key.1);
        self.dictionaries.insert(
            key,
            Dictionary {
                field: field.clone(),
                declaration,
            },
        );
        Ok(format!("Dictionaries.{}", field))
    }

    /// The constraint object interface of a declared interface.
    pub(crate) fn emit_constraint_object(
        &mut self,
        interface: &tast::Interface,
        out: &mut Writer,
    ) -> Result<(), CodegenError> {
        let iface_type = self.jtype(&interface.self_type)?;
        let mut generics = vec!["ThisConstraint".to_string()];
        generics.extend(
            interface
                .type_params
                .iter()
                .map(|param| type_name(&param.name, &self.class)),
        );

        out.blank();
        out.open(format!(
            "public interface {}<{}> extends Any$Constraint<ThisConstraint> {{",
            constraint_interface(&interface.self_type),
            generics.join(", ")
        ));
        out.line("@Override");
        out.line("@SuppressWarnings(\"unchecked\")");
        out.open(format!("default {} upcast$(ThisConstraint $this) {{", iface_type));
        out.line(format!("return ({}) $this;", iface_type));
        out.close("}");

        for method in &interface.methods {
            let mut params = vec!["ThisConstraint $this".to_string()];
            let mut args = Vec::with_capacity(method.params.len());
            for param in &method.params {
                let name = value_name(&param.name);
                params.push(format!("{} {}", self.jtype(&param.ty)?, name));
                args.push(name);
            }
            out.blank();
            out.open(format!(
                "default {} {}({}) {{",
                self.jtype(&method.ret)?,
                value_name(&method.name),
                params.join(", ")
            ));
            out.line(format!(
                "return upcast$($this).{}({});",
                value_name(&method.name),
                args.join(", ")
            ));
            out.close("}");
        }
        out.close("}");
        trace!("constraint object interface for {}", interface.name);
        Ok(())
    }
}

/// `T$dict`
fn dictionary_name(param: &TypeParameter, module: &str) -> String {
    format!("{}$dict", type_name(&param.name, module))
}

/// `<T, U>` over a list of type parameters.
pub(crate) fn generics_decl(params: &[TypeParameter], module: &str) -> String {
    let names: Vec<String> = params.iter().map(|p| p.name.clone()).collect();
    type_params_decl(&names, module)
}
