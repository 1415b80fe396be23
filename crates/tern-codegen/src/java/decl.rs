//! Declaration emission: globals, functions, interfaces, sum types,
//! records and primitive extension holders.

use log::trace;
use tern_typeck::tast::{Function, Global, Interface, Param, Sum};
use tern_typeck::ty::Type;

use crate::error::CodegenError;

use super::collect::{PrimitiveExtension, RecordDescriptor};
use super::constraint::{adapter_name, extension_holder, generics_decl};
use super::expr::Dest;
use super::types::{boxed, type_name, value_name};
use super::writer::Writer;
use super::JavaGen;

impl JavaGen<'_> {
    /// A static field, initialized in a static block of its own so that
    /// globals initialize in declaration order.
    pub(crate) fn emit_global(&mut self, global: &Global, out: &mut Writer) -> Result<(), CodegenError> {
        self.begin_body("this", false);
        let ty = self.jtype(&global.ty)?;
        let name = value_name(&global.name);
        let modifier = if global.mutable { "" } else { "final " };
        out.blank();
        out.line(format!("public static {}{} {};", modifier, ty, name));
        out.open("static {");
        // A blank final may only be assigned through its simple name.
        self.lower_nested(&global.init, &Dest::Assign(name), out)?;
        out.close("}");
        Ok(())
    }

    pub(crate) fn emit_function(&mut self, function: &Function, out: &mut Writer) -> Result<(), CodegenError> {
        let generic = !function.type_params.is_empty();
        self.begin_body("this", generic);
        let generics = generics_decl(&function.type_params, &self.class);
        let mut params = self.dictionary_params(&function.type_params)?;
        params.extend(self.declare_params(&function.params)?);

        out.blank();
        out.open(format!(
            "public static {}{}{} {}({}) {{",
            generics,
            if generic { " " } else { "" },
            self.jtype(&function.ret)?,
            value_name(&function.name),
            params.join(", ")
        ));
        self.lower_nested(&function.body, &Dest::Return, out)?;
        out.close("}");
        trace!("emitted function {}", function.name);
        Ok(())
    }

    pub(crate) fn emit_interface(&mut self, interface: &Interface, out: &mut Writer) -> Result<(), CodegenError> {
        out.blank();
        out.open(format!(
            "public interface {}{} {{",
            type_name(&interface.name, &self.class),
            generics_decl(&interface.type_params, &self.class)
        ));
        for (i, method) in interface.methods.iter().enumerate() {
            self.begin_body("this", false);
            let params = self.declare_params(&method.params)?;
            let ret = self.jtype(&method.ret)?;
            let name = value_name(&method.name);
            match &method.default_body {
                None => out.line(format!("{} {}({});", ret, name, params.join(", "))),
                Some(body) => {
                    if i > 0 {
                        out.blank();
                    }
                    out.open(format!("default {} {}({}) {{", ret, name, params.join(", ")));
                    self.lower_nested(body, &Dest::Return, out)?;
                    out.close("}");
                }
            }
        }
        out.close("}");
        Ok(())
    }

    /// A sum type is a marker interface its variants implement.
    pub(crate) fn emit_sum(&mut self, sum: &Sum, out: &mut Writer) -> Result<(), CodegenError> {
        out.blank();
        out.line(format!(
            "public interface {}{} {{}}",
            type_name(&sum.name, &self.class),
            generics_decl(&sum.type_params, &self.class)
        ));
        Ok(())
    }

    pub(crate) fn emit_record(&mut self, record: &RecordDescriptor<'_>, out: &mut Writer) -> Result<(), CodegenError> {
        let name = type_name(&record.name, &self.class);
        let generic = !record.type_params.is_empty();
        let implements = self.implements_list(&record.implements)?;

        out.blank();
        out.open(format!(
            "public static final class {}{}{} {{",
            name,
            generics_decl(&record.type_params, &self.class),
            if implements.is_empty() {
                String::new()
            } else {
                format!(" implements {}", implements.join(", "))
            }
        ));

        // Constraint objects for the type parameters, then the fields.
        let dictionaries = self.dictionary_params(&record.type_params)?;
        for dictionary in &dictionaries {
            out.line(format!("private final {};", dictionary));
        }
        let mut params = dictionaries.clone();
        let mut assigned: Vec<String> = dictionaries
            .iter()
            .filter_map(|d| d.rsplit(' ').next().map(str::to_string))
            .collect();
        for field in record.fields {
            let ty = self.jtype(&field.ty)?;
            let field_name = value_name(&field.name);
            let modifier = if field.mutable { "" } else { "final " };
            out.line(format!("public {}{} {};", modifier, ty, field_name));
            params.push(format!("{} {}", ty, field_name));
            assigned.push(field_name);
        }

        out.blank();
        out.open(format!("public {}({}) {{", name, params.join(", ")));
        for field in &assigned {
            out.line(format!("this.{0} = {0};", field));
        }
        out.close("}");

        for method in &record.methods {
            self.begin_body("this", generic);
            let params = self.declare_params(&method.params)?;
            out.blank();
            out.open(format!(
                "public {} {}({}) {{",
                self.jtype(&method.ret)?,
                value_name(&method.name),
                params.join(", ")
            ));
            self.lower_nested(&method.body, &Dest::Return, out)?;
            out.close("}");
        }
        out.close("}");
        trace!("emitted record {} ({} methods)", record.name, record.methods.len());
        Ok(())
    }

    /// Static holder for the methods added to a primitive, plus one adapter
    /// per implemented interface wrapping a value as that interface.
    pub(crate) fn emit_extension_holder(
        &mut self,
        extension: &PrimitiveExtension<'_>,
        out: &mut Writer,
    ) -> Result<(), CodegenError> {
        let holder = extension_holder(extension.primitive);
        let this_type = boxed(extension.primitive);

        out.blank();
        out.open(format!("public static final class {} {{", holder));
        out.line(format!("private {}() {{}}", holder));

        for method in &extension.methods {
            self.begin_body("$this", false);
            let mut params = vec![format!("{} $this", this_type)];
            params.extend(self.declare_params(&method.params)?);
            out.blank();
            out.open(format!(
                "public static {} {}({}) {{",
                self.jtype(&method.ret)?,
                value_name(&method.name),
                params.join(", ")
            ));
            self.lower_nested(&method.body, &Dest::Return, out)?;
            out.close("}");
        }

        let target = Type::Primitive(extension.primitive);
        let mut seen = Vec::new();
        for iface in &extension.implements {
            if iface.is_any() || seen.contains(&iface) {
                continue;
            }
            seen.push(iface);
            let iface_type = self.jtype(iface)?;
            out.blank();
            out.open(format!(
                "public static {} {}({} $this) {{",
                iface_type,
                adapter_name(iface),
                this_type
            ));
            out.open(format!("return new {}() {{", iface_type));
            let mut first = true;
            for (name, member) in self.program.types.interface_members(iface) {
                // Members the primitive does not provide are defaults, which
                // the anonymous class inherits.
                if self.program.types.own_member(&target, &name).is_none() {
                    continue;
                }
                let Some(signature) = member.ident.ty.as_function() else {
                    continue;
                };
                let mut params = Vec::with_capacity(signature.params.len());
                let mut args = vec!["$this".to_string()];
                for (i, param) in signature.params.iter().enumerate() {
                    params.push(format!("{} a{}", self.jtype(param)?, i + 1));
                    args.push(format!("a{}", i + 1));
                }
                if !first {
                    out.blank();
                }
                first = false;
                out.line("@Override");
                out.open(format!(
                    "public {} {}({}) {{",
                    self.jtype(&signature.ret)?,
                    value_name(&name),
                    params.join(", ")
                ));
                out.line(format!(
                    "return {}.{}({});",
                    holder,
                    value_name(&name),
                    args.join(", ")
                ));
                out.close("}");
            }
            out.close("};");
            out.close("}");
        }
        out.close("}");
        Ok(())
    }

    fn declare_params(&mut self, params: &[Param]) -> Result<Vec<String>, CodegenError> {
        params
            .iter()
            .map(|param| {
                let ty = self.jtype(&param.ty)?;
                Ok(format!("{} {}", ty, self.body.declare(&param.name)))
            })
            .collect()
    }

    /// The Java `implements` clause, without `Any` and duplicates.
    fn implements_list(&self, implements: &[Type]) -> Result<Vec<String>, CodegenError> {
        let mut list: Vec<String> = Vec::new();
        for iface in implements.iter().filter(|iface| !iface.is_any()) {
            let java = self.jtype(iface)?;
            if !list.contains(&java) {
                list.push(java);
            }
        }
        Ok(list)
    }
}
