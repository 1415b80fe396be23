//! Java source generation.
//!
//! A module becomes one `public final class` named after it. Records,
//! interfaces, sum types and the generated helper types are nested inside
//! it, globals are static fields and functions are static methods.
//!
//! Generation runs in two passes. Pass 1 ([`collect`]) merges every record
//! with its extensions. Pass 2 emits, in order: the header, the prelude, each
//! global, function, interface and sum type as it appears in the module, the
//! entry point, the primitive extension holders, the merged record classes,
//! and last the cached constraint objects.
//!
//! ## Architecture
//!
//! - [`types`]: Tern type to Java type mapping and name escaping
//! - [`collect`]: Pass 1 record descriptors
//! - [`decl`]: Declaration emission
//! - [`constraint`]: Constraint objects and dictionary passing
//! - [`expr`]: Expression lowering
//! - [`condition`]: Pattern condition desugaring

pub(crate) mod collect;
pub(crate) mod condition;
pub(crate) mod constraint;
pub(crate) mod decl;
pub(crate) mod expr;
pub mod types;
pub(crate) mod writer;

use indexmap::IndexMap;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use tern_typeck::tast::Item;
use tern_typeck::ty::Type;
use tern_typeck::CheckedProgram;

use crate::error::CodegenError;
use crate::{Artifact, Backend, EmitOptions};

use self::collect::{collect, Collected};
use self::types::{class_name, java_type, value_name, MAX_FN_ARITY};
use self::writer::Writer;

/// The complete backend: one `.java` file per module.
#[derive(Clone, Debug, Default)]
pub struct JavaBackend {
    options: EmitOptions,
}

impl JavaBackend {
    pub fn new(options: EmitOptions) -> Self {
        JavaBackend { options }
    }
}

impl Backend for JavaBackend {
    fn name(&self) -> &'static str {
        "java"
    }

    fn emit(&self, program: &CheckedProgram) -> Result<Artifact, CodegenError> {
        let gen = JavaGen::new(program, &self.options);
        let file_name = format!("{}.java", gen.class);
        let text = gen.generate()?;
        Ok(Artifact {
            file_name,
            contents: text.into_bytes(),
        })
    }
}

// ── Body state ───────────────────────────────────────────────────────

/// Naming state for the method or initializer being emitted.
///
/// Java rejects a local that shadows another local of the same method, and
/// lambdas may not redeclare the names around them, so every local gets a
/// name unique within its body. `scopes` maps Tern names to those Java names.
#[derive(Debug, Default)]
pub(crate) struct Body {
    pub(crate) scopes: Vec<FxHashMap<String, String>>,
    used: FxHashSet<String>,
    /// How the receiver is spelled: `this`, or `$this` in a static holder.
    pub(crate) receiver: &'static str,
    /// Whether `T$dict` constraint objects are in scope.
    pub(crate) has_dictionaries: bool,
}

impl Body {
    fn new(reserved: &FxHashSet<String>, receiver: &'static str, has_dictionaries: bool) -> Self {
        Body {
            scopes: vec![FxHashMap::default()],
            used: reserved.clone(),
            receiver,
            has_dictionaries,
        }
    }

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Bind a Tern local and return its Java name.
    pub(crate) fn declare(&mut self, name: &str) -> String {
        let base = value_name(name);
        let mut candidate = base.clone();
        let mut n = 1;
        while self.used.contains(&candidate) {
            candidate = format!("{}${}", base, n);
            n += 1;
        }
        self.used.insert(candidate.clone());
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), candidate.clone());
        }
        candidate
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .map(String::as_str)
    }

    /// A fresh generated name: `$t1`, `$m2`, ...
    pub(crate) fn temp(&mut self, prefix: &str) -> String {
        let mut n = 1;
        loop {
            let candidate = format!("${}{}", prefix, n);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

// ── JavaGen ──────────────────────────────────────────────────────────

/// A cached constraint object in the `Dictionaries` holder.
#[derive(Debug)]
pub(crate) struct Dictionary {
    pub(crate) field: String,
    pub(crate) declaration: String,
}

/// Pass 2 state for one module.
pub(crate) struct JavaGen<'p> {
    pub(crate) program: &'p CheckedProgram,
    /// The enclosing class, named after the module.
    pub(crate) class: String,
    package: Option<String>,
    collected: Collected<'p>,
    /// Cached constraint objects keyed by (constraint, argument) unique names.
    pub(crate) dictionaries: IndexMap<(String, String), Dictionary>,
    /// Names locals must avoid.
    reserved: FxHashSet<String>,
    pub(crate) body: Body,
}

impl<'p> JavaGen<'p> {
    pub(crate) fn new(program: &'p CheckedProgram, options: &EmitOptions) -> Self {
        let class = class_name(&program.module.name);
        let mut reserved: FxHashSet<String> = types::reserved_types()
            .iter()
            .map(|name| name.to_string())
            .collect();
        reserved.insert(class.clone());
        for item in &program.module.items {
            if let Item::Global(global) = item {
                reserved.insert(value_name(&global.name));
            }
        }
        JavaGen {
            program,
            class,
            package: options.package.clone(),
            collected: collect(&program.module),
            dictionaries: IndexMap::new(),
            reserved,
            body: Body::default(),
        }
    }

    pub(crate) fn jtype(&self, ty: &Type) -> Result<String, CodegenError> {
        java_type(ty, &self.class)
    }

    /// Start emitting a new method body or initializer.
    pub(crate) fn begin_body(&mut self, receiver: &'static str, has_dictionaries: bool) {
        self.body = Body::new(&self.reserved, receiver, has_dictionaries);
    }

    pub(crate) fn generate(mut self) -> Result<String, CodegenError> {
        let program = self.program;
        let mut out = Writer::new();
        out.line(format!(
            "// Generated by ternc from module `{}`. Do not edit.",
            program.module.name
        ));
        if let Some(package) = &self.package {
            out.line(format!("package {};", package));
        }
        out.blank();
        out.open(format!("public final class {} {{", self.class));
        out.line(format!("private {}() {{}}", self.class));

        self.emit_prelude(&mut out);

        for item in &program.module.items {
            match item {
                Item::Global(global) => self.emit_global(global, &mut out)?,
                Item::Function(function) => self.emit_function(function, &mut out)?,
                Item::Interface(interface) => {
                    self.emit_interface(interface, &mut out)?;
                    self.emit_constraint_object(interface, &mut out)?;
                }
                Item::Sum(sum) => self.emit_sum(sum, &mut out)?,
                Item::Record(_) | Item::Extension(_) => {}
            }
        }
        self.emit_entry_point(&mut out);

        let extensions = std::mem::take(&mut self.collected.extensions);
        for extension in extensions.values() {
            self.emit_extension_holder(extension, &mut out)?;
        }
        let records = std::mem::take(&mut self.collected.records);
        for record in records.values() {
            self.emit_record(record, &mut out)?;
        }
        self.emit_dictionaries(&mut out);

        out.close("}");
        debug!(
            "emitted Java class {} ({} records, {} constraint objects)",
            self.class,
            records.len(),
            self.dictionaries.len()
        );
        Ok(out.finish())
    }

    // ── Prelude ──────────────────────────────────────────────────────

    fn emit_prelude(&self, out: &mut Writer) {
        for arity in 0..=MAX_FN_ARITY {
            let params: Vec<String> = (1..=arity).map(|i| format!("A{}", i)).collect();
            let mut generics = params.clone();
            generics.push("R".to_string());
            let args: Vec<String> = params
                .iter()
                .map(|p| format!("{} {}", p, p.to_lowercase()))
                .collect();
            out.blank();
            out.line("@FunctionalInterface");
            out.open(format!("public interface Fn{}<{}> {{", arity, generics.join(", ")));
            out.line(format!("R apply({});", args.join(", ")));
            out.close("}");
        }

        out.blank();
        out.open("public interface Any$Constraint<ThisConstraint> {");
        out.open("default Object upcast$(ThisConstraint $this) {");
        out.line("return $this;");
        out.close("}");
        out.close("}");

        out.blank();
        out.line("@SuppressWarnings(\"unchecked\")");
        out.open("static <T> T $tryCast(Object value, Class<?> type) {");
        out.line("return type.isInstance(value) ? (T) value : null;");
        out.close("}");

        out.blank();
        out.line("@SafeVarargs");
        out.open("static <T> java.util.List<T> $arrayOf(T... elements) {");
        out.line("return new java.util.ArrayList<>(java.util.Arrays.asList(elements));");
        out.close("}");

        out.blank();
        out.open("static void $discard(Object value) {");
        out.close("}");
    }

    /// A Java `main` calling a zero-parameter Tern `main` and printing its
    /// result.
    fn emit_entry_point(&self, out: &mut Writer) {
        let entry = self.program.module.items.iter().find_map(|item| match item {
            Item::Function(f) if f.name == "main" && f.params.is_empty() && f.type_params.is_empty() => {
                Some(f)
            }
            _ => None,
        });
        let Some(entry) = entry else {
            return;
        };
        out.blank();
        out.open("public static void main(String[] args) {");
        if entry.ret.is_void() {
            out.line("main();");
        } else {
            out.line("System.out.println(main());");
        }
        out.close("}");
    }

    fn emit_dictionaries(&self, out: &mut Writer) {
        if self.dictionaries.is_empty() {
            return;
        }
        out.blank();
        out.open("static final class Dictionaries {");
        out.line("private Dictionaries() {}");
        out.blank();
        for dictionary in self.dictionaries.values() {
            out.line(&dictionary.declaration);
        }
        out.close("}");
    }
}
