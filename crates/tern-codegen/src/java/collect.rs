//! Pass 1: merge records with their extensions.
//!
//! A record and every extension of it become one Java class, so the
//! declarations are gathered into descriptors before anything is emitted.
//! An extension later in the module attaches to a record declared earlier.
//! Sum variants are records implementing their parent. Extensions of
//! primitives collect into one static holder class per primitive.

use indexmap::IndexMap;
use log::trace;
use tern_typeck::tast::{self, Field, Function, Item};
use tern_typeck::ty::{Primitive, Type, TypeParameter};

/// Everything that becomes one record class.
#[derive(Debug)]
pub(crate) struct RecordDescriptor<'p> {
    pub name: String,
    pub type_params: Vec<TypeParameter>,
    pub fields: &'p [Field],
    pub methods: Vec<&'p Function>,
    pub implements: Vec<Type>,
}

/// Methods and interfaces added to a primitive.
#[derive(Debug)]
pub(crate) struct PrimitiveExtension<'p> {
    pub primitive: Primitive,
    pub methods: Vec<&'p Function>,
    pub implements: Vec<Type>,
}

#[derive(Debug, Default)]
pub(crate) struct Collected<'p> {
    pub records: IndexMap<String, RecordDescriptor<'p>>,
    pub extensions: IndexMap<&'static str, PrimitiveExtension<'p>>,
}

pub(crate) fn collect(module: &tast::Module) -> Collected<'_> {
    let mut collected = Collected::default();
    for item in &module.items {
        match item {
            Item::Record(record) => collected.add_record(record),
            Item::Sum(sum) => {
                for variant in &sum.variants {
                    collected.add_record(variant);
                }
            }
            Item::Extension(extension) => collected.add_extension(extension),
            Item::Global(_) | Item::Function(_) | Item::Interface(_) => {}
        }
    }
    collected
}

impl<'p> Collected<'p> {
    fn add_record(&mut self, record: &'p tast::Record) {
        self.records.insert(
            record.name.clone(),
            RecordDescriptor {
                name: record.name.clone(),
                type_params: record.type_params.clone(),
                fields: &record.fields,
                methods: record.methods.iter().collect(),
                implements: record.implements.clone(),
            },
        );
    }

    fn add_extension(&mut self, extension: &'p tast::Extension) {
        match &extension.target {
            Type::Primitive(prim) => {
                let holder = self
                    .extensions
                    .entry(prim.name())
                    .or_insert_with(|| PrimitiveExtension {
                        primitive: *prim,
                        methods: Vec::new(),
                        implements: Vec::new(),
                    });
                holder.methods.extend(extension.methods.iter());
                holder.implements.extend(extension.implements.iter().cloned());
            }
            target => {
                let Some(nominal) = target.as_nominal() else {
                    return;
                };
                let Some(descriptor) = self.records.get_mut(nominal.raw_name()) else {
                    return;
                };
                trace!(
                    "merging extension of {} ({} methods)",
                    target,
                    extension.methods.len()
                );
                descriptor.methods.extend(extension.methods.iter());
                descriptor
                    .implements
                    .extend(extension.implements.iter().cloned());
            }
        }
    }
}
