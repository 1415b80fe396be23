//! Class file layout.
//!
//! ```text
//! magic  minor major  constant_pool  access this super
//! interfaces  fields  methods  attributes
//! ```
//!
//! Version 49.0 (Java 5) is the newest that does not require
//! `StackMapTable` frames, so no verification metadata is emitted.

use crate::error::CodegenError;

use super::code::CodeAttribute;
use super::pool::ConstantPool;

const MAGIC: u32 = 0xCAFE_BABE;
const MINOR_VERSION: u16 = 0;
pub(crate) const MAJOR_VERSION: u16 = 49;

pub(crate) const ACC_PUBLIC: u16 = 0x0001;
pub(crate) const ACC_STATIC: u16 = 0x0008;
pub(crate) const ACC_FINAL: u16 = 0x0010;
const ACC_SUPER: u16 = 0x0020;

#[derive(Debug)]
struct FieldInfo {
    access: u16,
    name: u16,
    descriptor: u16,
}

#[derive(Debug)]
struct MethodInfo {
    access: u16,
    name: u16,
    descriptor: u16,
    code: CodeAttribute,
}

#[derive(Debug)]
pub(crate) struct ClassWriter {
    pub(crate) pool: ConstantPool,
    /// Internal name: `pkg/Main`.
    pub(crate) name: String,
    this_class: u16,
    super_class: u16,
    fields: Vec<FieldInfo>,
    methods: Vec<MethodInfo>,
}

impl ClassWriter {
    pub(crate) fn new(name: &str) -> Self {
        let mut pool = ConstantPool::new();
        let this_class = pool.class(name);
        let super_class = pool.class("java/lang/Object");
        ClassWriter {
            pool,
            name: name.to_string(),
            this_class,
            super_class,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub(crate) fn add_field(&mut self, access: u16, name: &str, descriptor: &str) {
        let name = self.pool.utf8(name);
        let descriptor = self.pool.utf8(descriptor);
        self.fields.push(FieldInfo {
            access,
            name,
            descriptor,
        });
    }

    pub(crate) fn add_method(&mut self, access: u16, name: &str, descriptor: &str, code: CodeAttribute) {
        let name = self.pool.utf8(name);
        let descriptor = self.pool.utf8(descriptor);
        self.methods.push(MethodInfo {
            access,
            name,
            descriptor,
            code,
        });
    }

    pub(crate) fn to_bytes(mut self) -> Result<Vec<u8>, CodegenError> {
        let code_name = self.pool.utf8("Code");
        let class = self.name.clone();
        let too_large = |reason| CodegenError::ClassTooLarge { class: class.clone(), reason };
        self.pool.check().map_err(too_large)?;
        let field_count = u16::try_from(self.fields.len()).map_err(|_| too_large("more than 65535 fields"))?;
        let method_count = u16::try_from(self.methods.len()).map_err(|_| too_large("more than 65535 methods"))?;

        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC.to_be_bytes());
        out.extend_from_slice(&MINOR_VERSION.to_be_bytes());
        out.extend_from_slice(&MAJOR_VERSION.to_be_bytes());
        out.extend_from_slice(&self.pool.count().to_be_bytes());
        self.pool.write(&mut out);

        write_u16(&mut out, ACC_PUBLIC | ACC_FINAL | ACC_SUPER);
        write_u16(&mut out, self.this_class);
        write_u16(&mut out, self.super_class);
        write_u16(&mut out, 0); // interfaces

        write_u16(&mut out, field_count);
        for field in &self.fields {
            write_u16(&mut out, field.access);
            write_u16(&mut out, field.name);
            write_u16(&mut out, field.descriptor);
            write_u16(&mut out, 0);
        }

        write_u16(&mut out, method_count);
        for method in &self.methods {
            write_u16(&mut out, method.access);
            write_u16(&mut out, method.name);
            write_u16(&mut out, method.descriptor);
            write_u16(&mut out, 1);

            let code = &method.code;
            // max_stack, max_locals, code_length, code, exception table
            // length, attribute count
            let length = 2 + 2 + 4 + code.code.len() + 2 + 2;
            write_u16(&mut out, code_name);
            out.extend_from_slice(&(length as u32).to_be_bytes());
            write_u16(&mut out, code.max_stack);
            write_u16(&mut out, code.max_locals);
            out.extend_from_slice(&(code.code.len() as u32).to_be_bytes());
            out.extend_from_slice(&code.code);
            write_u16(&mut out, 0);
            write_u16(&mut out, 0);
        }

        write_u16(&mut out, 0); // attributes
        Ok(out)
    }
}

fn write_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}
