//! The class file constant pool.
//!
//! Entries are deduplicated: asking twice for the same constant returns the
//! same index. `Double` entries take two slots, as the format requires.
//!
//! Indices and string lengths are 16-bit. A pool that outgrows them keeps
//! handing out index 0 and reports the overflow from [`ConstantPool::check`]
//! before anything is written.

use rustc_hash::FxHashMap;

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_NAME_AND_TYPE: u8 = 12;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Entry {
    Utf8(String),
    Integer(i32),
    /// Keyed by bit pattern so that `-0.0` and `NaN` get entries of their own.
    Double(u64),
    Class(u16),
    Fieldref(u16, u16),
    Methodref(u16, u16),
    NameAndType(u16, u16),
}

#[derive(Debug)]
pub(crate) struct ConstantPool {
    entries: Vec<Entry>,
    index: FxHashMap<Entry, u16>,
    next: u16,
    overflow: Option<&'static str>,
}

impl ConstantPool {
    pub(crate) fn new() -> Self {
        ConstantPool {
            entries: Vec::new(),
            index: FxHashMap::default(),
            next: 1,
            overflow: None,
        }
    }

    fn add(&mut self, entry: Entry) -> u16 {
        if let Some(&index) = self.index.get(&entry) {
            return index;
        }
        let index = self.next;
        let slots = if matches!(entry, Entry::Double(_)) { 2 } else { 1 };
        let Some(next) = self.next.checked_add(slots) else {
            self.overflow.get_or_insert("more than 65535 constants");
            return 0;
        };
        self.next = next;
        self.index.insert(entry.clone(), index);
        self.entries.push(entry);
        index
    }

    pub(crate) fn utf8(&mut self, value: &str) -> u16 {
        if u16::try_from(modified_utf8(value).len()).is_err() {
            self.overflow.get_or_insert("a string constant longer than 65535 bytes");
            return 0;
        }
        self.add(Entry::Utf8(value.to_string()))
    }

    pub(crate) fn integer(&mut self, value: i32) -> u16 {
        self.add(Entry::Integer(value))
    }

    pub(crate) fn double(&mut self, value: f64) -> u16 {
        self.add(Entry::Double(value.to_bits()))
    }

    /// A class by internal name: `java/lang/Object`.
    pub(crate) fn class(&mut self, name: &str) -> u16 {
        let name = self.utf8(name);
        self.add(Entry::Class(name))
    }

    pub(crate) fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.add(Entry::NameAndType(name, descriptor))
    }

    pub(crate) fn field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(class);
        let nat = self.name_and_type(name, descriptor);
        self.add(Entry::Fieldref(class, nat))
    }

    pub(crate) fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(class);
        let nat = self.name_and_type(name, descriptor);
        self.add(Entry::Methodref(class, nat))
    }

    /// The `constant_pool_count` field: one more than the last index used.
    pub(crate) fn count(&self) -> u16 {
        self.next
    }

    /// Why the pool cannot be written, if it overflowed.
    pub(crate) fn check(&self) -> Result<(), &'static str> {
        match self.overflow {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        for entry in &self.entries {
            match entry {
                Entry::Utf8(value) => {
                    let bytes = modified_utf8(value);
                    // utf8() only admits strings whose length fits.
                    let len = u16::try_from(bytes.len()).unwrap_or(u16::MAX);
                    out.push(TAG_UTF8);
                    out.extend_from_slice(&len.to_be_bytes());
                    out.extend_from_slice(&bytes);
                }
                Entry::Integer(value) => {
                    out.push(TAG_INTEGER);
                    out.extend_from_slice(&value.to_be_bytes());
                }
                Entry::Double(bits) => {
                    out.push(TAG_DOUBLE);
                    out.extend_from_slice(&bits.to_be_bytes());
                }
                Entry::Class(name) => {
                    out.push(TAG_CLASS);
                    out.extend_from_slice(&name.to_be_bytes());
                }
                Entry::Fieldref(class, nat) | Entry::Methodref(class, nat) => {
                    out.push(if matches!(entry, Entry::Fieldref(..)) {
                        TAG_FIELDREF
                    } else {
                        TAG_METHODREF
                    });
                    out.extend_from_slice(&class.to_be_bytes());
                    out.extend_from_slice(&nat.to_be_bytes());
                }
                Entry::NameAndType(name, descriptor) => {
                    out.push(TAG_NAME_AND_TYPE);
                    out.extend_from_slice(&name.to_be_bytes());
                    out.extend_from_slice(&descriptor.to_be_bytes());
                }
            }
        }
    }
}

/// The JVM's "modified UTF-8": NUL takes two bytes and characters outside
/// the BMP are written as two encoded surrogates.
fn modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}
