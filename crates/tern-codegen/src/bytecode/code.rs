//! JVM instruction assembly for one method body.
//!
//! Instructions are appended as raw bytes with big-endian operands. Branch
//! targets are [`Label`]s, patched to 16-bit relative offsets when the body
//! is finished. The assembler tracks operand stack depth (in slots, so a
//! `double` counts twice) to fill in `max_stack`.

use crate::error::CodegenError;

// ─────────────────────────────────────────────────────────────────────────────
// Opcodes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Op {
    // ── Constants ───────────────────────────────────────────────────────────
    IconstM1 = 0x02,
    Iconst0 = 0x03,
    Iconst1 = 0x04,
    Dconst0 = 0x0e,
    Dconst1 = 0x0f,
    Bipush = 0x10,
    Sipush = 0x11,
    Ldc = 0x12,
    LdcW = 0x13,
    Ldc2W = 0x14,

    // ── Locals ──────────────────────────────────────────────────────────────
    Iload = 0x15,
    Dload = 0x18,
    Istore = 0x36,
    Dstore = 0x39,

    // ── Stack ───────────────────────────────────────────────────────────────
    Pop = 0x57,
    Pop2 = 0x58,

    // ── Arithmetic ──────────────────────────────────────────────────────────
    Iadd = 0x60,
    Dadd = 0x63,
    Isub = 0x64,
    Dsub = 0x67,
    Imul = 0x68,
    Dmul = 0x6b,
    Idiv = 0x6c,
    Ddiv = 0x6f,
    Irem = 0x70,
    Drem = 0x73,
    Ineg = 0x74,
    Dneg = 0x77,
    Ixor = 0x82,

    // ── Comparison and branches ─────────────────────────────────────────────
    Dcmpl = 0x97,
    Dcmpg = 0x98,
    Ifeq = 0x99,
    Ifne = 0x9a,
    Iflt = 0x9b,
    Ifge = 0x9c,
    Ifgt = 0x9d,
    Ifle = 0x9e,
    IfIcmpeq = 0x9f,
    IfIcmpne = 0xa0,
    IfIcmplt = 0xa1,
    IfIcmpge = 0xa2,
    IfIcmpgt = 0xa3,
    IfIcmple = 0xa4,
    Goto = 0xa7,

    // ── Returns ─────────────────────────────────────────────────────────────
    Ireturn = 0xac,
    Dreturn = 0xaf,
    Return = 0xb1,

    // ── Fields and calls ────────────────────────────────────────────────────
    Getstatic = 0xb2,
    Putstatic = 0xb3,
    Invokevirtual = 0xb6,
    Invokestatic = 0xb8,
}

/// A value category on the operand stack: how many slots it takes and which
/// load, store and return instructions move it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    /// `int` and `boolean`.
    Int,
    Double,
    /// No value.
    Void,
}

impl Kind {
    pub(crate) fn slots(self) -> u16 {
        match self {
            Kind::Int => 1,
            Kind::Double => 2,
            Kind::Void => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Label(usize);

/// A finished method body.
#[derive(Debug)]
pub(crate) struct CodeAttribute {
    pub(crate) max_stack: u16,
    pub(crate) max_locals: u16,
    pub(crate) code: Vec<u8>,
}

#[derive(Debug)]
pub(crate) struct Assembler {
    code: Vec<u8>,
    depth: i32,
    max_depth: i32,
    locals: u16,
    max_locals: u16,
    labels: Vec<Option<usize>>,
    /// (opcode offset, operand offset, target)
    fixups: Vec<(usize, usize, Label)>,
}

impl Assembler {
    /// A body whose first `params` local slots hold the arguments.
    pub(crate) fn new(params: u16) -> Self {
        Assembler {
            code: Vec::new(),
            depth: 0,
            max_depth: 0,
            locals: params,
            max_locals: params,
            labels: Vec::new(),
            fixups: Vec::new(),
        }
    }

    fn adjust(&mut self, delta: i32) {
        self.depth += delta;
        self.max_depth = self.max_depth.max(self.depth);
    }

    pub(crate) fn depth(&self) -> i32 {
        self.depth
    }

    /// Reset the tracked depth where control flow merges after a jump.
    pub(crate) fn set_depth(&mut self, depth: i32) {
        self.depth = depth;
    }

    fn op(&mut self, op: Op, delta: i32) {
        self.code.push(op as u8);
        self.adjust(delta);
    }

    fn op_u8(&mut self, op: Op, operand: u8, delta: i32) {
        self.code.push(op as u8);
        self.code.push(operand);
        self.adjust(delta);
    }

    fn op_u16(&mut self, op: Op, operand: u16, delta: i32) {
        self.code.push(op as u8);
        self.code.extend_from_slice(&operand.to_be_bytes());
        self.adjust(delta);
    }

    // ── Locals ─────────────────────────────────────────────────────────────

    /// Reserve a local slot for a value of `kind`.
    pub(crate) fn alloc_local(&mut self, kind: Kind) -> u16 {
        let slot = self.locals;
        self.locals += kind.slots();
        self.max_locals = self.max_locals.max(self.locals);
        slot
    }

    /// Slots above `mark` are free again once a block ends.
    pub(crate) fn locals_mark(&self) -> u16 {
        self.locals
    }

    pub(crate) fn release_locals(&mut self, mark: u16) {
        self.locals = mark;
    }

    pub(crate) fn load(&mut self, kind: Kind, slot: u16) -> Result<(), CodegenError> {
        let slot = narrow_slot(slot)?;
        match kind {
            Kind::Int => self.op_u8(Op::Iload, slot, 1),
            Kind::Double => self.op_u8(Op::Dload, slot, 2),
            Kind::Void => {}
        }
        Ok(())
    }

    pub(crate) fn store(&mut self, kind: Kind, slot: u16) -> Result<(), CodegenError> {
        let slot = narrow_slot(slot)?;
        match kind {
            Kind::Int => self.op_u8(Op::Istore, slot, -1),
            Kind::Double => self.op_u8(Op::Dstore, slot, -2),
            Kind::Void => {}
        }
        Ok(())
    }

    // ── Constants ──────────────────────────────────────────────────────────

    /// Push an `int` using the shortest encoding. `pool_index` is only
    /// called for values outside the 16-bit immediate range.
    pub(crate) fn int(&mut self, value: i32, pool_index: impl FnOnce() -> u16) {
        match value {
            -1 => self.op(Op::IconstM1, 1),
            0..=5 => {
                // iconst_0 through iconst_5 are consecutive opcodes.
                self.code.push((Op::Iconst0 as i32 + value) as u8);
                self.adjust(1);
            }
            -128..=127 => self.op_u8(Op::Bipush, value as i8 as u8, 1),
            -32768..=32767 => self.op_u16(Op::Sipush, value as i16 as u16, 1),
            _ => {
                let index = pool_index();
                match u8::try_from(index) {
                    Ok(index) => self.op_u8(Op::Ldc, index, 1),
                    Err(_) => self.op_u16(Op::LdcW, index, 1),
                }
            }
        }
    }

    /// Push a `double`. `pool_index` is called for anything but `0.0` and
    /// `1.0`.
    pub(crate) fn double(&mut self, value: f64, pool_index: impl FnOnce() -> u16) {
        if value.to_bits() == 0.0f64.to_bits() {
            self.op(Op::Dconst0, 2);
        } else if value == 1.0 {
            self.op(Op::Dconst1, 2);
        } else {
            let index = pool_index();
            self.op_u16(Op::Ldc2W, index, 2);
        }
    }

    // ── Arithmetic ─────────────────────────────────────────────────────────

    /// A binary arithmetic instruction; pops two values of `kind`, pushes one.
    pub(crate) fn arith(&mut self, op: Op, kind: Kind) {
        self.op(op, -(kind.slots() as i32));
    }

    pub(crate) fn negate(&mut self, kind: Kind) {
        match kind {
            Kind::Double => self.op(Op::Dneg, 0),
            _ => self.op(Op::Ineg, 0),
        }
    }

    /// Flip a 0/1 boolean.
    pub(crate) fn not(&mut self) {
        self.op(Op::Iconst1, 1);
        self.op(Op::Ixor, -1);
    }

    /// `dcmpl` or `dcmpg`: two doubles in, an int out.
    pub(crate) fn dcmp(&mut self, op: Op) {
        self.op(op, -3);
    }

    // ── Control flow ───────────────────────────────────────────────────────

    pub(crate) fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    pub(crate) fn place(&mut self, label: Label) {
        self.labels[label.0] = Some(self.code.len());
    }

    /// A conditional or unconditional branch. `delta` is the stack effect of
    /// the test: -1 for `ifeq`, -2 for `if_icmpeq`, 0 for `goto`.
    pub(crate) fn branch(&mut self, op: Op, target: Label, delta: i32) {
        let at = self.code.len();
        self.op_u16(op, 0, delta);
        self.fixups.push((at, at + 1, target));
    }

    pub(crate) fn pop(&mut self, kind: Kind) {
        match kind {
            Kind::Int => self.op(Op::Pop, -1),
            Kind::Double => self.op(Op::Pop2, -2),
            Kind::Void => {}
        }
    }

    pub(crate) fn ret(&mut self, kind: Kind) {
        match kind {
            Kind::Int => self.op(Op::Ireturn, -1),
            Kind::Double => self.op(Op::Dreturn, -2),
            Kind::Void => self.op(Op::Return, 0),
        }
    }

    // ── Fields and calls ───────────────────────────────────────────────────

    pub(crate) fn get_static(&mut self, field: u16, slots: u16) {
        self.op_u16(Op::Getstatic, field, slots as i32);
    }

    pub(crate) fn put_static(&mut self, field: u16, slots: u16) {
        self.op_u16(Op::Putstatic, field, -(slots as i32));
    }

    /// `args` and `ret` are the argument and result sizes in slots.
    pub(crate) fn invoke_static(&mut self, method: u16, args: u16, ret: u16) {
        self.op_u16(Op::Invokestatic, method, ret as i32 - args as i32);
    }

    /// Like [`invoke_static`](Self::invoke_static), plus the receiver.
    pub(crate) fn invoke_virtual(&mut self, method: u16, args: u16, ret: u16) {
        self.op_u16(Op::Invokevirtual, method, ret as i32 - args as i32 - 1);
    }

    /// Patch branch offsets and produce the `Code` attribute contents.
    pub(crate) fn finish(mut self, method: &str) -> Result<CodeAttribute, CodegenError> {
        let too_large = || CodegenError::CodeTooLarge {
            method: method.to_string(),
        };
        if self.code.len() > u16::MAX as usize {
            return Err(too_large());
        }
        for (at, operand, label) in std::mem::take(&mut self.fixups) {
            let target = self.labels[label.0].ok_or_else(too_large)?;
            let offset = i16::try_from(target as i64 - at as i64).map_err(|_| too_large())?;
            self.code[operand..operand + 2].copy_from_slice(&offset.to_be_bytes());
        }
        Ok(CodeAttribute {
            max_stack: u16::try_from(self.max_depth).map_err(|_| too_large())?,
            max_locals: self.max_locals,
            code: self.code,
        })
    }
}

/// Locals are addressed with one-byte operands; `wide` is not emitted.
fn narrow_slot(slot: u16) -> Result<u8, CodegenError> {
    u8::try_from(slot).map_err(|_| CodegenError::Unsupported {
        backend: "class",
        what: "methods with more than 255 local slots".to_string(),
        span: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_pool() -> u16 {
        panic!("no constant pool entry expected")
    }

    #[test]
    fn int_encodings() {
        let mut asm = Assembler::new(0);
        asm.int(-1, no_pool);
        asm.int(3, no_pool);
        asm.int(100, no_pool);
        asm.int(-200, no_pool);
        asm.int(1 << 20, || 9);
        let code = asm.finish("f").unwrap();
        assert_eq!(
            code.code,
            vec![0x02, 0x06, 0x10, 100, 0x11, 0xff, 0x38, 0x12, 9]
        );
        assert_eq!(code.max_stack, 5);
    }

    #[test]
    fn branches_are_patched_relative() {
        let mut asm = Assembler::new(1);
        let end = asm.new_label();
        asm.load(Kind::Int, 0).unwrap();
        asm.branch(Op::Ifeq, end, -1);
        asm.int(1, no_pool);
        asm.pop(Kind::Int);
        asm.place(end);
        asm.ret(Kind::Void);
        let code = asm.finish("f").unwrap();
        // iload 0; ifeq +5; iconst_1; pop; return
        assert_eq!(code.code, vec![0x15, 0, 0x99, 0, 5, 0x04, 0x57, 0xb1]);
        assert_eq!(code.max_locals, 1);
    }

    #[test]
    fn doubles_take_two_slots() {
        let mut asm = Assembler::new(0);
        let slot = asm.alloc_local(Kind::Double);
        let next = asm.alloc_local(Kind::Int);
        assert_eq!((slot, next), (0, 2));
        asm.double(2.5, || 4);
        asm.double(0.0, no_pool);
        asm.arith(Op::Dadd, Kind::Double);
        let code = asm.finish("f").unwrap();
        assert_eq!(code.max_stack, 4);
        assert_eq!(code.max_locals, 3);
    }
}
