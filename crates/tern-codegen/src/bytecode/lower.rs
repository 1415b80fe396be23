//! Typed AST to JVM instructions.

use log::{debug, trace};
use rustc_hash::FxHashMap;
use tern_syntax::{BinaryOp, Literal, UnaryOp};
use tern_typeck::env::Origin;
use tern_typeck::tast::{Callee, Condition, Expr, ExprKind, Function, Global, Item, Stmt};
use tern_typeck::CheckedProgram;

use crate::error::CodegenError;

use super::class::{ClassWriter, ACC_FINAL, ACC_PUBLIC, ACC_STATIC};
use super::code::{Assembler, Kind, Label, Op};
use super::{descriptor, kind_of, method_descriptor, unsupported};

/// A static method's call shape.
#[derive(Clone, Debug)]
struct Signature {
    descriptor: String,
    arg_slots: u16,
    ret: Kind,
}

/// Locals of the method being assembled.
struct Frame {
    asm: Assembler,
    scopes: Vec<FxHashMap<String, (u16, Kind)>>,
}

impl Frame {
    fn new(params: u16) -> Self {
        Frame {
            asm: Assembler::new(params),
            scopes: vec![FxHashMap::default()],
        }
    }

    fn declare(&mut self, name: &str, kind: Kind) -> u16 {
        let slot = self.asm.alloc_local(kind);
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), (slot, kind));
        }
        slot
    }

    fn lookup(&self, name: &str) -> Option<(u16, Kind)> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name).copied())
    }
}

pub(crate) struct ClassGen<'p> {
    program: &'p CheckedProgram,
    class: ClassWriter,
    functions: FxHashMap<String, Signature>,
    globals: FxHashMap<String, &'static str>,
}

impl<'p> ClassGen<'p> {
    pub(crate) fn new(program: &'p CheckedProgram, internal_name: &str) -> Self {
        ClassGen {
            program,
            class: ClassWriter::new(internal_name),
            functions: FxHashMap::default(),
            globals: FxHashMap::default(),
        }
    }

    pub(crate) fn generate(mut self) -> Result<Vec<u8>, CodegenError> {
        let program = self.program;
        let mut globals = Vec::new();
        let mut functions = Vec::new();
        for item in &program.module.items {
            match item {
                Item::Global(global) => globals.push(global),
                Item::Function(function) => functions.push(function),
                Item::Record(_) => return Err(unsupported("records", None)),
                Item::Interface(_) => return Err(unsupported("interfaces", None)),
                Item::Extension(_) => return Err(unsupported("extensions", None)),
                Item::Sum(_) => return Err(unsupported("sum types", None)),
            }
        }

        // Signatures first: bodies may call functions declared later.
        for function in &functions {
            if !function.type_params.is_empty() {
                return Err(unsupported(
                    format!("the generic function `{}`", function.name),
                    None,
                ));
            }
            let signature = function.signature();
            let mut arg_slots = 0;
            for param in &function.params {
                arg_slots += kind_of(&param.ty, None)?.slots();
            }
            self.functions.insert(
                function.name.clone(),
                Signature {
                    descriptor: method_descriptor(&signature.params, &signature.ret)?,
                    arg_slots,
                    ret: kind_of(&function.ret, None)?,
                },
            );
        }

        for global in &globals {
            let desc = descriptor(&global.ty, Some(global.init.span))?;
            if global.ty.is_void() {
                return Err(unsupported("`Void` globals", Some(global.init.span)));
            }
            let mut access = ACC_PUBLIC | ACC_STATIC;
            if !global.mutable {
                access |= ACC_FINAL;
            }
            self.class.add_field(access, &global.name, desc);
            self.globals.insert(global.name.clone(), desc);
        }
        if !globals.is_empty() {
            self.emit_initializer(&globals)?;
        }

        for function in &functions {
            self.emit_function(function)?;
        }
        self.emit_entry_point()?;

        debug!(
            "assembled class {} ({} fields, {} methods)",
            self.class.name,
            globals.len(),
            functions.len()
        );
        self.class.to_bytes()
    }

    /// `<clinit>`: every global initializer in declaration order.
    fn emit_initializer(&mut self, globals: &[&Global]) -> Result<(), CodegenError> {
        let mut frame = Frame::new(0);
        for global in globals {
            let kind = self.value(&global.init, &mut frame)?;
            let field = self.global_ref(&global.name)?;
            frame.asm.put_static(field, kind.slots());
        }
        frame.asm.ret(Kind::Void);
        let code = frame.asm.finish("<clinit>")?;
        self.class.add_method(ACC_STATIC, "<clinit>", "()V", code);
        Ok(())
    }

    fn emit_function(&mut self, function: &Function) -> Result<(), CodegenError> {
        let signature = self
            .functions
            .get(&function.name)
            .cloned()
            .ok_or_else(|| unsupported(format!("the function `{}`", function.name), None))?;
        let mut frame = Frame::new(0);
        for param in &function.params {
            frame.declare(&param.name, kind_of(&param.ty, None)?);
        }
        let kind = self.value(&function.body, &mut frame)?;
        if kind != signature.ret {
            frame.asm.pop(kind);
        }
        frame.asm.ret(signature.ret);
        let code = frame.asm.finish(&function.name)?;
        self.class
            .add_method(ACC_PUBLIC | ACC_STATIC, &function.name, &signature.descriptor, code);
        trace!("assembled {}{}", function.name, signature.descriptor);
        Ok(())
    }

    /// `public static void main(String[])` printing the result of a
    /// zero-parameter `main`.
    fn emit_entry_point(&mut self) -> Result<(), CodegenError> {
        let Some(main) = self.functions.get("main").cloned() else {
            return Ok(());
        };
        if main.arg_slots != 0 {
            return Ok(());
        }
        let mut frame = Frame::new(1);
        let print = main.ret != Kind::Void;
        if print {
            let out = self
                .class
                .pool
                .field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
            frame.asm.get_static(out, 1);
        }
        let method = self.method_ref("main", &main.descriptor);
        frame.asm.invoke_static(method, 0, main.ret.slots());
        if print {
            let result = &main.descriptor[main.descriptor.len() - 1..];
            let println = self.class.pool.method_ref(
                "java/io/PrintStream",
                "println",
                &format!("({})V", result),
            );
            frame.asm.invoke_virtual(println, main.ret.slots(), 0);
        }
        frame.asm.ret(Kind::Void);
        let code = frame.asm.finish("main")?;
        self.class
            .add_method(ACC_PUBLIC | ACC_STATIC, "main", "([Ljava/lang/String;)V", code);
        Ok(())
    }

    fn global_ref(&mut self, name: &str) -> Result<u16, CodegenError> {
        let desc = self
            .globals
            .get(name)
            .copied()
            .ok_or_else(|| unsupported(format!("the global `{}`", name), None))?;
        let class = self.class.name.clone();
        Ok(self.class.pool.field_ref(&class, name, desc))
    }

    fn method_ref(&mut self, name: &str, descriptor: &str) -> u16 {
        let class = self.class.name.clone();
        self.class.pool.method_ref(&class, name, descriptor)
    }

    // ── Expressions ────────────────────────────────────────────────────

    /// Push the value of `expr` and return its kind. `Void` pushes nothing.
    fn value(&mut self, expr: &Expr, frame: &mut Frame) -> Result<Kind, CodegenError> {
        let span = Some(expr.span);
        let kind = kind_of(&expr.ty, span)?;
        match &expr.kind {
            ExprKind::Literal(literal) => self.literal(literal, expr, frame)?,
            ExprKind::Ident(ident) => match ident.origin {
                Origin::Local => {
                    let (slot, kind) = frame
                        .lookup(&ident.name)
                        .ok_or_else(|| unsupported(format!("the local `{}`", ident.name), span))?;
                    frame.asm.load(kind, slot)?;
                }
                Origin::Global => {
                    let field = self.global_ref(&ident.name)?;
                    frame.asm.get_static(field, kind.slots());
                }
                Origin::Function | Origin::Constructor => {
                    return Err(unsupported("function values", span));
                }
                Origin::Field => return Err(unsupported("fields", span)),
            },
            ExprKind::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs, frame)?,
            ExprKind::Unary { op, operand } => {
                let operand_kind = self.value(operand, frame)?;
                match op {
                    UnaryOp::Neg => frame.asm.negate(operand_kind),
                    UnaryOp::Not => frame.asm.not(),
                }
            }
            ExprKind::Call {
                callee: Callee::Function {
                    name,
                    instantiation: None,
                },
                args,
            } => {
                let signature = self
                    .functions
                    .get(name)
                    .cloned()
                    .ok_or_else(|| unsupported(format!("calls to `{}`", name), span))?;
                for arg in args {
                    self.value(arg, frame)?;
                }
                let method = self.method_ref(name, &signature.descriptor);
                frame.asm.invoke_static(method, signature.arg_slots, signature.ret.slots());
            }
            ExprKind::Call { .. } => return Err(unsupported("this kind of call", span)),
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let otherwise = frame.asm.new_label();
                let end = frame.asm.new_label();
                self.jump_unless(condition, otherwise, expr, frame)?;
                let depth = frame.asm.depth();
                self.value_as(then_branch, kind, frame)?;
                frame.asm.branch(Op::Goto, end, 0);
                frame.asm.place(otherwise);
                frame.asm.set_depth(depth);
                if let Some(else_branch) = else_branch {
                    self.value_as(else_branch, kind, frame)?;
                }
                frame.asm.place(end);
            }
            ExprKind::While { condition, body } => {
                let start = frame.asm.new_label();
                let end = frame.asm.new_label();
                frame.asm.place(start);
                self.value(condition, frame)?;
                frame.asm.branch(Op::Ifeq, end, -1);
                self.value_as(body, Kind::Void, frame)?;
                frame.asm.branch(Op::Goto, start, 0);
                frame.asm.place(end);
            }
            ExprKind::Block { stmts, tail } => {
                frame.scopes.push(FxHashMap::default());
                let mark = frame.asm.locals_mark();
                for stmt in stmts {
                    self.stmt(stmt, frame)?;
                }
                if let Some(tail) = tail {
                    self.value_as(tail, kind, frame)?;
                }
                frame.asm.release_locals(mark);
                frame.scopes.pop();
            }
            ExprKind::Assign { target, value } => {
                let ExprKind::Ident(ident) = &target.kind else {
                    return Err(unsupported("assignments to members", span));
                };
                let value_kind = self.value(value, frame)?;
                match ident.origin {
                    Origin::Local => {
                        let (slot, _) = frame.lookup(&ident.name).ok_or_else(|| {
                            unsupported(format!("the local `{}`", ident.name), span)
                        })?;
                        frame.asm.store(value_kind, slot)?;
                    }
                    Origin::Global => {
                        let field = self.global_ref(&ident.name)?;
                        frame.asm.put_static(field, value_kind.slots());
                    }
                    _ => return Err(unsupported("assignments to fields", span)),
                }
            }
            ExprKind::This => return Err(unsupported("`this`", span)),
            ExprKind::Member { .. } => return Err(unsupported("member access", span)),
            ExprKind::Lambda { .. } => return Err(unsupported("lambdas", span)),
            ExprKind::Cast(_) => return Err(unsupported("casts", span)),
            ExprKind::Array(_) | ExprKind::Index { .. } => return Err(unsupported("arrays", span)),
            ExprKind::Upcast(_) => return Err(unsupported("interface values", span)),
        }
        Ok(kind)
    }

    /// Push `expr` as `want`, dropping a value nobody uses.
    fn value_as(&mut self, expr: &Expr, want: Kind, frame: &mut Frame) -> Result<(), CodegenError> {
        let got = self.value(expr, frame)?;
        if got != want {
            frame.asm.pop(got);
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt, frame: &mut Frame) -> Result<(), CodegenError> {
        match stmt {
            Stmt::Let { name, init, .. } => {
                let kind = self.value(init, frame)?;
                let slot = frame.declare(name, kind);
                frame.asm.store(kind, slot)?;
            }
            Stmt::Expr(expr) => self.value_as(expr, Kind::Void, frame)?,
        }
        Ok(())
    }

    fn literal(&mut self, literal: &Literal, expr: &Expr, frame: &mut Frame) -> Result<(), CodegenError> {
        let pool = &mut self.class.pool;
        match literal {
            Literal::Int(value) => {
                let value = i32::try_from(*value).map_err(|_| CodegenError::IntegerOutOfRange {
                    value: *value,
                    span: expr.span,
                })?;
                frame.asm.int(value, || pool.integer(value));
            }
            Literal::Float(value) => frame.asm.double(*value, || pool.double(*value)),
            Literal::Bool(value) => frame.asm.int(i32::from(*value), || pool.integer(0)),
            Literal::Char(_) => return Err(unsupported("characters", Some(expr.span))),
            Literal::String(_) => return Err(unsupported("strings", Some(expr.span))),
        }
        Ok(())
    }

    fn binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, frame: &mut Frame) -> Result<(), CodegenError> {
        if op.is_logical() {
            return self.logical(op, lhs, rhs, frame);
        }
        let kind = self.value(lhs, frame)?;
        self.value(rhs, frame)?;
        if op.is_arithmetic() {
            let instruction = match (op, kind) {
                (BinaryOp::Add, Kind::Double) => Op::Dadd,
                (BinaryOp::Sub, Kind::Double) => Op::Dsub,
                (BinaryOp::Mul, Kind::Double) => Op::Dmul,
                (BinaryOp::Div, Kind::Double) => Op::Ddiv,
                (BinaryOp::Rem, Kind::Double) => Op::Drem,
                (BinaryOp::Add, _) => Op::Iadd,
                (BinaryOp::Sub, _) => Op::Isub,
                (BinaryOp::Mul, _) => Op::Imul,
                (BinaryOp::Div, _) => Op::Idiv,
                _ => Op::Irem,
            };
            frame.asm.arith(instruction, kind);
            return Ok(());
        }

        // Comparisons branch to push 0 or 1. For doubles, dcmpg makes NaN
        // compare greater and dcmpl less, so every ordering with NaN is false.
        let (test, delta) = match kind {
            Kind::Double => {
                let cmp = match op {
                    BinaryOp::Lt | BinaryOp::LtEq => Op::Dcmpg,
                    _ => Op::Dcmpl,
                };
                frame.asm.dcmp(cmp);
                let test = match op {
                    BinaryOp::Lt => Op::Iflt,
                    BinaryOp::LtEq => Op::Ifle,
                    BinaryOp::Gt => Op::Ifgt,
                    BinaryOp::GtEq => Op::Ifge,
                    BinaryOp::Eq => Op::Ifeq,
                    _ => Op::Ifne,
                };
                (test, -1)
            }
            _ => {
                let test = match op {
                    BinaryOp::Lt => Op::IfIcmplt,
                    BinaryOp::LtEq => Op::IfIcmple,
                    BinaryOp::Gt => Op::IfIcmpgt,
                    BinaryOp::GtEq => Op::IfIcmpge,
                    BinaryOp::Eq => Op::IfIcmpeq,
                    _ => Op::IfIcmpne,
                };
                (test, -2)
            }
        };
        let yes = frame.asm.new_label();
        let end = frame.asm.new_label();
        frame.asm.branch(test, yes, delta);
        let depth = frame.asm.depth();
        frame.asm.int(0, || 0);
        frame.asm.branch(Op::Goto, end, 0);
        frame.asm.place(yes);
        frame.asm.set_depth(depth);
        frame.asm.int(1, || 0);
        frame.asm.place(end);
        Ok(())
    }

    /// `&&` and `||` with short-circuit jumps.
    /// Jump to `target` when `condition` is false, falling through when it
    /// holds. `&&` and `||` chains short-circuit without materializing a
    /// boolean.
    fn jump_unless(
        &mut self,
        condition: &Condition,
        target: Label,
        at: &Expr,
        frame: &mut Frame,
    ) -> Result<(), CodegenError> {
        match condition {
            Condition::Expr(test) => {
                self.value(test, frame)?;
                frame.asm.branch(Op::Ifeq, target, -1);
            }
            Condition::And(lhs, rhs) => {
                self.jump_unless(lhs, target, at, frame)?;
                self.jump_unless(rhs, target, at, frame)?;
            }
            Condition::Or(lhs, rhs) => {
                let next = frame.asm.new_label();
                let taken = frame.asm.new_label();
                self.jump_unless(lhs, next, at, frame)?;
                frame.asm.branch(Op::Goto, taken, 0);
                frame.asm.place(next);
                self.jump_unless(rhs, target, at, frame)?;
                frame.asm.place(taken);
            }
            Condition::Is { .. } => return Err(unsupported("patterns", Some(at.span))),
        }
        Ok(())
    }

    fn logical(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, frame: &mut Frame) -> Result<(), CodegenError> {
        // `&&` jumps out on the first false operand, `||` on the first true.
        let (test, exit_value) = match op {
            BinaryOp::And => (Op::Ifeq, 0),
            _ => (Op::Ifne, 1),
        };
        let exit = frame.asm.new_label();
        let end = frame.asm.new_label();
        self.value(lhs, frame)?;
        frame.asm.branch(test, exit, -1);
        self.value(rhs, frame)?;
        frame.asm.branch(test, exit, -1);
        let depth = frame.asm.depth();
        frame.asm.int(1 - exit_value, || 0);
        frame.asm.branch(Op::Goto, end, 0);
        frame.asm.place(exit);
        frame.asm.set_depth(depth);
        frame.asm.int(exit_value, || 0);
        frame.asm.place(end);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_syntax::{
        Condition as SyntaxCondition, Expr as SyntaxExpr, FnDef, Item as SyntaxItem, Module, Param,
        TypeExpr, ValDef,
    };

    fn assemble(items: Vec<SyntaxItem>) -> Result<Vec<u8>, CodegenError> {
        let program = tern_typeck::check(&Module::new("Main", items)).unwrap();
        ClassGen::new(&program, "Main").generate()
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|window| window == needle)
    }

    fn binary_fn(name: &str, ty: fn() -> TypeExpr, ret: TypeExpr, op: BinaryOp) -> SyntaxItem {
        SyntaxItem::Fn(FnDef::new(
            name,
            vec![Param::new("a", ty()), Param::new("b", ty())],
            Some(ret),
            SyntaxExpr::binary(op, SyntaxExpr::name("a"), SyntaxExpr::name("b")),
        ))
    }

    #[test]
    fn int_arithmetic() {
        let bytes = assemble(vec![binary_fn("add", TypeExpr::int, TypeExpr::int(), BinaryOp::Add)]).unwrap();
        // iload 0; iload 1; iadd; ireturn
        assert!(contains(&bytes, &[0x15, 0, 0x15, 1, 0x60, 0xac]));
        assert!(contains(&bytes, b"(II)I"));
    }

    #[test]
    fn double_ordering_uses_dcmpg() {
        let bytes = assemble(vec![binary_fn("lt", TypeExpr::float, TypeExpr::bool(), BinaryOp::Lt)]).unwrap();
        // dload 0; dload 2; dcmpg; iflt
        assert!(contains(&bytes, &[0x18, 0, 0x18, 2, 0x98, 0x9b]));
        assert!(contains(&bytes, b"(DD)Z"));
    }

    #[test]
    fn globals_are_initialized_statically() {
        let bytes = assemble(vec![SyntaxItem::Val(ValDef::new("x", None, SyntaxExpr::int(1_000_000)))]).unwrap();
        assert!(contains(&bytes, b"<clinit>"));
        // ldc #n; putstatic; return
        assert!(contains(&bytes, &[0x00, 0x0f, 0x42, 0x40]));
    }

    #[test]
    fn conditionals_branch_over_the_else() {
        let body = SyntaxExpr::if_else(
            SyntaxCondition::expr(SyntaxExpr::name("flag")),
            SyntaxExpr::int(1),
            SyntaxExpr::int(2),
        );
        let item = SyntaxItem::Fn(FnDef::new(
            "pick",
            vec![Param::new("flag", TypeExpr::bool())],
            Some(TypeExpr::int()),
            body,
        ));
        let bytes = assemble(vec![item]).unwrap();
        // iload 0; ifeq +7; iconst_1; goto +4; iconst_2; ireturn
        assert!(contains(
            &bytes,
            &[0x15, 0, 0x99, 0, 7, 0x04, 0xa7, 0, 4, 0x05, 0xac]
        ));
    }

    fn pick_with(condition: SyntaxCondition) -> SyntaxItem {
        SyntaxItem::Fn(FnDef::new(
            "pick",
            vec![Param::new("a", TypeExpr::bool()), Param::new("b", TypeExpr::bool())],
            Some(TypeExpr::int()),
            SyntaxExpr::if_else(condition, SyntaxExpr::int(1), SyntaxExpr::int(2)),
        ))
    }

    #[test]
    fn conjunctions_jump_to_the_else_on_each_operand() {
        let both = SyntaxCondition::expr(SyntaxExpr::name("a")).and(SyntaxCondition::expr(SyntaxExpr::name("b")));
        let bytes = assemble(vec![pick_with(both)]).unwrap();
        // iload 0; ifeq +12; iload 1; ifeq +7; iconst_1; goto +4; iconst_2; ireturn
        assert!(contains(
            &bytes,
            &[0x15, 0, 0x99, 0, 12, 0x15, 1, 0x99, 0, 7, 0x04, 0xa7, 0, 4, 0x05, 0xac]
        ));
    }

    #[test]
    fn disjunctions_skip_the_second_operand() {
        let either = SyntaxCondition::expr(SyntaxExpr::name("a")).or(SyntaxCondition::expr(SyntaxExpr::name("b")));
        let bytes = assemble(vec![pick_with(either)]).unwrap();
        // iload 0; ifeq +6; goto +8; iload 1; ifeq +7; iconst_1; goto +4; iconst_2; ireturn
        assert!(contains(
            &bytes,
            &[0x15, 0, 0x99, 0, 6, 0xa7, 0, 8, 0x15, 1, 0x99, 0, 7, 0x04, 0xa7, 0, 4, 0x05, 0xac]
        ));
    }

    #[test]
    fn strings_are_rejected() {
        let err = assemble(vec![SyntaxItem::Val(ValDef::new("s", None, SyntaxExpr::string("hi")))]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "the class backend does not support values of type `String`"
        );
    }

    #[test]
    fn main_prints_its_result() {
        let main = SyntaxItem::Fn(FnDef::new("main", vec![], Some(TypeExpr::int()), SyntaxExpr::int(3)));
        let bytes = assemble(vec![main]).unwrap();
        assert!(contains(&bytes, b"([Ljava/lang/String;)V"));
        assert!(contains(&bytes, b"java/io/PrintStream"));
        assert!(contains(&bytes, b"(I)V"));
    }
}
