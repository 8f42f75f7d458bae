use std::{fmt, format_args as f, marker::PhantomData};

use crate::{
    ast::{self, BinaryOperator, Expr, ExprKind, Program, Stmt, StmtKind},
    codegen::{interface::Error, x86_64_env},
    locals::Locals,
    token::Spanned,
};

type Result<T = (), E = Spanned<Error>> = std::result::Result<T, E>;

/// Stack frames are kept 16-byte aligned, as the System V ABI requires at
/// call boundaries.
const STACK_ALIGNMENT: u32 = 16;

/// Emits Intel-syntax assembly for a single routine.
///
/// Every expression leaves its value in `rax`. The left operand of a binary
/// operator is saved on the stack while the right one is evaluated, then
/// popped into `rax` with the right operand moved to `rdi`.
pub struct Generator<W, E> {
    writer: W,
    indent: bool,
    /// Last label id handed out. Ids start at 1 for every generator.
    label_id: u32,
    /// Words pushed by the expression being lowered and not yet popped.
    depth: u32,
    _env: PhantomData<E>,
}

impl<W, E> Generator<W, E>
where
    W: fmt::Write,
    E: x86_64_env::Env,
{
    pub fn new(writer: W) -> Generator<W, E> {
        Generator {
            writer,
            indent: false,
            label_id: 0,
            depth: 0,
            _env: PhantomData,
        }
    }

    /// Writes the whole unit and returns the writer.
    pub fn generate(mut self, program: &Program) -> Result<W> {
        self.g_program_prologue();
        self.g_routine(program)?;
        Ok(self.writer)
    }
}

/// Target-specific functions.
impl<W, E> Generator<W, E>
where
    W: fmt::Write,
    E: x86_64_env::Env,
{
    fn g_program_prologue(&mut self) {
        self.out(E::GLOBAL_PROLOGUE);
    }

    fn g_routine(&mut self, program: &Program) -> Result {
        let symbol = Self::symbol(&program.name);
        self.out(f!(".section {}", E::SECTION_TEXT));
        self.out(f!(".globl {symbol}"));
        self.out(f!("{symbol}:"));
        self.indented(|this| -> Result {
            this.g_routine_prologue(&program.locals);
            for stmt in &program.body {
                this.g_stmt(&program.locals, stmt)?;
            }
            this.g_routine_epilogue();
            Ok(())
        })
    }

    fn g_routine_prologue(&mut self, locals: &Locals) {
        let stack_size = align_to(locals.size(), STACK_ALIGNMENT);
        log::debug!(
            "reserving {stack_size} bytes of stack for {} locals",
            locals.len()
        );
        self.out("push rbp");
        self.out("mov rbp, rsp");
        if stack_size > 0 {
            self.out(f!("sub rsp, {stack_size}"));
        }
    }

    /// The single exit of the routine. `rax` holds the returned value.
    fn g_routine_epilogue(&mut self) {
        let ret = self.return_label();
        self.out_label(ret);
        self.out("mov rsp, rbp");
        self.out("pop rbp");
        self.out("ret");
    }

    fn g_stmt(&mut self, locals: &Locals, stmt: &Stmt) -> Result {
        match &stmt.kind {
            StmtKind::Expr(expr) => self.g_expr(locals, expr)?,
            StmtKind::Return(value) => {
                self.g_expr(locals, value)?;
                let ret = self.return_label();
                self.out(f!("jmp {ret}"));
            }
            StmtKind::If {
                predicate,
                then_arm,
                else_arm,
            } => {
                let id = self.next_label_id();
                let end = self.label("end", id);
                self.g_expr(locals, predicate)?;
                self.out("cmp rax, 0");
                if let Some(else_arm) = else_arm {
                    let else_label = self.label("else", id);
                    self.out(f!("je {else_label}"));
                    self.g_stmt(locals, then_arm)?;
                    self.out(f!("jmp {end}"));
                    self.out_label(else_label);
                    self.g_stmt(locals, else_arm)?;
                } else {
                    self.out(f!("je {end}"));
                    self.g_stmt(locals, then_arm)?;
                }
                self.out_label(end);
            }
            StmtKind::While { predicate, body } => {
                let id = self.next_label_id();
                let (begin, end) = (self.label("begin", id), self.label("end", id));
                self.out_label(begin);
                self.g_expr(locals, predicate)?;
                self.out("cmp rax, 0");
                self.out(f!("je {end}"));
                self.g_stmt(locals, body)?;
                self.out(f!("jmp {begin}"));
                self.out_label(end);
            }
            StmtKind::For {
                init,
                predicate,
                step,
                body,
            } => {
                let id = self.next_label_id();
                let (begin, end) = (self.label("begin", id), self.label("end", id));
                if let Some(init) = init {
                    self.g_expr(locals, init)?;
                }
                self.out_label(begin);
                if let Some(predicate) = predicate {
                    self.g_expr(locals, predicate)?;
                    self.out("cmp rax, 0");
                    self.out(f!("je {end}"));
                }
                self.g_stmt(locals, body)?;
                if let Some(step) = step {
                    self.g_expr(locals, step)?;
                }
                self.out(f!("jmp {begin}"));
                self.out_label(end);
            }
            StmtKind::Block { body } => {
                for stmt in body {
                    self.g_stmt(locals, stmt)?;
                }
            }
        }
        debug_assert_eq!(self.depth, 0, "unbalanced stack after statement");
        Ok(())
    }

    fn g_expr(&mut self, locals: &Locals, e: &Expr) -> Result {
        match &e.kind {
            ExprKind::Int(int) => self.out(f!("mov rax, {int}")),
            ExprKind::Local(_) => {
                self.g_addr(locals, e)?;
                self.out("mov rax, [rax]");
            }
            ExprKind::Binary {
                op: BinaryOperator::Assign,
                lhs,
                rhs,
            } => {
                self.g_addr(locals, lhs)?;
                self.push();
                self.g_expr(locals, rhs)?;
                self.pop("rdi");
                self.out("mov [rdi], rax");
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.g_expr(locals, lhs)?;
                self.push();
                self.g_expr(locals, rhs)?;
                self.out("mov rdi, rax");
                self.pop("rax");
                self.g_binary_op(*op);
            }
        }
        Ok(())
    }

    /// Loads the address of an lvalue into `rax`.
    fn g_addr(&mut self, locals: &Locals, e: &Expr) -> Result {
        let ExprKind::Local(offset) = e.kind else {
            return Err(e.span.wrap(Error::NotAddressable));
        };
        if !locals.contains(offset) {
            return Err(e.span.wrap(Error::UnresolvedLocal(offset)));
        }
        self.out(f!("lea rax, [rbp - {offset}]"));
        Ok(())
    }

    /// Combines `rax` (left) and `rdi` (right) into `rax`.
    fn g_binary_op(&mut self, op: BinaryOperator) {
        match op {
            BinaryOperator::Add => self.out("add rax, rdi"),
            BinaryOperator::Sub => self.out("sub rax, rdi"),
            BinaryOperator::Mul => self.out("imul rax, rdi"),
            BinaryOperator::Div => {
                self.out("cqo");
                self.out("idiv rdi");
            }
            BinaryOperator::Eq => self.g_compare("sete"),
            BinaryOperator::Ne => self.g_compare("setne"),
            BinaryOperator::Lt => self.g_compare("setl"),
            BinaryOperator::Le => self.g_compare("setle"),
            BinaryOperator::Assign => unreachable!("assignment is lowered by g_expr"),
        }
    }

    /// Sets `rax` to 1 or 0 using the provided `setcc` instruction.
    fn g_compare(&mut self, set: &str) {
        self.out("cmp rax, rdi");
        self.out(f!("{set} al"));
        self.out("movzx rax, al");
    }

    fn symbol(name: &str) -> &str {
        if name == ast::MAIN {
            E::ENTRY_POINT
        } else {
            name
        }
    }

    fn label(&self, kind: &'static str, id: u32) -> Label {
        Label {
            prefix: E::LOCAL_LABEL_PREFIX,
            kind,
            id,
        }
    }

    /// The epilogue label. Id 0 is never handed out by `next_label_id`.
    fn return_label(&self) -> Label {
        self.label("return", 0)
    }
}

/// Utility functions.
impl<W, E> Generator<W, E>
where
    W: fmt::Write,
    E: x86_64_env::Env,
{
    /// Prints a line.
    fn out(&mut self, f: impl fmt::Display) {
        let indent = if self.indent { "    " } else { "" };
        writeln!(self.writer, "{indent}{f}").expect("code emit should be infallible");
    }

    /// Prints a label definition, never indented.
    fn out_label(&mut self, label: Label) {
        writeln!(self.writer, "{label}:").expect("code emit should be infallible");
    }

    /// Prints an empty line.
    fn out_line(&mut self) {
        writeln!(self.writer).expect("code emit should be infallible");
    }

    fn push(&mut self) {
        self.out("push rax");
        self.depth += 1;
    }

    fn pop(&mut self, reg: &str) {
        self.out(f!("pop {reg}"));
        self.depth -= 1;
    }

    fn next_label_id(&mut self) -> u32 {
        self.label_id += 1;
        log::trace!("allocated label id {}", self.label_id);
        self.label_id
    }

    /// Writes in an indented block that is finished with an empty line.
    fn indented<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.indent = true;
        let res = f(self);
        self.indent = false;
        self.out_line();
        res
    }
}

fn align_to(n: u32, align: u32) -> u32 {
    n.div_ceil(align) * align
}

#[derive(Copy, Clone)]
struct Label {
    prefix: &'static str,
    kind: &'static str,
    id: u32,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}.{}", self.prefix, self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{lexer, parser, token::Span};

    fn generate<E: x86_64_env::Env>(src: &str) -> String {
        let tokens = lexer::lex_in_new(src).unwrap();
        let program = parser::parse_program(&tokens).unwrap();
        Generator::<_, E>::new(String::new())
            .generate(&program)
            .unwrap()
    }

    fn body(src: &str) -> Vec<String> {
        generate::<x86_64_env::Linux>(src)
            .lines()
            .skip_while(|line| *line != "main:")
            .skip(1)
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn test_arithmetic() {
        let asm = generate::<x86_64_env::Linux>("return 1+2;");
        assert_eq!(
            asm,
            indoc! {r#"
                .intel_syntax noprefix
                .section .note.GNU-stack,"",@progbits

                .section .text
                .globl main
                main:
                    push rbp
                    mov rbp, rsp
                    mov rax, 1
                    push rax
                    mov rax, 2
                    mov rdi, rax
                    pop rax
                    add rax, rdi
                    jmp .L.return.0
                .L.return.0:
                    mov rsp, rbp
                    pop rbp
                    ret

            "#}
        );
    }

    #[test]
    fn test_locals() {
        let asm = generate::<x86_64_env::Linux>("a = 3; return a;");
        let expected = indoc! {"
            main:
                push rbp
                mov rbp, rsp
                sub rsp, 16
                lea rax, [rbp - 8]
                push rax
                mov rax, 3
                pop rdi
                mov [rdi], rax
                lea rax, [rbp - 8]
                mov rax, [rax]
                jmp .L.return.0
            .L.return.0:
                mov rsp, rbp
                pop rbp
                ret

        "};
        assert!(asm.ends_with(expected), "{asm}");
    }

    #[test]
    fn test_frame_size() {
        let sizes = [
            ("return 0;", None),
            ("a=1; return a;", Some("sub rsp, 16")),
            ("a=1; b=2; return a;", Some("sub rsp, 16")),
            ("a=1; b=2; c=3; return a;", Some("sub rsp, 32")),
            ("a=1; a=2; a=3; return a;", Some("sub rsp, 16")),
        ];
        for (src, expected) in sizes {
            let lines = body(src);
            let actual = lines.iter().find(|l| l.contains("sub rsp")).map(|l| l.trim());
            assert_eq!(actual, expected, "src: {src:?}");
        }
    }

    #[test]
    fn test_comparison() {
        assert_eq!(
            body("return 1<=2;")[7..10],
            ["    cmp rax, rdi", "    setle al", "    movzx rax, al"]
        );
        // `>` swaps its operands and compares with `<`.
        assert_eq!(
            body("return 1>2;")[2..10],
            [
                "    mov rax, 2",
                "    push rax",
                "    mov rax, 1",
                "    mov rdi, rax",
                "    pop rax",
                "    cmp rax, rdi",
                "    setl al",
                "    movzx rax, al",
            ]
        );
    }

    #[test]
    fn test_division() {
        assert_eq!(body("return 7/2;")[7..9], ["    cqo", "    idiv rdi"]);
    }

    #[test]
    fn test_if_else() {
        assert_eq!(
            body("if (1) return 2; else return 3;")[2..12],
            [
                "    mov rax, 1",
                "    cmp rax, 0",
                "    je .L.else.1",
                "    mov rax, 2",
                "    jmp .L.return.0",
                "    jmp .L.end.1",
                ".L.else.1:",
                "    mov rax, 3",
                "    jmp .L.return.0",
                ".L.end.1:",
            ]
        );
        assert_eq!(
            body("if (0) 1; return 2;")[2..7],
            [
                "    mov rax, 0",
                "    cmp rax, 0",
                "    je .L.end.1",
                "    mov rax, 1",
                ".L.end.1:",
            ]
        );
    }

    #[test]
    fn test_loops() {
        assert_eq!(
            body("i=0; while (i<10) i=i+1; return i;")[8..12],
            [
                ".L.begin.1:",
                "    lea rax, [rbp - 8]",
                "    mov rax, [rax]",
                "    push rax",
            ]
        );
        assert_eq!(
            body("for (;;) return 3;")[2..7],
            [
                ".L.begin.1:",
                "    mov rax, 3",
                "    jmp .L.return.0",
                "    jmp .L.begin.1",
                ".L.end.1:",
            ]
        );
    }

    #[test]
    fn test_labels_are_unique() {
        let lines = body(indoc! {"
            i = 0;
            while (i < 3) { if (i == 1) i = i + 2; else i = i + 1; }
            for (j = 0; j < 2; j = j + 1) while (0) 1;
            if (i) { return i; }
            return 0;
        "});
        let mut labels: Vec<_> = lines.iter().filter(|l| l.ends_with(':')).collect();
        let count = labels.len();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), count);
        assert_eq!(count, 10);
    }

    #[test]
    fn test_darwin() {
        let asm = generate::<x86_64_env::Darwin>("return 0;");
        let lines: Vec<_> = asm.lines().collect();
        assert_eq!(
            lines[..5],
            [
                ".intel_syntax noprefix",
                "",
                ".section __TEXT,__text,regular,pure_instructions",
                ".globl _main",
                "_main:",
            ]
        );
        assert!(lines.contains(&"L.return.0:"));
        assert!(lines.contains(&"    jmp L.return.0"));
    }

    #[test]
    fn test_deterministic() {
        let src = "a=1; for (i=0; i<5; i=i+1) { a = a*2; } if (a > 10) return a; return 0;";
        assert_eq!(
            generate::<x86_64_env::Linux>(src),
            generate::<x86_64_env::Linux>(src)
        );
    }

    #[test]
    fn test_broken_invariants() {
        let span = Span::new_of_bounds(0..1);
        let int = |value| Expr {
            kind: ExprKind::Int(value),
            span,
        };
        let program = |expr, locals| Program {
            name: ast::MAIN.into(),
            body: vec![Stmt {
                kind: StmtKind::Expr(expr),
                span,
            }],
            locals,
        };

        let assign = Expr::binary(BinaryOperator::Assign, int(1), int(2));
        let err = Generator::<_, x86_64_env::Linux>::new(String::new())
            .generate(&program(assign, Locals::default()))
            .unwrap_err();
        assert_eq!(err, span.wrap(Error::NotAddressable));

        let mut other = Locals::default();
        other.resolve("x");
        let offset = other.resolve("y");
        let local = Expr {
            kind: ExprKind::Local(offset),
            span,
        };
        let err = Generator::<_, x86_64_env::Linux>::new(String::new())
            .generate(&program(local, Locals::default()))
            .unwrap_err();
        assert_eq!(err, span.wrap(Error::UnresolvedLocal(offset)));
    }
}
