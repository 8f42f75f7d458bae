use std::io::Write;

use crate::{
    ast::{Expr, ExprKind, Program, Stmt, StmtKind},
    locals::Locals,
};

const INDENT_WIDTH: usize = 2;

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}

pub fn print_program_string(program: &Program) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_program(&mut buf, program).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_expr_string(locals: &Locals, expr: &Expr) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_expr(&mut buf, locals, 0, expr).unwrap();
    String::from_utf8(buf).unwrap()
}

/// Prints the variable table, in allocation order, followed by the body.
pub fn print_program(w: &mut impl Write, program: &Program) -> std::io::Result<()> {
    for (name, offset) in program.locals.iter() {
        writeln!(w, "local {name} @{offset}")?;
    }
    for stmt in &program.body {
        print_stmt(w, &program.locals, 0, stmt)?;
    }
    Ok(())
}

pub fn print_stmt(
    w: &mut impl Write,
    locals: &Locals,
    i: usize,
    stmt: &Stmt,
) -> std::io::Result<()> {
    sp(w, i)?;
    let span = stmt.span;
    match &stmt.kind {
        StmtKind::Expr(expr) => {
            writeln!(w, "expr ({span})")?;
            print_expr(w, locals, i + 1, expr)?;
        }
        StmtKind::Return(value) => {
            writeln!(w, "return ({span})")?;
            print_expr(w, locals, i + 1, value)?;
        }
        StmtKind::If {
            predicate,
            then_arm,
            else_arm,
        } => {
            writeln!(w, "if ({span})")?;
            print_expr(w, locals, i + 1, predicate)?;
            print_stmt(w, locals, i + 1, then_arm)?;
            if let Some(else_arm) = else_arm {
                sp(w, i + 1)?;
                writeln!(w, "else")?;
                print_stmt(w, locals, i + 2, else_arm)?;
            }
        }
        StmtKind::While { predicate, body } => {
            writeln!(w, "while ({span})")?;
            print_expr(w, locals, i + 1, predicate)?;
            print_stmt(w, locals, i + 1, body)?;
        }
        StmtKind::For {
            init,
            predicate,
            step,
            body,
        } => {
            writeln!(w, "for ({span})")?;
            let clauses = [("init", init), ("predicate", predicate), ("step", step)];
            for (label, clause) in clauses {
                if let Some(clause) = clause {
                    sp(w, i + 1)?;
                    writeln!(w, "{label}")?;
                    print_expr(w, locals, i + 2, clause)?;
                }
            }
            sp(w, i + 1)?;
            writeln!(w, "body")?;
            print_stmt(w, locals, i + 2, body)?;
        }
        StmtKind::Block { body } => {
            writeln!(w, "block ({span})")?;
            for stmt in body {
                print_stmt(w, locals, i + 1, stmt)?;
            }
        }
    }
    Ok(())
}

pub fn print_expr(
    w: &mut impl Write,
    locals: &Locals,
    i: usize,
    expr: &Expr,
) -> std::io::Result<()> {
    sp(w, i)?;
    let span = expr.span;
    match &expr.kind {
        ExprKind::Int(int) => writeln!(w, "int {int} ({span})")?,
        ExprKind::Local(offset) => {
            let name = locals.name_of(*offset).unwrap_or("<unresolved>");
            writeln!(w, "local {name} @{offset} ({span})")?;
        }
        ExprKind::Binary { op, lhs, rhs } => {
            writeln!(w, "binary {op:?} ({span})")?;
            print_expr(w, locals, i + 1, lhs)?;
            print_expr(w, locals, i + 1, rhs)?;
        }
    }
    Ok(())
}
