//! Collects the identifiers a chunk declares.
//!
//! Only declared names take part in renaming: assignment targets (plain
//! names and the member name of `obj.name = ...`), function parameters,
//! `for` variables and `#import` names. Everything else (builtins, host
//! globals) is left alone.

use indexmap::IndexSet;

use super::ast::{Chunk, Expr, Stmt, StmtKind};

/// Declared names of `chunk`, first occurrence order, no duplicates.
pub fn fetch_namespaces(chunk: &Chunk) -> IndexSet<String> {
    let mut names = IndexSet::new();
    collect_body(&chunk.body, &mut names);
    names
}

fn collect_body(body: &[Stmt], names: &mut IndexSet<String>) {
    for stmt in body {
        collect_stmt(stmt, names);
    }
}

fn collect_stmt(stmt: &Stmt, names: &mut IndexSet<String>) {
    match &stmt.kind {
        StmtKind::Assignment { variable, init } => {
            match variable {
                Expr::Identifier(name) => {
                    names.insert(name.clone());
                }
                Expr::Member { name, .. } => {
                    names.insert(name.clone());
                }
                _ => {}
            }
            collect_expr(variable, names);
            collect_expr(init, names);
        }
        StmtKind::Expression(expr) => collect_expr(expr, names),
        StmtKind::If { clauses, else_body } => {
            for clause in clauses {
                collect_expr(&clause.condition, names);
                collect_body(&clause.body, names);
            }
            if let Some(body) = else_body {
                collect_body(body, names);
            }
        }
        StmtKind::While { condition, body } => {
            collect_expr(condition, names);
            collect_body(body, names);
        }
        StmtKind::For {
            variable,
            iterator,
            body,
        } => {
            names.insert(variable.clone());
            collect_expr(iterator, names);
            collect_body(body, names);
        }
        StmtKind::Return(Some(expr)) => collect_expr(expr, names),
        StmtKind::Import { name, .. } => {
            names.insert(name.clone());
        }
        StmtKind::Conditional {
            body, else_body, ..
        } => {
            collect_body(body, names);
            if let Some(body) = else_body {
                collect_body(body, names);
            }
        }
        StmtKind::Return(None)
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Comment(_)
        | StmtKind::Include { .. }
        | StmtKind::Debugger => {}
    }
}

/// Function literals can sit anywhere in an expression.
fn collect_expr(expr: &Expr, names: &mut IndexSet<String>) {
    match expr {
        Expr::Function(func) => {
            for param in &func.params {
                names.insert(param.name.clone());
                if let Some(default) = &param.default {
                    collect_expr(default, names);
                }
            }
            collect_body(&func.body, names);
        }
        Expr::List(items) => items.iter().for_each(|e| collect_expr(e, names)),
        Expr::Map(entries) => {
            for (key, value) in entries {
                collect_expr(key, names);
                collect_expr(value, names);
            }
        }
        Expr::Binary { left, right, .. } => {
            collect_expr(left, names);
            collect_expr(right, names);
        }
        Expr::Not(e) | Expr::Negation(e) | Expr::New(e) | Expr::AddressOf(e) | Expr::Paren(e) => {
            collect_expr(e, names)
        }
        Expr::Call { callee, args } => {
            collect_expr(callee, names);
            args.iter().for_each(|e| collect_expr(e, names));
        }
        Expr::Member { base, .. } => collect_expr(base, names),
        Expr::Index { base, index } => {
            collect_expr(base, names);
            collect_expr(index, names);
        }
        Expr::Slice { base, start, end } => {
            collect_expr(base, names);
            if let Some(start) = start {
                collect_expr(start, names);
            }
            if let Some(end) = end {
                collect_expr(end, names);
            }
        }
        Expr::Identifier(_)
        | Expr::Literal(_)
        | Expr::ImportCode(_)
        | Expr::Envar(_)
        | Expr::Inject(_)
        | Expr::Line(_)
        | Expr::Filename(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::fetch_namespaces;
    use crate::processor::script_parser::parse;

    #[test]
    fn test_collects_declarations_only() {
        let src = "#import lib from \"lib\"\nx = 1\nobj.field = function(a, b = c)\n  for i in a\n    print i\n  end for\nend function\nprint y";
        let chunk = parse(src, "ns.src").expect("parses");
        let names: Vec<_> = fetch_namespaces(&chunk).into_iter().collect();
        assert_eq!(names, vec!["lib", "x", "field", "a", "b", "i"]);
    }
}
