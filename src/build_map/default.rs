use super::{BuildMap, RenderData, Transformer};
use crate::error::BuildError;
use crate::processor::ast::*;

/// Whitespace-minimal rendering with nothing renamed or removed. Source
/// parentheses and standalone comments are kept.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMap;

impl DefaultMap {
    fn list<'e>(
        &self,
        t: &Transformer<'_>,
        items: impl IntoIterator<Item = &'e Expr>,
        data: RenderData,
    ) -> Result<Vec<String>, BuildError> {
        items.into_iter().map(|e| t.expr(e, data)).collect()
    }

    fn function(&self, t: &Transformer<'_>, func: &Function) -> Result<String, BuildError> {
        let mut params = Vec::with_capacity(func.params.len());
        for param in &func.params {
            let name = t.identifier(&param.name)?;
            match &param.default {
                Some(default) => {
                    let value = t.expr(default, RenderData::argument())?;
                    params.push(format!("{name}={value}"));
                }
                None => params.push(name),
            }
        }
        let body = t.nested(|t| t.block(&func.body))?;
        Ok(format!(
            "function({}){body}{}end function",
            params.join(t.separator()),
            t.line_break()
        ))
    }

    fn if_stmt(
        &self,
        t: &Transformer<'_>,
        clauses: &[IfClause],
        else_body: Option<&[Stmt]>,
    ) -> Result<String, BuildError> {
        let mut out = String::new();
        for (i, clause) in clauses.iter().enumerate() {
            if i > 0 {
                out.push_str(&t.line_break());
                out.push_str("else ");
            }
            let condition = t.expr(&clause.condition, RenderData::default())?;
            out.push_str(&format!("if {condition} then"));
            out.push_str(&t.nested(|t| t.block(&clause.body))?);
        }
        if let Some(else_body) = else_body {
            out.push_str(&t.line_break());
            out.push_str("else");
            out.push_str(&t.nested(|t| t.block(else_body))?);
        }
        out.push_str(&t.line_break());
        out.push_str("end if");
        Ok(out)
    }
}

impl BuildMap for DefaultMap {
    fn expr(&self, t: &Transformer<'_>, expr: &Expr, data: RenderData) -> Result<String, BuildError> {
        let text = match expr {
            Expr::Identifier(name) => name.clone(),
            Expr::Literal(literal) => t.literal(literal, data),
            Expr::List(items) => format!("[{}]", self.list(t, items, data)?.join(t.separator())),
            Expr::Map(entries) => {
                let mut rendered = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    rendered.push(t.key_value(&t.expr(key, data)?, &t.expr(value, data)?));
                }
                format!("{{{}}}", rendered.join(t.separator()))
            }
            Expr::Function(func) => self.function(t, func)?,
            Expr::Binary { op, left, right } if op.is_bitwise() => t.bitwise(*op, left, right, data)?,
            Expr::Binary { op, left, right } => {
                let left = if op.is_comparison() {
                    t.comparison_operand(left, data)?
                } else {
                    t.operand(left, op.precedence(), data)?
                };
                let right = t.operand(right, op.precedence() + 1, data)?;
                t.binary_operator(*op, &left, &right)
            }
            Expr::Not(operand) => format!("not {}", t.operand(operand, PREC_NOT, data)?),
            Expr::Negation(operand) => format!("-{}", t.operand(operand, PREC_UNARY, data)?),
            Expr::New(operand) => format!("new {}", t.operand(operand, PREC_NEW, data)?),
            Expr::AddressOf(operand) => format!("@{}", t.operand(operand, PREC_ADDRESS, data)?),
            Expr::Call { callee, args } => format!(
                "{}({})",
                t.operand(callee, PREC_POSTFIX, data)?,
                self.list(t, args, data)?.join(t.separator())
            ),
            Expr::Member { base, name } => {
                format!("{}.{name}", t.operand(base, PREC_POSTFIX, data)?)
            }
            Expr::Index { base, index } => format!(
                "{}[{}]",
                t.operand(base, PREC_POSTFIX, data)?,
                t.expr(index, data)?
            ),
            Expr::Slice { base, start, end } => {
                let start = match start {
                    Some(e) => t.expr(e, data)?,
                    None => String::new(),
                };
                let end = match end {
                    Some(e) => t.expr(e, data)?,
                    None => String::new(),
                };
                format!("{}[{start}:{end}]", t.operand(base, PREC_POSTFIX, data)?)
            }
            Expr::Paren(inner) if t.strips_parens() => t.expr(inner, data)?,
            Expr::Paren(inner) => format!("({})", t.expr(inner, data)?),
            Expr::ImportCode(path) => t.native_import(path)?,
            Expr::Envar(name) => t.envar(name),
            Expr::Inject(path) => t.inject(path),
            Expr::Line(_) if t.is_dev_mode() => "#line".to_string(),
            Expr::Line(line) => line.to_string(),
            Expr::Filename(_) if t.is_dev_mode() => "#filename".to_string(),
            Expr::Filename(name) => quote(name),
        };
        Ok(text)
    }

    fn stmt(&self, t: &Transformer<'_>, stmt: &Stmt) -> Result<String, BuildError> {
        let none = RenderData::default();
        let text = match &stmt.kind {
            StmtKind::Assignment { variable, init } => {
                t.assign(&t.expr(variable, none)?, &t.expr(init, none)?)
            }
            StmtKind::Expression(expr) => t.expr(expr, none)?,
            StmtKind::If { clauses, else_body } => self.if_stmt(t, clauses, else_body.as_deref())?,
            StmtKind::While { condition, body } => format!(
                "while {}{}{}end while",
                t.expr(condition, none)?,
                t.nested(|t| t.block(body))?,
                t.line_break()
            ),
            StmtKind::For {
                variable,
                iterator,
                body,
            } => format!(
                "for {} in {}{}{}end for",
                t.identifier(variable)?,
                t.expr(iterator, none)?,
                t.nested(|t| t.block(body))?,
                t.line_break()
            ),
            StmtKind::Return(None) => "return".to_string(),
            StmtKind::Return(Some(value)) => format!("return {}", t.expr(value, none)?),
            StmtKind::Break => "break".to_string(),
            StmtKind::Continue => "continue".to_string(),
            StmtKind::Comment(text) => format!("//{text}"),
            StmtKind::Import { name, path } => t.import_stmt(name, path)?,
            StmtKind::Include { path } => t.include_stmt(path)?,
            StmtKind::Conditional {
                name,
                negated,
                body,
                else_body,
            } => t.conditional_stmt(name, *negated, body, else_body.as_deref())?,
            StmtKind::Debugger => t.debugger_stmt(),
        };
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use crate::build_map::{DefaultMap, Transformer};
    use crate::model::CompileOptions;
    use crate::processor::context::{ContextOptions, SymbolContext};
    use crate::processor::script_parser::parse;

    fn render(src: &str, options: &CompileOptions) -> String {
        let chunk = parse(src, "default.src").expect("parses");
        let context = SymbolContext::new(ContextOptions::default());
        let t = Transformer::new(Box::new(DefaultMap), &context, None, options);
        t.transform(&chunk, None).expect("renders")
    }

    #[test]
    fn test_rendering() {
        let options = CompileOptions::default();
        let test_cases = vec![
            ("x = 1 + 2", "x=1+2"),
            ("x = (a + b) * c", "x=(a+b)*c"),
            ("x = a << b", "x=bitwise(\"<<\",a,b)"),
            ("x = a and not b", "x=a and not b"),
            ("print \"hi\", 2", "print(\"hi\",2)"),
            ("x -= 1", "x=x-1"),
            ("x = a - -1", "x=a- -1"),
            ("x = (a < b) == c", "x=(a<b)==c"),
            ("x = a < b < c", "x=a<b<c"),
            ("m = {\"a\": [1, 2], \"b\": @f}", "m={\"a\":[1,2],\"b\":@f}"),
            ("s = t[1:]", "s=t[1:]"),
            ("if a then b = 1 else b = 2", "if a then\nb=1\nelse\nb=2\nend if"),
            ("f = function(a, b = 2)\nreturn a\nend function", "f=function(a,b=2)\nreturn a\nend function"),
            ("// note\ndebugger", "// note\n//debugger"),
        ];

        for (input, expected) in test_cases {
            assert_eq!(render(input, &options), expected, "source: {input}");
        }
    }

    #[test]
    fn test_directives_without_graph() {
        let mut options = CompileOptions::default();
        options
            .environment_variables
            .insert("HOST".to_string(), "1.2.3.4".to_string());
        let src = "#import lib from \"lib.src\"\n#include \"x.src\"\nh = #envar HOST\nu = #envar NOPE\nimport_code(\"/n.src\")\nl = #line\nf = #filename";
        assert_eq!(
            render(src, &options),
            "#import lib from \"lib.src\"\n#include \"x.src\"\nh=\"1.2.3.4\"\nu=null\nimport_code(\"/n.src\")\nl=6\nf=\"default.src\""
        );
    }

    #[test]
    fn test_conditional_compilation() {
        let mut options = CompileOptions::default();
        options
            .environment_variables
            .insert("DEBUG".to_string(), "1".to_string());
        let src = "#ifdef DEBUG\nprint 1\n#else\nprint 2\n#endif\n#ifndef DEBUG\nprint 3\n#endif";
        assert_eq!(render(src, &options), "print(1)");
    }

    #[test]
    fn test_round_trip() {
        let options = CompileOptions::default();
        let src = "counter = 0\nbump = function(by = 1)\n  globals.counter += by * (2 + 3)\n  if counter > 10 and not done then return null\n  for item in [1, 2, 3]\n    while item > 0\n      item -= 1\n      if item == 2 then continue\n    end while\n  end for\nend function\nbump 2\nx = a.b[0][1:2] + -4\nmsg = \"say \"\"hi\"\"\"";
        let original = parse(src, "rt.src").expect("parses");
        let rendered = render(src, &options);
        let reparsed = parse(&rendered, "rt.src").expect("reparses");
        assert_eq!(original.body, reparsed.body, "rendered:\n{rendered}");
    }
}
