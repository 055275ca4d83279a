use super::{BuildMap, DefaultMap, RenderData, Transformer};
use crate::error::BuildError;
use crate::processor::ast::*;

/// Scopes whose string-keyed lookups name variables.
const SCOPE_NAMES: &[&str] = &["globals", "locals", "outer"];

/// Minimal output: declared names shortened, repeated literals shared,
/// comments and redundant parentheses dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct UglifyMap {
    base: DefaultMap,
}

impl UglifyMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn renamed<'n>(t: &'n Transformer<'_>, name: &'n str) -> &'n str {
        t.context().rename(name).unwrap_or(name)
    }

    /// `"name"` where `name` is a renamed variable, as written in
    /// `globals["name"]` or `locals.hasIndex("name")`.
    fn renamed_key(t: &Transformer<'_>, expr: &Expr) -> Option<String> {
        let Expr::Literal(literal) = expr.unwrap_parens() else {
            return None;
        };
        let value = literal.string_value()?;
        t.context().rename(&value).map(quote)
    }

    fn is_scope(expr: &Expr) -> bool {
        matches!(expr.unwrap_parens(), Expr::Identifier(name) if SCOPE_NAMES.contains(&name.as_str()))
    }
}

impl BuildMap for UglifyMap {
    fn expr(&self, t: &Transformer<'_>, expr: &Expr, data: RenderData) -> Result<String, BuildError> {
        match expr {
            Expr::Identifier(name) => Ok(Self::renamed(t, name).to_string()),
            Expr::Member { base, name } => Ok(format!(
                "{}.{}",
                t.operand(base, PREC_POSTFIX, data)?,
                Self::renamed(t, name)
            )),
            Expr::Index { base, index } if Self::is_scope(base) => {
                let Some(key) = Self::renamed_key(t, index) else {
                    return self.base.expr(t, expr, data);
                };
                Ok(format!("{}[{key}]", t.operand(base, PREC_POSTFIX, data)?))
            }
            Expr::Call { callee, args } => {
                let scope_lookup = matches!(
                    callee.unwrap_parens(),
                    Expr::Member { base, name }
                        if Self::is_scope(base) && (name == "hasIndex" || name == "remove")
                );
                let key = match args.as_slice() {
                    [first] if scope_lookup => Self::renamed_key(t, first),
                    _ => None,
                };
                match key {
                    Some(key) => Ok(format!("{}({key})", t.operand(callee, PREC_POSTFIX, data)?)),
                    None => self.base.expr(t, expr, data),
                }
            }
            _ => self.base.expr(t, expr, data),
        }
    }

    fn stmt(&self, t: &Transformer<'_>, stmt: &Stmt) -> Result<String, BuildError> {
        match &stmt.kind {
            StmtKind::Comment(_) => Ok(String::new()),
            StmtKind::Debugger if !t.is_dev_mode() => Ok(String::new()),
            _ => self.base.stmt(t, stmt),
        }
    }

    fn strips_parens(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::build_map::{Transformer, UglifyMap};
    use crate::model::CompileOptions;
    use crate::processor::ast::shape;
    use crate::processor::context::{ContextOptions, SymbolContext};
    use crate::processor::namespaces::fetch_namespaces;
    use crate::processor::script_parser::parse;

    const ROUND_TRIP: &str = "\
        f = function(a, b = 2)\n\
        if (a < b) == (b < 3) then\n\
        return [a, -b, {\"k\": (a + b) * 2}]\n\
        else if not (a and b) then\n\
        return a[1:2]\n\
        end if\n\
        while a > 0 and (b or a)\n\
        a = a - 1 // step\n\
        end while\n\
        end function\n\
        for i in range(1, 10, 2, 4)\n\
        print f(i, (i < 2) == true)\n\
        end for\n\
        x = (p == q) == r\n\
        y = m < n < o\n\
        z = 2 ^ (3 ^ 2) - (4 - 1)\n\
        w = -(m - n) + @f";

    fn render(src: &str) -> String {
        let chunk = parse(src, "ugly.src").expect("parses");
        let mut context = SymbolContext::new(ContextOptions {
            rename: true,
            share_literals: true,
            ..ContextOptions::default()
        });
        for name in fetch_namespaces(&chunk) {
            context.create_namespace(&name);
        }
        for literal in &chunk.literals {
            context.add_literal(literal);
        }
        context.seal();
        let options = CompileOptions::default();
        let t = Transformer::new(Box::new(UglifyMap::new()), &context, None, &options);
        t.transform(&chunk, None).expect("renders")
    }

    fn render_plain(src: &str) -> String {
        let chunk = parse(src, "ugly.src").expect("parses");
        let context = SymbolContext::new(ContextOptions::default());
        let options = CompileOptions::default();
        let t = Transformer::new(Box::new(UglifyMap::new()), &context, None, &options);
        t.transform(&chunk, None).expect("renders")
    }

    #[test]
    fn test_renames_declared_names_only() {
        assert_eq!(
            render("counter = 1\n// gone\nprint counter\ndebugger"),
            "a=1\nprint(a)"
        );
    }

    #[test]
    fn test_renames_scope_lookups() {
        let src = "secret = 1\nif globals.hasIndex(\"secret\") then print globals[\"secret\"]\nlocals.remove(\"other\")";
        assert_eq!(
            render(src),
            "a=1\nif globals.hasIndex(\"a\") then\nprint(globals[\"a\"])\nend if\nlocals.remove(\"other\")"
        );
    }

    #[test]
    fn test_drops_redundant_parentheses() {
        let test_cases = vec![
            ("x = (1 + 2) * (3)", "a=(1+2)*3"),
            ("x = ((y))", "a=y"),
            ("x = not (y and z)", "a=not (y and z)"),
            ("x = -(y)", "a=-y"),
        ];
        for (input, expected) in test_cases {
            assert_eq!(render(input), expected, "source: {input}");
        }
    }

    #[test]
    fn test_keeps_grouped_comparisons() {
        assert_eq!(
            render("x = (m < n) == (o < p)\ny = (p == q) == r\nz = m < n < o"),
            "a=(m<n)==(o<p)\nb=(p==q)==r\nc=m<n<o"
        );
    }

    #[test]
    fn test_output_parses_to_the_same_tree() {
        let original = parse(ROUND_TRIP, "ugly.src").expect("parses");
        let rendered = render_plain(ROUND_TRIP);
        let reparsed = parse(&rendered, "ugly.src").expect("output parses");
        assert_eq!(shape::body(&reparsed.body), shape::body(&original.body), "{rendered}");
    }

    #[test]
    fn test_shares_repeated_literals() {
        assert_eq!(
            render("x = \"hello\"\ny = \"hello\" + 42\nz = function(v = \"hello\")\nend function"),
            "a=e\nb=e+42\nc=function(d=\"hello\")\nend function"
        );
    }

    #[test]
    fn test_bitwise_lowering() {
        assert_eq!(render("x = y << 2 | 1"), "a=bitwise(\"|\",bitwise(\"<<\",y,2),1)");
    }
}
