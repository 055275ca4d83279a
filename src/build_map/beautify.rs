//! Readable output: indentation, spacing and the source's trailing
//! comments put back on their statements.

use super::{BuildMap, DefaultMap, RenderData, Transformer};
use crate::error::BuildError;
use crate::model::{BuildOptions, IndentationType};
use crate::processor::ast::*;

/// Calls with more arguments than this are split over several lines.
const MAX_INLINE_ARGS: usize = 3;
/// `and`/`or` chains with more operands than this are split too.
const MAX_INLINE_CHAIN: usize = 3;

#[derive(Debug, Clone)]
pub struct BeautifyMap {
    base: DefaultMap,
    indent_unit: String,
    keep_parentheses: bool,
    dev_mode: bool,
}

impl BeautifyMap {
    pub fn new(options: &BuildOptions) -> Self {
        let indent_unit = match options.indentation {
            IndentationType::Tab => "\t".to_string(),
            IndentationType::Whitespace => " ".repeat(options.indentation_spaces),
        };
        Self {
            base: DefaultMap,
            indent_unit,
            keep_parentheses: options.keep_parentheses,
            dev_mode: options.is_dev_mode,
        }
    }

    fn call(&self, t: &Transformer<'_>, callee: &Expr, args: &[Expr], data: RenderData) -> Result<String, BuildError> {
        let callee = t.operand(callee, PREC_POSTFIX, data)?;
        // single-line text renders the same at any depth
        let args = t.nested(|t| {
            args.iter()
                .map(|a| t.expr(a, data))
                .collect::<Result<Vec<_>, BuildError>>()
        })?;
        if args.len() <= MAX_INLINE_ARGS && !args.iter().any(|a| a.contains('\n')) {
            return Ok(format!("{callee}({})", args.join(", ")));
        }
        let lb = t.nested(|t| t.line_break());
        Ok(format!("{callee}({lb}{})", args.join(&format!(",{lb}"))))
    }

    /// Operands of a left-nested chain of the same logical operator.
    fn chain<'e>(op: BinaryOp, expr: &'e Expr, out: &mut Vec<&'e Expr>) {
        match expr {
            Expr::Binary { op: inner, left, right } if *inner == op => {
                Self::chain(op, left, out);
                out.push(right);
            }
            other => out.push(other),
        }
    }

    fn logical_chain(
        &self,
        t: &Transformer<'_>,
        op: BinaryOp,
        expr: &Expr,
        data: RenderData,
    ) -> Result<Option<String>, BuildError> {
        let mut operands = Vec::new();
        Self::chain(op, expr, &mut operands);
        if operands.len() <= MAX_INLINE_CHAIN {
            return Ok(None);
        }

        let mut rendered = Vec::with_capacity(operands.len());
        for (i, operand) in operands.iter().enumerate() {
            let min = if i == 0 { op.precedence() } else { op.precedence() + 1 };
            rendered.push(t.operand(operand, min, data)?);
        }
        let lb = t.nested(|t| t.line_break());
        Ok(Some(rendered.join(&format!(" {}{lb}", op.symbol()))))
    }

    /// `a += b` for `a = a + b`, dev mode only.
    fn shorthand(&self, t: &Transformer<'_>, variable: &Expr, init: &Expr) -> Result<Option<String>, BuildError> {
        let Expr::Binary { op, left, right } = init else {
            return Ok(None);
        };
        let compound = matches!(
            op,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Pow
        );
        if !compound || left.as_ref() != variable {
            return Ok(None);
        }
        let right = match right.as_ref() {
            Expr::Paren(inner) => inner.as_ref(),
            other => other,
        };
        let none = RenderData::default();
        Ok(Some(format!(
            "{} {}= {}",
            t.expr(variable, none)?,
            op.symbol(),
            t.expr(right, none)?
        )))
    }

    fn attach_comments(t: &Transformer<'_>, range: Range, text: String) -> String {
        let comments = t.take_comments(range);
        if comments.is_empty() {
            return text;
        }

        let (first, rest): (Vec<_>, Vec<_>) = comments
            .into_iter()
            .partition(|c| c.line == range.start.line);
        let render = |comments: &[Comment]| {
            comments
                .iter()
                .map(|c| format!("//{}", c.text))
                .collect::<Vec<_>>()
                .join(" ")
        };

        if text.is_empty() {
            let all: Vec<Comment> = first.into_iter().chain(rest).collect();
            return render(&all);
        }

        let mut out = match (first.is_empty(), text.split_once('\n')) {
            (false, Some((head, tail))) => format!("{head} {}\n{tail}", render(&first)),
            (false, None) => format!("{text} {}", render(&first)),
            (true, _) => text,
        };
        if !rest.is_empty() {
            out.push(' ');
            out.push_str(&render(&rest));
        }
        out
    }
}

impl BuildMap for BeautifyMap {
    fn expr(&self, t: &Transformer<'_>, expr: &Expr, data: RenderData) -> Result<String, BuildError> {
        match expr {
            Expr::Call { callee, args } => self.call(t, callee, args, data),
            Expr::Binary { op, .. } if op.is_logical() => match self.logical_chain(t, *op, expr, data)? {
                Some(text) => Ok(text),
                None => self.base.expr(t, expr, data),
            },
            _ => self.base.expr(t, expr, data),
        }
    }

    fn stmt(&self, t: &Transformer<'_>, stmt: &Stmt) -> Result<String, BuildError> {
        let text = match &stmt.kind {
            StmtKind::Assignment { variable, init } if self.dev_mode => {
                match self.shorthand(t, variable, init)? {
                    Some(text) => text,
                    None => self.base.stmt(t, stmt)?,
                }
            }
            _ => self.base.stmt(t, stmt)?,
        };
        Ok(Self::attach_comments(t, stmt.range, text))
    }

    fn indent(&self, depth: usize) -> String {
        self.indent_unit.repeat(depth)
    }

    fn strips_parens(&self) -> bool {
        !self.keep_parentheses
    }

    fn separator(&self) -> &'static str {
        ", "
    }

    fn assignment(&self, variable: &str, init: &str) -> String {
        format!("{variable} = {init}")
    }

    fn key_value(&self, key: &str, value: &str) -> String {
        format!("{key}: {value}")
    }

    fn binary_operator(&self, op: BinaryOp, left: &str, right: &str) -> String {
        format!("{left} {} {right}", op.symbol())
    }
}

#[cfg(test)]
mod tests {
    use crate::build_map::{BeautifyMap, Transformer};
    use crate::model::{BuildOptions, CompileOptions, IndentationType};
    use crate::processor::ast::shape;
    use crate::processor::context::{ContextOptions, SymbolContext};
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

    fn render_with(src: &str, build_options: BuildOptions) -> String {
        let chunk = parse(src, "pretty.src").expect("parses");
        let context = SymbolContext::new(ContextOptions::default());
        let options = CompileOptions {
            build_options,
            ..CompileOptions::default()
        };
        let map = BeautifyMap::new(&options.build_options);
        let t = Transformer::new(Box::new(map), &context, None, &options);
        t.transform(&chunk, None).expect("renders")
    }

    fn spaces() -> BuildOptions {
        BuildOptions {
            indentation: IndentationType::Whitespace,
            indentation_spaces: 2,
            ..BuildOptions::default()
        }
    }

    #[test]
    fn test_indentation_and_spacing() {
        let src = "f=function(a,b)\nif a>b then\nreturn {\"k\":a}\nelse\nwhile b\nb-=1\nend while\nend if\nend function";
        assert_eq!(
            render_with(src, spaces()),
            "f = function(a, b)\n  if a > b then\n    return {\"k\": a}\n  else\n    while b\n      b = b - 1\n    end while\n  end if\nend function"
        );
    }

    #[test]
    fn test_tab_indentation() {
        assert_eq!(
            render_with("for i in x\nprint i\nend for", BuildOptions::default()),
            "for i in x\n\tprint(i)\nend for"
        );
    }

    #[test]
    fn test_trailing_comments_reattached_once() {
        let src = "x = 1 // one\nif x then // head\n  y = 2 // two\nend if // tail\n// own line\nz = 3";
        assert_eq!(
            render_with(src, spaces()),
            "x = 1 // one\nif x then // head\n  y = 2 // two\nend if // tail\n// own line\nz = 3"
        );
    }

    #[test]
    fn test_long_calls_and_chains_break() {
        let src = "f(1, 2, 3, 4)\nok = a and b and c and d\ng(1, 2)";
        assert_eq!(
            render_with(src, spaces()),
            "f(\n  1,\n  2,\n  3,\n  4)\nok = a and\n  b and\n  c and\n  d\ng(1, 2)"
        );
    }

    #[test]
    fn test_function_argument_breaks_call() {
        let src = "map(function(x)\nreturn x\nend function)";
        assert_eq!(
            render_with(src, spaces()),
            "map(\n  function(x)\n    return x\n  end function)"
        );
    }

    #[test]
    fn test_multiline_argument_breaks_call() {
        let src = "print(f(1, 2, 3, 4))\nshow(a and b and c and d, 1)";
        assert_eq!(
            render_with(src, spaces()),
            "print(\n  f(\n    1,\n    2,\n    3,\n    4))\nshow(\n  a and\n    b and\n    c and\n    d,\n  1)"
        );
    }

    #[test]
    fn test_parentheses() {
        let src = "x = (a + b) * (c)";
        assert_eq!(render_with(src, spaces()), "x = (a + b) * c");
        let keep = BuildOptions {
            keep_parentheses: true,
            ..spaces()
        };
        assert_eq!(render_with(src, keep), "x = (a + b) * (c)");
    }

    #[test]
    fn test_keeps_grouped_comparisons() {
        let src = "x = (m < n) == (o < p)\ny = (p == q) == r\nz = m < n < o";
        assert_eq!(render_with(src, spaces()), src);
    }

    #[test]
    fn test_output_parses_to_the_same_tree() {
        let original = parse(ROUND_TRIP, "pretty.src").expect("parses");
        for options in [spaces(), BuildOptions::default()] {
            let rendered = render_with(ROUND_TRIP, options);
            let reparsed = parse(&rendered, "pretty.src").expect("output parses");
            assert_eq!(shape::body(&reparsed.body), shape::body(&original.body), "{rendered}");
        }
    }

    #[test]
    fn test_dev_mode_echoes_directives() {
        let dev = BuildOptions {
            is_dev_mode: true,
            ..spaces()
        };
        let src = "x += 1\ny = y * (2 + z)\nv = #envar HOME\ndebugger\n#ifdef DEBUG\nprint x\n#endif";
        assert_eq!(
            render_with(src, dev),
            "x += 1\ny *= 2 + z\nv = #envar HOME\ndebugger\n#ifdef DEBUG\nprint(x)\n#endif"
        );
    }
}
