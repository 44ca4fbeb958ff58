//! RcDoc-based pretty-printer with termcolor annotations for [`Term`]s.
//!
//! The same [`Style`] annotations and render helpers are reused by goal
//! printers downstream so every rendered goal shares one color scheme.
use std::io::{self, Write};

use pretty::{FmtWrite, RcDoc, RenderAnnotated};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::{
    term::{BinaryOp, Term, UnaryOp},
    value::Value,
};

/// Styles used to annotate parts of the pretty-printed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Punct,
    /// Parentheses are colored by nesting depth so matching pairs share a color.
    Paren(u8),
    Keyword,
    Operator,
    Ident,
    Literal,
    /// Tags that must stand out, e.g. an assumed (unproved) goal.
    Alert,
}

impl Style {
    fn to_color_spec(self) -> ColorSpec {
        let mut s = ColorSpec::new();
        match self {
            Style::Punct => {
                s.set_dimmed(true);
            }
            Style::Paren(depth) => {
                let fg = match depth % 6 {
                    0 => Color::Blue,
                    1 => Color::Green,
                    2 => Color::White,
                    3 => Color::Yellow,
                    4 => Color::Red,
                    _ => Color::Magenta,
                };
                s.set_fg(Some(fg)).set_dimmed(true);
            }
            Style::Keyword => {
                s.set_fg(Some(Color::Cyan)).set_bold(true);
            }
            Style::Operator => {
                s.set_fg(Some(Color::Yellow)).set_bold(true);
            }
            Style::Ident => {
                s.set_fg(Some(Color::Green)).set_bold(true);
            }
            Style::Literal => {
                s.set_fg(Some(Color::Magenta));
            }
            Style::Alert => {
                s.set_fg(Some(Color::Red)).set_bold(true);
            }
        }
        s
    }
}

pub fn styled(style: Style, s: impl Into<String>) -> RcDoc<'static, Style> {
    RcDoc::as_string(s.into()).annotate(style)
}

pub fn punct(s: &'static str) -> RcDoc<'static, Style> {
    styled(Style::Punct, s)
}

pub fn kw(s: &'static str) -> RcDoc<'static, Style> {
    styled(Style::Keyword, s)
}

fn op(s: &'static str) -> RcDoc<'static, Style> {
    styled(Style::Operator, s)
}

#[inline]
fn lparen(depth: u8) -> RcDoc<'static, Style> {
    RcDoc::as_string("(").annotate(Style::Paren(depth))
}

#[inline]
fn rparen(depth: u8) -> RcDoc<'static, Style> {
    RcDoc::as_string(")").annotate(Style::Paren(depth))
}

fn precedence(term: &Term) -> u8 {
    match term {
        Term::Ite { .. } => 1,
        Term::Binary { op, .. } => match op {
            BinaryOp::Implies => 2,
            BinaryOp::Or => 3,
            BinaryOp::Xor => 4,
            BinaryOp::And => 5,
            BinaryOp::Eq | BinaryOp::Ne => 6,
            BinaryOp::Ult | BinaryOp::Ule | BinaryOp::Slt | BinaryOp::Sle => 7,
            BinaryOp::Shl | BinaryOp::LShr => 8,
            BinaryOp::Add | BinaryOp::Sub => 9,
            BinaryOp::Mul | BinaryOp::UDiv | BinaryOp::URem => 10,
        },
        Term::Unary { .. } => 11,
        Term::Extract { .. } => 12,
        Term::Const(_) | Term::Var(_) | Term::Aggregate { .. } => u8::MAX,
    }
}

fn is_associative(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::Add | BinaryOp::Mul | BinaryOp::And | BinaryOp::Or | BinaryOp::Xor
    )
}

fn requires_parens(child: &Term, parent: &Term) -> bool {
    let (cp, pp) = (precedence(child), precedence(parent));
    if cp != pp {
        return cp < pp;
    }
    match (child, parent) {
        (Term::Binary { op: a, .. }, Term::Binary { op: b, .. }) => !(a == b && is_associative(*a)),
        _ => false,
    }
}

fn child_doc(child: &Term, parent: &Term, depth: u8) -> RcDoc<'static, Style> {
    if requires_parens(child, parent) {
        lparen(depth)
            .append(to_doc_with_depth(child, depth + 1))
            .append(rparen(depth))
            .group()
    } else {
        to_doc_with_depth(child, depth)
    }
}

fn value_doc(value: &Value) -> RcDoc<'static, Style> {
    match value {
        Value::Int(int) if int.ty().is_bool() => {
            kw(if int.is_true() { "true" } else { "false" })
        }
        _ => styled(Style::Literal, value.to_string()),
    }
}

fn list_doc(
    open: &'static str,
    close: &'static str,
    items: impl Iterator<Item = RcDoc<'static, Style>>,
) -> RcDoc<'static, Style> {
    punct(open)
        .append(RcDoc::intersperse(items, punct(",").append(RcDoc::line())).nest(1))
        .append(punct(close))
        .group()
}

fn to_doc_with_depth(term: &Term, depth: u8) -> RcDoc<'static, Style> {
    match term {
        Term::Const(value) => value_doc(value),
        Term::Var(symbol) => styled(Style::Ident, symbol.name().to_string()),
        Term::Unary { op: unary, arg } => {
            let symbol = match unary {
                UnaryOp::Not => "!",
                UnaryOp::Neg => "-",
            };
            op(symbol).append(child_doc(arg, term, depth)).group()
        }
        Term::Binary { op: binary, lhs, rhs } => child_doc(lhs, term, depth)
            .append(RcDoc::space())
            .append(op(binary.symbol()))
            .append(RcDoc::line())
            .append(child_doc(rhs, term, depth))
            .group(),
        Term::Ite {
            cond,
            then,
            otherwise,
        } => kw("if")
            .append(RcDoc::space())
            .append(child_doc(cond, term, depth))
            .append(RcDoc::line())
            .append(kw("then"))
            .append(RcDoc::space())
            .append(child_doc(then, term, depth))
            .append(RcDoc::line())
            .append(kw("else"))
            .append(RcDoc::space())
            .append(child_doc(otherwise, term, depth))
            .group()
            .nest(2),
        Term::Aggregate { ty, elements } => {
            let items = elements.iter().map(|e| to_doc_with_depth(e, depth));
            if ty.is_array() {
                list_doc("[", "]", items)
            } else {
                list_doc("{ ", " }", items)
            }
        }
        Term::Extract { aggregate, index } => child_doc(aggregate, term, depth)
            .append(punct("."))
            .append(styled(Style::Literal, index.to_string())),
    }
}

// A writer that maps Style annotations to termcolor ColorSpec on a WriteColor sink.
struct ColorWriter<'w, W: WriteColor + Write> {
    out: &'w mut W,
}

impl<'a, 'w, W: WriteColor + Write> RenderAnnotated<'a, Style> for ColorWriter<'w, W> {
    fn push_annotation(&mut self, ann: &'a Style) -> io::Result<()> {
        self.out.set_color(&ann.to_color_spec())
    }
    fn pop_annotation(&mut self) -> io::Result<()> {
        self.out.reset()
    }
}

impl<'w, W: WriteColor + Write> pretty::Render for ColorWriter<'w, W> {
    type Error = io::Error;
    fn write_str(&mut self, s: &str) -> io::Result<usize> {
        self.out.write_all(s.as_bytes())?;
        Ok(s.len())
    }
    fn write_str_all(&mut self, s: &str) -> io::Result<()> {
        self.out.write_all(s.as_bytes())
    }
    fn fail_doc(&self) -> Self::Error {
        io::Error::other("render failed")
    }
}

/// Render a document to a `termcolor::WriteColor` with width-aware layout.
pub fn render_to<W: WriteColor + Write>(
    doc: &RcDoc<'_, Style>,
    width: usize,
    out: &mut W,
) -> io::Result<()> {
    let mut cw = ColorWriter { out };
    doc.render_raw(width, &mut cw)
}

/// Format a document into a plain string (no colors).
pub fn render_plain(doc: &RcDoc<'_, Style>, width: usize) -> String {
    let mut buf = String::new();
    let _ = doc.render_fmt(width, &mut buf);
    buf
}

/// Print a document to stdout with colors if supported.
pub fn print_colored(doc: &RcDoc<'_, Style>) -> io::Result<()> {
    let stdout = StandardStream::stdout(ColorChoice::Auto);
    let mut stdout = stdout.lock();
    render_to(doc, terminal_width(), &mut stdout)?;
    writeln!(stdout)
}

/// Width of the terminal, or 80 if it cannot be determined.
pub fn terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Pretty-printing conveniences for terms.
pub trait PrettyTerm {
    /// Build an RcDoc representation with style annotations.
    fn pretty_doc(&self) -> RcDoc<'static, Style>;

    /// Render with colors to any termcolor writer at the given width.
    fn pretty_render_to<W: WriteColor + Write>(&self, width: usize, out: &mut W) -> io::Result<()> {
        render_to(&self.pretty_doc(), width, out)
    }

    /// Format into a plain string (no colors) at width 80.
    fn pretty_string(&self) -> String {
        render_plain(&self.pretty_doc(), 80)
    }
}

impl PrettyTerm for Term {
    fn pretty_doc(&self) -> RcDoc<'static, Style> {
        to_doc_with_depth(self, 0)
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut w = FmtWrite::new(f);
        self.pretty_doc().render_raw(80, &mut w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        term::{SymbolId, SymbolicValue},
        types::{IType, TypeDescriptor},
    };

    fn var(id: u32, name: &str) -> Term {
        SymbolicValue::new(SymbolId(id), name, TypeDescriptor::I32).term()
    }

    #[test]
    fn infix_with_minimal_parens() {
        let t = (var(0, "x") + var(1, "y")) * Term::int(IType::I32, 2);
        assert_eq!(t.to_string(), "(x + y) * 2");

        let t = var(0, "x") + var(1, "y") + Term::int(IType::I32, 1);
        assert_eq!(t.to_string(), "x + y + 1");
    }

    #[test]
    fn booleans_and_comparisons() {
        let t = var(0, "x").ult(var(1, "y")).implies(Term::bool(true));
        assert_eq!(t.pretty_string(), "x <u y ==> true");
    }

    #[test]
    fn aggregates_and_extracts() {
        let arr = Term::array(
            TypeDescriptor::I8,
            vec![Term::int(IType::I8, 1), Term::int(IType::I8, 2)],
        );
        assert_eq!(arr.to_string(), "[1, 2]");
        assert_eq!(arr.extract(1).to_string(), "[1, 2].1");
    }

    #[test]
    fn colored_render_writes_plain_text_into_no_color_buffer() {
        let mut buf = termcolor::NoColor::new(Vec::new());
        var(0, "x").equals(var(0, "x")).pretty_render_to(80, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf.into_inner()).unwrap(), "x == x");
    }
}
