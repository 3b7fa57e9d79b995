//! Parser for the S-expression exchange format.
use crate::exp::{Exp, ExpKind};
use pest_consume::{Error, Parser, match_nodes};
use std::fs;
use std::io::Read;
use std::path::Path;
use tabula_utils::{self, TabulaResult};

type ParseResult<T> = Result<T, Error<Rule>>;
type Node<'i> = pest_consume::Node<'i, Rule, ()>;

// include the grammar file so that Cargo knows to rebuild this file on grammar changes
const _GRAMMAR: &str = include_str!("exp.pest");

#[derive(Parser)]
#[grammar = "exp.pest"]
pub struct ExpParser;

impl ExpParser {
    /// Parse a file into its top level expressions.
    pub fn parse_file(path: &Path) -> TabulaResult<Vec<Exp>> {
        let time = std::time::Instant::now();
        let content = fs::read_to_string(path).map_err(|err| {
            tabula_utils::Error::invalid_file(format!(
                "Failed to read {}: {err}",
                path.to_string_lossy(),
            ))
        })?;
        let out = Self::parse_str(&content, &path.to_string_lossy())?;
        log::info!(
            "Parsed `{}` in {}ms",
            path.to_string_lossy(),
            time.elapsed().as_millis()
        );
        Ok(out)
    }

    /// Parse everything `r` produces.
    pub fn parse_reader<R: Read>(mut r: R) -> TabulaResult<Vec<Exp>> {
        let mut buf = String::new();
        r.read_to_string(&mut buf).map_err(|err| {
            tabula_utils::Error::invalid_file(format!(
                "Failed to parse buffer: {err}",
            ))
        })?;
        Self::parse_str(&buf, "<stdin>")
    }

    /// Parse `content`; `name` is used in error messages.
    pub fn parse_str(content: &str, name: &str) -> TabulaResult<Vec<Exp>> {
        let fail = |e: Error<Rule>| {
            tabula_utils::Error::parse_error(format!(
                "Failed to parse `{name}`: {}",
                e.with_path(name)
            ))
        };
        let inputs = <ExpParser as Parser>::parse(Rule::file, content).map_err(fail)?;
        let input = inputs.single().map_err(fail)?;
        ExpParser::file(input).map_err(fail)
    }

    fn line(input: &Node) -> usize {
        input.as_span().start_pos().line_col().0
    }
}

#[pest_consume::parser]
impl ExpParser {
    fn EOI(_input: Node) -> ParseResult<()> {
        Ok(())
    }

    fn atom(input: Node) -> ParseResult<Exp> {
        Ok(Exp::new(
            ExpKind::Atom(input.as_str().to_string()),
            Self::line(&input),
        ))
    }

    fn string_inner(input: Node) -> ParseResult<String> {
        let mut out = String::new();
        let mut chars = input.as_str().chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(other) => out.push(other),
                    None => return Err(input.error("dangling escape")),
                },
                c => out.push(c),
            }
        }
        Ok(out)
    }

    fn string(input: Node) -> ParseResult<Exp> {
        let line = Self::line(&input);
        Ok(match_nodes!(
            input.into_children();
            [string_inner(s)] => Exp::new(ExpKind::Str(s), line),
        ))
    }

    fn list(input: Node) -> ParseResult<Exp> {
        let line = Self::line(&input);
        Ok(match_nodes!(
            input.into_children();
            [exp(items)..] => Exp::new(ExpKind::List(items.collect()), line),
        ))
    }

    fn exp(input: Node) -> ParseResult<Exp> {
        Ok(match_nodes!(
            input.into_children();
            [list(e)] => e,
            [string(e)] => e,
            [atom(e)] => e,
        ))
    }

    fn file(input: Node) -> ParseResult<Vec<Exp>> {
        Ok(match_nodes!(
            input.into_children();
            [exp(items).., EOI(_)] => items.collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_lists() {
        let exps = ExpParser::parse_str(
            "(MODULE 1 top ; comment\n  (PARAMS (A \"x y\")))\n(X)",
            "test",
        )
        .unwrap();
        assert_eq!(exps.len(), 2);
        let m = &exps[0];
        assert_eq!(m.head(), Some("MODULE"));
        assert_eq!(m.items()[2].atom(), Some("top"));
        let params = &m.items()[3];
        assert_eq!(params.line, 2);
        assert_eq!(params.items()[1].items()[1].atom(), Some("x y"));
        assert_eq!(exps[1].head(), Some("X"));
    }

    #[test]
    fn escapes() {
        let exps = ExpParser::parse_str(r#"("a\"b\\c")"#, "test").unwrap();
        assert_eq!(exps[0].items()[0].atom(), Some("a\"b\\c"));
        assert!(exps[0].items()[0].is_string());
    }

    #[test]
    fn from_reader() {
        let src: &[u8] = b"(MODULE 1 top)\n(MODULE 2 sub)";
        let exps = ExpParser::parse_reader(src).unwrap();
        assert_eq!(exps.len(), 2);
        assert_eq!(exps[1].line, 2);
    }

    #[test]
    fn unbalanced() {
        let err = ExpParser::parse_str("(MODULE 1 top", "bad.tab").unwrap_err();
        assert!(matches!(err, tabula_utils::Error::Parse(_)));
        assert!(err.to_string().contains("bad.tab"));
    }
}
