//! Untyped S-expression tree produced by the parser.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpKind {
    Atom(String),
    /// A double quoted string, escapes resolved.
    Str(String),
    List(Vec<Exp>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exp {
    pub kind: ExpKind,
    /// Line the expression starts on.
    pub line: usize,
}

impl Exp {
    pub fn new(kind: ExpKind, line: usize) -> Self {
        Self { kind, line }
    }

    /// Text of an atom or string.
    pub fn atom(&self) -> Option<&str> {
        match &self.kind {
            ExpKind::Atom(s) | ExpKind::Str(s) => Some(s),
            ExpKind::List(_) => None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self.kind, ExpKind::Str(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, ExpKind::List(_))
    }

    /// Elements of a list; empty for atoms.
    pub fn items(&self) -> &[Exp] {
        match &self.kind {
            ExpKind::List(items) => items,
            _ => &[],
        }
    }

    /// The leading atom of a list, e.g. `MODULE` in `(MODULE 1 top)`.
    pub fn head(&self) -> Option<&str> {
        match &self.kind {
            ExpKind::List(items) => match items.first().map(|e| &e.kind) {
                Some(ExpKind::Atom(a)) => Some(a),
                _ => None,
            },
            _ => None,
        }
    }

    /// Short rendering for error messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            ExpKind::Atom(a) => format!("`{a}'"),
            ExpKind::Str(s) => format!("\"{s}\""),
            ExpKind::List(_) => match self.head() {
                Some(h) => format!("({h} ...)"),
                None => "list".to_string(),
            },
        }
    }
}
