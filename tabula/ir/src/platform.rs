//! Target platform descriptions.
//!
//! A platform is a list of definitions, each a condition and a value, both
//! kept as untyped S-expression trees. The delay table used by the
//! scheduler is read from definitions of the form
//! `(DEF (COND (CLASS add) (WIDTH 32)) (VALUE (DELAY 1200)))`.
use std::fmt;

pub const CLASS: &str = "CLASS";
pub const WIDTH: &str = "WIDTH";
pub const DELAY: &str = "DELAY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformNode {
    Atom(String),
    List(Vec<PlatformNode>),
}

impl PlatformNode {
    pub fn atom<S: ToString>(s: S) -> Self {
        PlatformNode::Atom(s.to_string())
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            PlatformNode::Atom(a) => Some(a),
            PlatformNode::List(_) => None,
        }
    }

    /// Children of a list node; empty for atoms.
    pub fn children(&self) -> &[PlatformNode] {
        match self {
            PlatformNode::Atom(_) => &[],
            PlatformNode::List(l) => l,
        }
    }

    /// The first atom of a list node.
    pub fn head(&self) -> Option<&str> {
        self.children().first().and_then(PlatformNode::as_atom)
    }

    /// Finds a `(key value)` child and returns `value`.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.children()
            .iter()
            .find(|c| c.head() == Some(key))
            .and_then(|c| c.children().get(1))
            .and_then(PlatformNode::as_atom)
    }
}

impl fmt::Display for PlatformNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformNode::Atom(a) => write!(f, "{a}"),
            PlatformNode::List(l) => {
                write!(f, "(")?;
                for (i, n) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{n}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    /// Contents of the `COND` form.
    pub condition: PlatformNode,
    /// Contents of the `VALUE` form.
    pub value: PlatformNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub name: String,
    pub definitions: Vec<Definition>,
}

impl Platform {
    pub fn new<S: ToString>(name: S) -> Self {
        Self {
            name: name.to_string(),
            definitions: Vec::new(),
        }
    }

    /// Delay of a `class` operation `width` bits wide. Among the
    /// definitions for the class, the narrowest one that covers `width`
    /// wins; a definition without a width covers everything.
    pub fn lookup_delay(&self, class: &str, width: u32) -> Option<i64> {
        self.definitions
            .iter()
            .filter(|d| d.condition.lookup(CLASS) == Some(class))
            .filter_map(|d| {
                let covers = match d.condition.lookup(WIDTH) {
                    Some(w) => w.parse::<u32>().ok().filter(|w| *w >= width),
                    None => Some(u32::MAX),
                };
                let delay = d.value.lookup(DELAY)?.parse::<i64>().ok()?;
                covers.map(|c| (c, delay))
            })
            .min_by_key(|(c, _)| *c)
            .map(|(_, delay)| delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(class: &str, width: Option<u32>, delay: i64) -> Definition {
        let mut cond = vec![PlatformNode::List(vec![
            PlatformNode::atom(CLASS),
            PlatformNode::atom(class),
        ])];
        if let Some(w) = width {
            cond.push(PlatformNode::List(vec![
                PlatformNode::atom(WIDTH),
                PlatformNode::atom(w),
            ]));
        }
        Definition {
            condition: PlatformNode::List(cond),
            value: PlatformNode::List(vec![PlatformNode::List(vec![
                PlatformNode::atom(DELAY),
                PlatformNode::atom(delay),
            ])]),
        }
    }

    #[test]
    fn narrowest_covering_definition() {
        let mut p = Platform::new("fpga");
        p.definitions.push(def("add", None, 5000));
        p.definitions.push(def("add", Some(32), 1200));
        p.definitions.push(def("add", Some(8), 300));
        assert_eq!(p.lookup_delay("add", 4), Some(300));
        assert_eq!(p.lookup_delay("add", 16), Some(1200));
        assert_eq!(p.lookup_delay("add", 64), Some(5000));
        assert_eq!(p.lookup_delay("mul", 8), None);
        assert_eq!(
            p.definitions[1].condition.to_string(),
            "((CLASS add) (WIDTH 32))"
        );
    }
}
