use std::collections::{HashMap, HashSet};

/// Hands out names that are unique within one scope. A taken name gets a
/// numeric suffix.
#[derive(Clone, Debug, Default)]
pub struct NameGenerator {
    /// Next suffix per prefix; -1 means the bare prefix is still free.
    counters: HashMap<String, i64>,
    taken: HashSet<String>,
}

impl NameGenerator {
    /// A generator that never returns any of `names`.
    pub fn with_prev_defined_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NameGenerator {
            counters: HashMap::new(),
            taken: names.into_iter().map(Into::into).collect(),
        }
    }

    /// A fresh name starting with `prefix`.
    /// ```
    /// # use tabula_utils::NameGenerator;
    /// let mut namegen = NameGenerator::default();
    /// assert_eq!(namegen.gen_name("seq"), "seq");
    /// assert_eq!(namegen.gen_name("seq"), "seq0");
    /// ```
    pub fn gen_name<S: Into<String>>(&mut self, prefix: S) -> String {
        let mut prefix: String = prefix.into();
        loop {
            let count = self
                .counters
                .entry(prefix.clone())
                .and_modify(|v| *v += 1)
                .or_insert(-1);
            let name = match *count {
                -1 => prefix.clone(),
                n => format!("{prefix}{n}"),
            };
            if self.taken.insert(name.clone()) {
                return name;
            }
            // `data0` may itself be taken; continue from it.
            prefix = name;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NameGenerator;

    #[test]
    fn skips_predefined() {
        let mut ng = NameGenerator::with_prev_defined_names(["data", "x0"]);
        assert_eq!(ng.gen_name("data"), "data0");
        assert_eq!(ng.gen_name("data"), "data1");
        assert_eq!(ng.gen_name("x"), "x");
        assert_eq!(ng.gen_name("x"), "x00");
    }
}
