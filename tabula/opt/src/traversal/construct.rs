use super::Phase;
use itertools::Itertools;
use linked_hash_map::LinkedHashMap;
use tabula_ir as ir;
use tabula_utils::TabulaResult;

#[derive(Clone, Debug, PartialEq, Eq)]
/// The value returned from parsing an option.
pub enum ParseVal {
    /// A number option.
    Num(i64),
}

impl ParseVal {
    pub fn num(&self) -> i64 {
        match self {
            ParseVal::Num(n) => *n,
        }
    }

    /// The number if it is not negative.
    pub fn pos_num(&self) -> Option<u64> {
        let n = self.num();
        if n < 0 { None } else { Some(n as u64) }
    }
}

impl std::fmt::Display for ParseVal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseVal::Num(n) => write!(f, "{n}"),
        }
    }
}

/// Option that can be passed to a pass.
pub struct PassOpt {
    name: &'static str,
    description: &'static str,
    default: ParseVal,
    parse: fn(&str) -> Option<ParseVal>,
}

impl PassOpt {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        default: ParseVal,
        parse: fn(&str) -> Option<ParseVal>,
    ) -> Self {
        Self {
            name,
            description,
            default,
            parse,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn description(&self) -> &'static str {
        self.description
    }

    pub const fn default(&self) -> &ParseVal {
        &self.default
    }

    fn parse(&self, s: &str) -> Option<ParseVal> {
        (self.parse)(s)
    }

    /// Parse a number from a string.
    pub fn parse_num(s: &str) -> Option<ParseVal> {
        s.parse::<i64>().ok().map(ParseVal::Num)
    }
}

/// Trait that describes named things. Calling [`do_pass`](Phase::do_pass)
/// and [`do_pass_default`](Phase::do_pass_default) requires this to be
/// implemented.
///
/// This is separate from [`Phase`] because these methods don't receive
/// `self`, which would make trait objects impossible.
pub trait Named {
    /// The name of a pass. Is used for identifying passes.
    fn name() -> &'static str;
    /// A short description of the pass.
    fn description() -> &'static str;
    /// Options that can be passed to the pass with `-x pass:opt=val`.
    fn opts() -> Vec<PassOpt> {
        vec![]
    }
}

/// Constructs a pass from the design before any table is visited. Passes
/// that need no design-wide information get this from [Default].
pub trait ConstructPass {
    fn get_opts(design: &ir::Design) -> LinkedHashMap<&'static str, ParseVal>
    where
        Self: Named,
    {
        let opts = Self::opts();
        let n = Self::name();
        let mut values: LinkedHashMap<&'static str, ParseVal> = design
            .extra_opts
            .iter()
            .filter_map(|opt| {
                // pass:opt=val
                let (pass, rest) = opt.split_once(':')?;
                if pass != n {
                    return None;
                }
                let (name, value) = match rest.split_once('=') {
                    Some((name, value)) => (name, Some(value)),
                    None => (rest, None),
                };
                let Some(opt) = opts.iter().find(|o| o.name == name) else {
                    log::warn!("Ignoring unknown option for pass `{n}`: {name}");
                    return None;
                };
                let Some(v) = value else {
                    log::warn!("Ignoring option `{n}:{name}` given without a value");
                    return None;
                };
                let Some(val) = opt.parse(v) else {
                    log::warn!("Ignoring invalid value for option `{n}:{name}`: {v}");
                    return None;
                };
                Some((opt.name(), val))
            })
            .collect();

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Extra options for {}: {}",
                Self::name(),
                values.iter().map(|(o, v)| format!("{o}->{v}")).join(", ")
            );
        }

        for opt in opts {
            if !values.contains_key(opt.name()) {
                values.insert(opt.name(), opt.default.clone());
            }
        }

        values
    }

    /// Construct the pass using information from the design.
    fn from(_design: &ir::Design) -> TabulaResult<Self>
    where
        Self: Sized;

    /// Clear per-table data. Called after each table is visited.
    fn clear_data(&mut self);
}

impl<T: Default + Sized + Phase> ConstructPass for T {
    fn from(_design: &ir::Design) -> TabulaResult<Self> {
        Ok(T::default())
    }

    fn clear_data(&mut self) {
        *self = T::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counted;

    impl Named for Counted {
        fn name() -> &'static str {
            "counted"
        }
        fn description() -> &'static str {
            "test pass"
        }
        fn opts() -> Vec<PassOpt> {
            vec![
                PassOpt::new("width", "", ParseVal::Num(8), PassOpt::parse_num),
                PassOpt::new("limit", "", ParseVal::Num(-1), PassOpt::parse_num),
            ]
        }
    }

    impl Phase for Counted {
        fn apply_for_table(
            &mut self,
            _table: ir::TableIdx,
            _design: &mut ir::Design,
        ) -> TabulaResult<()> {
            Ok(())
        }
    }

    #[test]
    fn defaults_and_overrides() {
        let mut d = ir::Design::new();
        let opts = Counted::get_opts(&d);
        assert_eq!(opts["width"].pos_num(), Some(8));
        assert_eq!(opts["limit"].pos_num(), None);

        d.extra_opts = vec![
            "counted:width".to_string(),
            "counted:limit=300".to_string(),
            "counted:bogus=1".to_string(),
            "other:limit=2".to_string(),
        ];
        let opts = Counted::get_opts(&d);
        assert_eq!(opts["width"].num(), 8);
        assert_eq!(opts["limit"].num(), 300);
        assert_eq!(opts.len(), 2);
    }

    #[test]
    fn invalid_value_keeps_default() {
        let mut d = ir::Design::new();
        d.extra_opts = vec!["counted:limit=many".to_string()];
        assert_eq!(Counted::get_opts(&d)["limit"], ParseVal::Num(-1));
    }
}
