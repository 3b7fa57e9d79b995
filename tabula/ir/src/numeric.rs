//! Fixed width integer values.
//!
//! Values are kept as unsigned words in two's complement, masked to the
//! width of their type. A type wider than 64 bits is *wide* and spans up to
//! [WORDS] words.
use std::cmp::Ordering;
use std::fmt;

/// Number of 64 bit words backing a value.
pub const WORDS: usize = 8;
/// Widest representable value.
pub const MAX_WIDTH: u32 = 64 * WORDS as u32;

/// Type of a value: signedness and width. A width of 0 denotes a scalar
/// (one bit wide, declared without a range).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NumericWidth {
    is_signed: bool,
    width: u32,
}

impl NumericWidth {
    pub fn new(is_signed: bool, width: u32) -> Self {
        Self { is_signed, width }
    }

    pub fn unsigned(width: u32) -> Self {
        Self::new(false, width)
    }

    pub fn signed(width: u32) -> Self {
        Self::new(true, width)
    }

    pub fn is_signed(&self) -> bool {
        self.is_signed
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of bits the value occupies.
    pub fn bit_width(&self) -> u32 {
        self.width.max(1)
    }

    pub fn is_wide(&self) -> bool {
        self.width > 64
    }

    /// Mask for the lowest word.
    pub fn mask(&self) -> u64 {
        let w = self.bit_width();
        if w >= 64 { u64::MAX } else { (1u64 << w) - 1 }
    }

    /// Type able to hold results of an operation on `a` and `b`.
    pub fn common_width(a: NumericWidth, b: NumericWidth) -> NumericWidth {
        NumericWidth::new(a.is_signed || b.is_signed, a.width.max(b.width))
    }
}

impl fmt::Display for NumericWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_signed { "int" } else { "uint" };
        write!(f, "{kind}{}", self.width)
    }
}

/// A value together with its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Numeric {
    ty: NumericWidth,
    words: [u64; WORDS],
}

impl Numeric {
    /// The zero value of `ty`.
    pub fn zero(ty: NumericWidth) -> Self {
        Self {
            ty,
            words: [0; WORDS],
        }
    }

    pub fn from_u64(v: u64, ty: NumericWidth) -> Self {
        let mut n = Self::zero(ty);
        n.words[0] = v;
        fixup_width(ty, &n)
    }

    /// Two's complement of `v` truncated to `ty`. Wide types are sign
    /// extended.
    pub fn from_i64(v: i64, ty: NumericWidth) -> Self {
        let mut n = Self::zero(ty);
        n.words[0] = v as u64;
        if v < 0 {
            for w in n.words.iter_mut().skip(1) {
                *w = u64::MAX;
            }
        }
        fixup_width(ty, &n)
    }

    /// Parses a decimal (optionally negative) or `0x` prefixed hexadecimal
    /// literal into a value of type `ty`.
    pub fn parse(text: &str, ty: NumericWidth) -> Option<Self> {
        if let Some(hex) = text.strip_prefix("0x") {
            if hex.is_empty() || hex.len() > WORDS * 16 {
                return None;
            }
            let mut n = Self::zero(ty);
            let digits = hex.as_bytes();
            for (i, chunk) in digits.rchunks(16).enumerate() {
                let s = std::str::from_utf8(chunk).ok()?;
                n.words[i] = u64::from_str_radix(s, 16).ok()?;
            }
            Some(fixup_width(ty, &n))
        } else if text.starts_with('-') {
            text.parse::<i64>().ok().map(|v| Self::from_i64(v, ty))
        } else {
            text.parse::<u64>().ok().map(|v| Self::from_u64(v, ty))
        }
    }

    pub fn ty(&self) -> NumericWidth {
        self.ty
    }

    pub fn words(&self) -> &[u64; WORDS] {
        &self.words
    }

    /// The lowest word.
    pub fn value0(&self) -> u64 {
        self.words[0]
    }

    pub fn set_word(&mut self, idx: usize, v: u64) {
        self.words[idx] = v;
    }

    /// Zeroes every word, keeping the type.
    pub fn clear(&mut self) {
        self.words = [0; WORDS];
    }

    pub fn is_zero(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Sign extended value of a narrow number.
    pub fn as_i64(&self) -> i64 {
        let w = self.ty.bit_width();
        let v = self.words[0];
        if !self.ty.is_signed() || w >= 64 {
            return v as i64;
        }
        let shift = 64 - w;
        ((v << shift) as i64) >> shift
    }

    fn is_negative(&self) -> bool {
        if !self.ty.is_signed() {
            return false;
        }
        let top = self.ty.bit_width() - 1;
        (self.words[(top / 64) as usize] >> (top % 64)) & 1 == 1
    }

    /// Textual form: decimal for narrow values, hexadecimal words for wide
    /// ones.
    pub fn format(&self) -> String {
        if !self.ty.is_wide() {
            if self.ty.is_signed() {
                return self.as_i64().to_string();
            }
            return self.words[0].to_string();
        }
        let used = self.ty.bit_width().div_ceil(64) as usize;
        let top = (0..used)
            .rev()
            .find(|i| self.words[*i] != 0)
            .unwrap_or(0);
        let mut s = format!("0x{:x}", self.words[top]);
        for i in (0..top).rev() {
            s.push_str(&format!("{:016x}", self.words[i]));
        }
        s
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// Arithmetic and bitwise binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Gt,
    Eq,
}

/// Constant holding `v` in the narrowest type that fits it.
pub fn make_const(v: i64) -> Numeric {
    Numeric::from_i64(v, value_width(v))
}

/// Narrowest type holding `v`. Negative values get a sign bit.
pub fn value_width(v: i64) -> NumericWidth {
    if v < 0 {
        let mag = (v as i128).unsigned_abs() as u64;
        let mut w = 1;
        while w < 64 && (1u64 << (w - 1)) < mag {
            w += 1;
        }
        NumericWidth::signed(w.max(2))
    } else {
        let mut w = 0;
        let mut x = v as u64;
        while x > 0 {
            x >>= 1;
            w += 1;
        }
        NumericWidth::unsigned(w.max(1))
    }
}

/// Clears all bits above the width of `ty` and retypes `n` as `ty`.
pub fn fixup_width(ty: NumericWidth, n: &Numeric) -> Numeric {
    let bits = ty.bit_width();
    let mut res = *n;
    res.ty = ty;
    for (i, w) in res.words.iter_mut().enumerate() {
        let lo = i as u32 * 64;
        if lo >= bits {
            *w = 0;
        } else if bits - lo < 64 {
            *w &= (1u64 << (bits - lo)) - 1;
        }
    }
    res
}

fn add_words(x: &[u64; WORDS], y: &[u64; WORDS]) -> [u64; WORDS] {
    let mut out = [0; WORDS];
    let mut carry = false;
    for i in 0..WORDS {
        let (s, c1) = x[i].overflowing_add(y[i]);
        let (s, c2) = s.overflowing_add(carry as u64);
        out[i] = s;
        carry = c1 || c2;
    }
    out
}

fn negate_words(x: &[u64; WORDS]) -> [u64; WORDS] {
    let mut inv = [0; WORDS];
    for i in 0..WORDS {
        inv[i] = !x[i];
    }
    let mut one = [0; WORDS];
    one[0] = 1;
    add_words(&inv, &one)
}

fn mul_words(x: &[u64; WORDS], y: &[u64; WORDS]) -> [u64; WORDS] {
    let mut out = [0u64; WORDS];
    for i in 0..WORDS {
        if x[i] == 0 {
            continue;
        }
        let mut carry: u128 = 0;
        for j in 0..(WORDS - i) {
            let cur = out[i + j] as u128 + (x[i] as u128) * (y[j] as u128) + carry;
            out[i + j] = cur as u64;
            carry = cur >> 64;
        }
    }
    out
}

fn sign_extend(n: &Numeric) -> [u64; WORDS] {
    let mut words = n.words;
    if n.is_negative() {
        let bits = n.ty.bit_width();
        for (i, w) in words.iter_mut().enumerate() {
            let lo = i as u32 * 64;
            if lo >= bits {
                *w = u64::MAX;
            } else if bits - lo < 64 {
                *w |= !((1u64 << (bits - lo)) - 1);
            }
        }
    }
    words
}

pub fn add(x: &Numeric, y: &Numeric) -> Numeric {
    calc_bin_op(BinOp::Add, x, y)
}

pub fn sub(x: &Numeric, y: &Numeric) -> Numeric {
    calc_bin_op(BinOp::Sub, x, y)
}

pub fn mul(x: &Numeric, y: &Numeric) -> Numeric {
    calc_bin_op(BinOp::Mul, x, y)
}

/// Applies `op`; the result takes the common width of the operands.
pub fn calc_bin_op(op: BinOp, x: &Numeric, y: &Numeric) -> Numeric {
    let ty = NumericWidth::common_width(x.ty, y.ty);
    let (a, b) = (sign_extend(x), sign_extend(y));
    let words = match op {
        BinOp::Add => add_words(&a, &b),
        BinOp::Sub => add_words(&a, &negate_words(&b)),
        BinOp::Mul => mul_words(&a, &b),
        BinOp::And | BinOp::Or | BinOp::Xor => {
            let mut out = [0; WORDS];
            for i in 0..WORDS {
                out[i] = match op {
                    BinOp::And => a[i] & b[i],
                    BinOp::Or => a[i] | b[i],
                    _ => a[i] ^ b[i],
                };
            }
            out
        }
    };
    fixup_width(ty, &Numeric { ty, words })
}

/// Two's complement negation in the type of `x`.
pub fn minus(x: &Numeric) -> Numeric {
    let words = negate_words(&x.words);
    fixup_width(x.ty, &Numeric { ty: x.ty, words })
}

pub fn bit_inv(x: &Numeric) -> Numeric {
    let mut words = x.words;
    for w in words.iter_mut() {
        *w = !*w;
    }
    fixup_width(x.ty, &Numeric { ty: x.ty, words })
}

pub fn compare(op: CompareOp, x: &Numeric, y: &Numeric) -> bool {
    let ord = if x.is_negative() != y.is_negative() {
        if x.is_negative() {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    } else {
        // Same sign: the sign extended words order like the values.
        let (a, b) = (sign_extend(x), sign_extend(y));
        a.iter().rev().cmp(b.iter().rev())
    };
    match op {
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::Eq => ord == Ordering::Equal,
    }
}

/// Logical shift by `amount`, keeping the type of `x`.
pub fn shift(x: &Numeric, amount: u32, to_left: bool) -> Numeric {
    let ws = (amount / 64) as usize;
    let bs = amount % 64;
    let mut out = [0u64; WORDS];
    if ws < WORDS {
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = if to_left {
                if i < ws {
                    0
                } else {
                    let hi = x.words[i - ws] << bs;
                    let lo = if bs != 0 && i > ws {
                        x.words[i - ws - 1] >> (64 - bs)
                    } else {
                        0
                    };
                    hi | lo
                }
            } else if i + ws >= WORDS {
                0
            } else {
                let lo = x.words[i + ws] >> bs;
                let hi = if bs != 0 && i + ws + 1 < WORDS {
                    x.words[i + ws + 1] << (64 - bs)
                } else {
                    0
                };
                hi | lo
            };
        }
    }
    fixup_width(x.ty, &Numeric { ty: x.ty, words: out })
}

/// Bits `h` down to `l` of `x`, as an unsigned value of width `h - l + 1`.
pub fn select_bits(x: &Numeric, h: u32, l: u32) -> Numeric {
    debug_assert!(h >= l, "select_bits: {h} < {l}");
    let ty = NumericWidth::unsigned(h - l + 1);
    let wide = Numeric {
        ty: NumericWidth::unsigned(MAX_WIDTH),
        words: x.words,
    };
    fixup_width(ty, &shift(&wide, l, false))
}

/// Places `x` above `y`. The result is unsigned and as wide as both.
pub fn concat(x: &Numeric, y: &Numeric) -> Numeric {
    let yw = y.ty.bit_width();
    let ty = NumericWidth::unsigned(x.ty.bit_width() + yw);
    let wide = NumericWidth::unsigned(MAX_WIDTH);
    let hi = shift(&Numeric { ty: wide, words: x.words }, yw, true);
    let lo = fixup_width(wide, y);
    let mut words = [0; WORDS];
    for i in 0..WORDS {
        words[i] = hi.words[i] | lo.words[i];
    }
    fixup_width(ty, &Numeric { ty, words })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide(v: u64) -> Numeric {
        Numeric::from_u64(v, NumericWidth::unsigned(512))
    }

    #[test]
    fn wide_shift() {
        let one = wide(1);
        let s1 = shift(&one, 1, true);
        assert_eq!(s1.words()[0], 2);
        let s64 = shift(&one, 64, true);
        assert_eq!(s64.words()[0], 0);
        assert_eq!(s64.words()[1], 1);
        let s65 = shift(&one, 65, true);
        assert_eq!(s65.words()[1], 2);
        let s385 = shift(&one, 385, true);
        assert_eq!(s385.words()[6], 2);
        assert_eq!(s385.words().iter().filter(|w| **w != 0).count(), 1);

        assert_eq!(shift(&s385, 0, false), s385);
        assert_eq!(shift(&s385, 64, false).words()[5], 2);
        assert_eq!(shift(&s385, 65, false).words()[5], 1);
        assert_eq!(shift(&s385, 385, false), one);
        assert!(shift(&one, 512, true).is_zero());
    }

    #[test]
    fn shift_carries_between_words() {
        let top = wide(0x8000_0000_0000_0001);
        let s = shift(&top, 1, true);
        assert_eq!(s.words()[0], 2);
        assert_eq!(s.words()[1], 1);
        assert_eq!(shift(&s, 1, false), top);
    }

    #[test]
    fn concat_64_63() {
        let x = Numeric::from_u64(3, NumericWidth::unsigned(64));
        let y = Numeric::from_u64(u64::MAX, NumericWidth::unsigned(63));
        assert_eq!(y.value0(), u64::MAX >> 1);
        let c = concat(&x, &y);
        assert_eq!(c.ty().width(), 127);
        assert_eq!(c.words()[0], u64::MAX);
        assert_eq!(c.words()[1], 1);
    }

    #[test]
    fn fixup_68() {
        let mut n = wide(u64::MAX);
        n.set_word(1, u64::MAX);
        let f = fixup_width(NumericWidth::unsigned(68), &n);
        assert_eq!(f.words()[0], u64::MAX);
        assert_eq!(f.words()[1], 0xf);
        assert_eq!(f.words()[2], 0);
        let mut g = f;
        g.clear();
        assert!(g.is_zero());
        assert_eq!(g.ty(), f.ty());
    }

    #[test]
    fn narrow_arith() {
        let a = Numeric::from_u64(250, NumericWidth::unsigned(8));
        let b = Numeric::from_u64(10, NumericWidth::unsigned(8));
        assert_eq!(add(&a, &b).value0(), 4);
        assert_eq!(sub(&b, &a).value0(), 16);
        assert_eq!(mul(&b, &b).value0(), 100);
        assert_eq!(minus(&b).value0(), 246);
        assert_eq!(bit_inv(&b).value0(), 245);
        assert_eq!(calc_bin_op(BinOp::Xor, &a, &b).value0(), 250 ^ 10);
    }

    #[test]
    fn wide_add_carries() {
        let a = wide(u64::MAX);
        let s = add(&a, &wide(1));
        assert_eq!(s.words()[0], 0);
        assert_eq!(s.words()[1], 1);
        assert_eq!(sub(&s, &wide(1)), a);
    }

    #[test]
    fn signed_compare() {
        let t = NumericWidth::signed(8);
        let m = Numeric::from_i64(-3, t);
        let p = Numeric::from_i64(2, t);
        assert!(compare(CompareOp::Lt, &m, &p));
        assert!(compare(CompareOp::Gt, &p, &m));
        assert!(!compare(CompareOp::Eq, &p, &m));
        assert_eq!(m.format(), "-3");
        let u = Numeric::from_u64(200, NumericWidth::unsigned(8));
        assert!(compare(CompareOp::Gt, &u, &p));
    }

    #[test]
    fn select() {
        let n = Numeric::from_u64(0b1011_0110, NumericWidth::unsigned(8));
        let s = select_bits(&n, 5, 2);
        assert_eq!(s.ty().width(), 4);
        assert_eq!(s.value0(), 0b1101);
        let w = shift(&wide(0b11), 63, true);
        assert_eq!(select_bits(&w, 64, 63).value0(), 0b11);
    }

    #[test]
    fn widths_and_format() {
        assert_eq!(value_width(0).width(), 1);
        assert_eq!(value_width(5).width(), 3);
        assert_eq!(value_width(255).width(), 8);
        assert!(value_width(-1).is_signed());
        assert_eq!(make_const(-4).as_i64(), -4);
        let w = shift(&wide(1), 64, true);
        assert_eq!(w.format(), "0x10000000000000000");
        assert_eq!(Numeric::parse(&w.format(), w.ty()), Some(w));
        assert_eq!(
            Numeric::parse("-3", NumericWidth::signed(8)),
            Some(Numeric::from_i64(-3, NumericWidth::signed(8)))
        );
        assert!(Numeric::parse("x1", NumericWidth::unsigned(8)).is_none());
    }
}
