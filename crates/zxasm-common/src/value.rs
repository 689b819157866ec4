//! Numeric results of expression evaluation.
//!
//! A [`Value`] carries, besides the number itself, whether it came out of
//! signed arithmetic and how many bits it is known to need. Narrowing into
//! byte and word operands consults the width to decide between silent
//! truncation and a range error.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Signed,
    Unsigned,
}

/// Ordered from narrowest to widest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SignificantBits {
    NoMoreThan8,
    NoMoreThan16,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Value {
    pub number: i64,
    pub sign: Sign,
    pub bits: SignificantBits,
}

impl Value {
    pub fn new(number: i64) -> Self {
        let sign = if number < 0 { Sign::Signed } else { Sign::Unsigned };
        Self::with_sign(number, sign)
    }

    pub fn with_sign(number: i64, sign: Sign) -> Self {
        Self {
            number,
            sign,
            bits: Self::significant_bits_for(number),
        }
    }

    pub fn with_bits(number: i64, sign: Sign, bits: SignificantBits) -> Self {
        Self { number, sign, bits }
    }

    /// Result of comparisons and logical operators.
    pub fn boolean(flag: bool) -> Self {
        Self::with_bits(flag as i64, Sign::Unsigned, SignificantBits::NoMoreThan8)
    }

    pub fn significant_bits_for(n: i64) -> SignificantBits {
        if (-128..256).contains(&n) {
            SignificantBits::NoMoreThan8
        } else if (-32768..65536).contains(&n) {
            SignificantBits::NoMoreThan16
        } else {
            SignificantBits::All
        }
    }

    pub fn truncate_to_8_bit(&mut self) {
        self.number = match self.sign {
            Sign::Signed => (self.number as u8 as i8) as i64,
            Sign::Unsigned => (self.number as u8) as i64,
        };
    }

    pub fn truncate_to_16_bit(&mut self) {
        self.number = match self.sign {
            Sign::Signed => (self.number as u16 as i16) as i64,
            Sign::Unsigned => (self.number as u16) as i64,
        };
    }

    pub fn truncate_to_32_bit(&mut self) {
        self.number = match self.sign {
            Sign::Signed => (self.number as u32 as i32) as i64,
            Sign::Unsigned => (self.number as u32) as i64,
        };
    }

    pub fn truncate_to_significant_bits(&mut self) {
        match self.bits {
            SignificantBits::NoMoreThan8 => self.truncate_to_8_bit(),
            SignificantBits::NoMoreThan16 => self.truncate_to_16_bit(),
            SignificantBits::All => {}
        }
    }

    pub fn is_true(&self) -> bool {
        self.number != 0
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::with_bits(0, Sign::Unsigned, SignificantBits::NoMoreThan8)
    }
}

/// Binary arithmetic with width inference.
///
/// The result keeps the full-precision number, but its width is judged by
/// redoing the operation on the operands reduced to the common width. For
/// subtraction of unsigned narrow operands the unsigned reading is kept only
/// when it cannot go negative, so `0x80 - 0x7f` stays a byte while
/// `0x80 - 0x81` is re-read as signed.
pub fn smart_evaluate(op: impl Fn(i64, i64) -> i64, a: Value, b: Value, is_sub: bool) -> Value {
    let bits = a.bits.max(b.bits);
    let sign = if a.sign == Sign::Signed || b.sign == Sign::Signed {
        Sign::Signed
    } else {
        Sign::Unsigned
    };
    let full = op(a.number, b.number);

    match bits {
        SignificantBits::NoMoreThan8 => {
            if sign == Sign::Unsigned {
                let aa = (a.number as u8) as i64;
                let bb = (b.number as u8) as i64;
                if !is_sub || bb <= aa {
                    return Value::with_bits(full, sign, Value::significant_bits_for(op(aa, bb)));
                }
            }
            let aa = (a.number as u8 as i8) as i64;
            let bb = (b.number as u8 as i8) as i64;
            Value::with_bits(full, Sign::Signed, signed_bits(op(aa, bb), full, a, b, bits))
        }
        SignificantBits::NoMoreThan16 => {
            if sign == Sign::Unsigned {
                let aa = (a.number as u16) as i64;
                let bb = (b.number as u16) as i64;
                if !is_sub || bb <= aa {
                    return Value::with_bits(full, sign, Value::significant_bits_for(op(aa, bb)));
                }
            }
            let aa = (a.number as u16 as i16) as i64;
            let bb = (b.number as u16 as i16) as i64;
            Value::with_bits(full, Sign::Signed, signed_bits(op(aa, bb), full, a, b, bits))
        }
        SignificantBits::All => Value::with_sign(full, sign),
    }
}

// When both operands really are as narrow as their width claims, the exact
// result must fit too, otherwise `0 - 200` would pass as a byte.
fn signed_bits(narrow: i64, full: i64, a: Value, b: Value, bits: SignificantBits) -> SignificantBits {
    let narrow_bits = Value::significant_bits_for(narrow);
    let exact = Value::significant_bits_for(a.number) <= bits && Value::significant_bits_for(b.number) <= bits;
    if exact {
        narrow_bits.max(Value::significant_bits_for(full))
    } else {
        narrow_bits
    }
}
