//! Conversions from native values to contract argument values.
//!
//! The contracts take their arguments as `ScVal`s. Only the handful of
//! types the scripts actually pass is supported: addresses, `u32` prices,
//! `i128` token amounts and symbols.

use core::convert::TryInto;

use stellar_xdr::curr::{Int128Parts, ScAddress, ScSymbol, ScVal, StringM};

/// Conversion into a contract argument.
pub trait ToScVal {
    fn to_scval(&self) -> Result<ScVal, ScValError>;
}

impl ToScVal for u32 {
    fn to_scval(&self) -> Result<ScVal, ScValError> {
        Ok(ScVal::U32(*self))
    }
}

impl ToScVal for i128 {
    fn to_scval(&self) -> Result<ScVal, ScValError> {
        Ok(ScVal::I128(i128_parts(*self)))
    }
}

impl ToScVal for ScAddress {
    fn to_scval(&self) -> Result<ScVal, ScValError> {
        Ok(ScVal::Address(self.clone()))
    }
}

impl ToScVal for str {
    /// Strings convert to symbols, which is what the token interface takes.
    fn to_scval(&self) -> Result<ScVal, ScValError> {
        let symbol: StringM<32> = self.try_into().map_err(ScValError::InvalidSymbol)?;
        Ok(ScVal::Symbol(ScSymbol(symbol)))
    }
}

#[derive(Debug)]
pub enum ScValError {
    /// Symbols are limited to 32 bytes.
    InvalidSymbol(stellar_xdr::curr::Error),
}

/// Splits an `i128` into the hi/lo parts the XDR representation uses.
pub fn i128_parts(value: i128) -> Int128Parts {
    Int128Parts {
        hi: (value >> 64) as i64,
        lo: value as u64,
    }
}

/// Inverse of [`i128_parts`].
pub fn i128_from_parts(parts: &Int128Parts) -> i128 {
    ((parts.hi as i128) << 64) | (parts.lo as i128)
}

#[cfg(test)]
mod tests {
    use stellar_xdr::curr::ScVal;

    use super::ToScVal;

    #[test]
    fn amounts_split_as_expected() {
        let parts = super::i128_parts(10_000_000_000);
        assert_eq!(parts.hi, 0);
        assert_eq!(parts.lo, 10_000_000_000);

        let parts = super::i128_parts(-1);
        assert_eq!(parts.hi, -1);
        assert_eq!(parts.lo, u64::MAX);

        let parts = super::i128_parts(1i128 << 64);
        assert_eq!(parts.hi, 1);
        assert_eq!(parts.lo, 0);
    }

    #[test]
    fn symbol_conversion() {
        match "updt_price".to_scval().unwrap() {
            ScVal::Symbol(symbol) => assert_eq!(symbol.0.as_slice(), b"updt_price"),
            other => panic!("expected a symbol, got {:?}", other),
        }
        // 33 bytes does not fit
        assert!("a".repeat(33).as_str().to_scval().is_err());
    }

    quickcheck::quickcheck! {
        fn i128_roundtrips(value: i128) -> bool {
            super::i128_from_parts(&super::i128_parts(value)) == value
        }

        fn u32_is_plain(value: u32) -> bool {
            value.to_scval().unwrap() == ScVal::U32(value)
        }
    }
}
