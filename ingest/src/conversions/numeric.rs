use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_json::Number;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};

/// Number of bytes a numeric key attribute is assumed to occupy when sizing a record.
///
/// Numeric values are variable width, so sizing uses this upper bound regardless of the digits.
pub const MAX_NUMBER_OF_BYTES_FOR_NUMBER: u64 = 21;

/// Largest exponent magnitude written in plain notation.
///
/// Stored numbers range from `1E-130` to below `1E+126`, so every stored value is written in plain
/// notation.
const MAX_PLAIN_EXPONENT: u64 = 130;

/// Converts the decimal string of an `N` attribute into an exact JSON number.
///
/// The value is parsed as an arbitrary precision decimal and written back in plain (non
/// scientific) notation, so no digit is lost to floating point conversion. Values with an
/// exponent beyond [`MAX_PLAIN_EXPONENT`] keep the scientific notation.
pub fn decimal_to_json_number(value: &str) -> EtlResult<Number> {
    let decimal = BigDecimal::from_str(value.trim())?;
    let (digits, scale) = decimal.normalized().as_bigint_and_exponent();
    let rendered = if scale.unsigned_abs() > MAX_PLAIN_EXPONENT {
        format!("{digits}e{}", -scale)
    } else {
        decimal.to_plain_string()
    };

    match Number::from_str(&rendered) {
        Ok(number) => Ok(number),
        Err(_) => bail!(
            ErrorKind::ConversionError,
            "Number is not representable in JSON",
            format!("number `{value}` could not be written as a JSON number")
        ),
    }
}
