//! Binary NUMERIC decoding.
//!
//! Postgres sends NUMERIC as base-10000 digit groups:
//! `ndigits: i16, weight: i16, sign: u16, dscale: i16, digits: [u16; ndigits]`.
//! `weight` is the base-10000 exponent of the first group and `dscale` the
//! number of decimal digits after the point.

use sqlx::error::BoxDynError;

const SIGN_NEGATIVE: u16 = 0x4000;
const SIGN_NAN: u16 = 0xC000;
const SIGN_POS_INFINITY: u16 = 0xD000;
const SIGN_NEG_INFINITY: u16 = 0xF000;

/// Render a binary NUMERIC payload the way Postgres prints it as text.
pub fn numeric_to_string(raw: &[u8]) -> Result<String, BoxDynError> {
    if raw.len() < 8 {
        return Err("invalid NUMERIC payload: header too short".into());
    }

    let ndigits = usize::try_from(i16::from_be_bytes([raw[0], raw[1]]))
        .map_err(|_| "invalid NUMERIC payload: negative digit count")?;
    let weight = i32::from(i16::from_be_bytes([raw[2], raw[3]]));
    let sign = u16::from_be_bytes([raw[4], raw[5]]);
    let dscale = usize::try_from(i16::from_be_bytes([raw[6], raw[7]]))
        .map_err(|_| "invalid NUMERIC payload: negative scale")?;

    match sign {
        SIGN_NAN => return Ok("NaN".to_string()),
        SIGN_POS_INFINITY => return Ok("Infinity".to_string()),
        SIGN_NEG_INFINITY => return Ok("-Infinity".to_string()),
        _ => {}
    }

    if raw.len() < 8 + ndigits * 2 {
        return Err("invalid NUMERIC payload: truncated digits".into());
    }

    let digits = raw[8..8 + ndigits * 2]
        .chunks_exact(2)
        .map(|pair| {
            let group = u16::from_be_bytes([pair[0], pair[1]]);
            if group > 9999 {
                Err("invalid NUMERIC payload: digit group out of range")
            } else {
                Ok(group)
            }
        })
        .collect::<Result<Vec<u16>, _>>()?;

    // Group at base-10000 position `pos` (weight, weight-1, ...).
    let group_at = |pos: i32| -> u16 {
        usize::try_from(weight - pos)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut integer = String::new();
    for pos in (0..=weight).rev() {
        let group = group_at(pos);
        if integer.is_empty() {
            if group != 0 {
                integer.push_str(&group.to_string());
            }
        } else {
            integer.push_str(&format!("{group:04}"));
        }
    }
    if integer.is_empty() {
        integer.push('0');
    }

    let mut fraction = String::with_capacity(dscale + 4);
    let mut pos = -1;
    while fraction.len() < dscale {
        fraction.push_str(&format!("{:04}", group_at(pos)));
        pos -= 1;
    }
    fraction.truncate(dscale);

    let is_zero = digits.iter().all(|g| *g == 0);
    let mut output = String::with_capacity(integer.len() + fraction.len() + 2);
    if sign == SIGN_NEGATIVE && !is_zero {
        output.push('-');
    }
    output.push_str(&integer);
    if !fraction.is_empty() {
        output.push('.');
        output.push_str(&fraction);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(weight: i16, sign: u16, dscale: i16, digits: &[u16]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&(digits.len() as i16).to_be_bytes());
        raw.extend_from_slice(&weight.to_be_bytes());
        raw.extend_from_slice(&sign.to_be_bytes());
        raw.extend_from_slice(&dscale.to_be_bytes());
        for group in digits {
            raw.extend_from_slice(&group.to_be_bytes());
        }
        raw
    }

    #[test]
    fn decimal_with_fraction() {
        assert_eq!(numeric_to_string(&payload(0, 0, 2, &[5, 2500])).unwrap(), "5.25");
    }

    #[test]
    fn multi_group_integer() {
        let raw = payload(1, 0, 1, &[1234, 5678, 9000]);
        assert_eq!(numeric_to_string(&raw).unwrap(), "12345678.9");
    }

    #[test]
    fn stripped_trailing_groups_are_zero() {
        assert_eq!(numeric_to_string(&payload(1, 0, 0, &[10])).unwrap(), "100000");
    }

    #[test]
    fn negative_small_fraction() {
        let raw = payload(-1, SIGN_NEGATIVE, 3, &[10]);
        assert_eq!(numeric_to_string(&raw).unwrap(), "-0.001");
    }

    #[test]
    fn leading_zero_groups_after_point() {
        // 0.00000001 starts in the second fractional group.
        let raw = payload(-2, 0, 8, &[1]);
        assert_eq!(numeric_to_string(&raw).unwrap(), "0.00000001");
    }

    #[test]
    fn scale_is_kept_for_zero_and_trailing_zeros() {
        assert_eq!(numeric_to_string(&payload(0, 0, 2, &[])).unwrap(), "0.00");
        assert_eq!(numeric_to_string(&payload(0, 0, 3, &[5, 2500])).unwrap(), "5.250");
    }

    #[test]
    fn special_values() {
        assert_eq!(numeric_to_string(&payload(0, SIGN_NAN, 0, &[])).unwrap(), "NaN");
        assert_eq!(numeric_to_string(&payload(0, SIGN_POS_INFINITY, 0, &[])).unwrap(), "Infinity");
        assert_eq!(numeric_to_string(&payload(0, SIGN_NEG_INFINITY, 0, &[])).unwrap(), "-Infinity");
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        assert!(numeric_to_string(&[0, 1, 0]).is_err());
        let mut truncated = payload(0, 0, 0, &[5]);
        truncated.pop();
        assert!(numeric_to_string(&truncated).is_err());
        assert!(numeric_to_string(&payload(0, 0, 0, &[10_000])).is_err());
    }
}
