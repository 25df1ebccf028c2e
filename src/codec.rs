use crate::DecodeError;

/* Encoding */

pub fn to_hex_digit(value: u32) -> u8 {
    const HEX_LUT: &[u8] = "0123456789ABCDEF".as_bytes();

    HEX_LUT[(value & 0xF) as usize]
}

pub fn byte_to_hex_pair(byte: u8) -> [u8; 2] {
    [to_hex_digit((byte >> 4) as u32), to_hex_digit(byte as u32)]
}

/* Decoding */

pub fn hex_digit_to_u8(byte: u8) -> Result<u8, DecodeError> {
    Ok(match byte {
        b'0'..=b'9' => byte - b'0',
        b'a'..=b'f' => byte - b'a' + 10,
        b'A'..=b'F' => byte - b'A' + 10,
        _ => return Err(DecodeError::IllegalHexDigit(byte)),
    })
}

pub fn dec_digit_to_u8(byte: u8) -> Result<u8, DecodeError> {
    Ok(match byte {
        b'0'..=b'9' => byte - b'0',
        _ => return Err(DecodeError::IllegalDecimalDigit(byte)),
    })
}

pub fn u8_from_hex_nibbles(hex_nibbles: &[u8; 2]) -> Result<u8, DecodeError> {
    let msn = hex_digit_to_u8(hex_nibbles[0])?;
    let lsn = hex_digit_to_u8(hex_nibbles[1])?;

    Ok((msn << 4) | lsn)
}

pub fn u8_from_dec_digits(dec_digits: &[u8; 2]) -> Result<u8, DecodeError> {
    let tens = dec_digit_to_u8(dec_digits[0])?;
    let ones = dec_digit_to_u8(dec_digits[1])?;

    Ok(tens * 10 + ones)
}

pub fn u16_from_hex_pairs(hex_pairs: &[[u8; 2]; 2]) -> Result<u16, DecodeError> {
    let mut value = 0u16;

    for pair in hex_pairs {
        value = (value << 8) | u8_from_hex_nibbles(pair)? as u16;
    }

    Ok(value)
}

pub fn u32_from_hex_pairs(hex_pairs: &[[u8; 2]; 4]) -> Result<u32, DecodeError> {
    let mut value = 0u32;

    for pair in hex_pairs {
        value = (value << 8) | u8_from_hex_nibbles(pair)? as u32;
    }

    Ok(value)
}

/// Reinterprets eight hex characters as the bit pattern of an IEEE 754
/// single-precision float. The bits carry over exactly; this is not a
/// numeric string conversion.
pub fn f32_from_hex_pairs(hex_pairs: &[[u8; 2]; 4]) -> Result<f32, DecodeError> {
    Ok(f32::from_bits(u32_from_hex_pairs(hex_pairs)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs<const N: usize>(hex: &[u8]) -> [[u8; 2]; N] {
        let mut out = [[0u8; 2]; N];

        for (pair, chunk) in out.iter_mut().zip(hex.chunks(2)) {
            pair.copy_from_slice(chunk);
        }

        out
    }

    #[test]
    fn hex_fields_are_big_endian() {
        assert_eq!(u16_from_hex_pairs(&pairs(b"03E8")), Ok(1000));
        assert_eq!(u16_from_hex_pairs(&pairs(b"FFFF")), Ok(0xFFFF));
        assert_eq!(u32_from_hex_pairs(&pairs(b"000001F4")), Ok(500));
        assert_eq!(u32_from_hex_pairs(&pairs(b"DEADBEEF")), Ok(0xDEAD_BEEF));
    }

    #[test]
    fn floats_come_from_exact_bits() {
        assert_eq!(f32_from_hex_pairs(&pairs(b"3F800000")), Ok(1.0));
        assert_eq!(f32_from_hex_pairs(&pairs(b"00000000")), Ok(0.0));
        assert_eq!(f32_from_hex_pairs(&pairs(b"C0490FDB")), Ok(-core::f32::consts::PI));

        // Non-finite bit patterns survive untouched
        assert!(f32_from_hex_pairs(&pairs(b"7FC00000")).unwrap().is_nan());
    }

    #[test]
    fn hex_digits_cover_both_cases() {
        assert_eq!(u8_from_hex_nibbles(b"ff"), Ok(0xFF));
        assert_eq!(u8_from_hex_nibbles(b"F3"), Ok(0xF3));
        assert_eq!(u8_from_hex_nibbles(b"G0"), Err(DecodeError::IllegalHexDigit(b'G')));
    }

    #[test]
    fn decimal_digits_reject_hex() {
        assert_eq!(u8_from_dec_digits(b"00"), Ok(0));
        assert_eq!(u8_from_dec_digits(b"42"), Ok(42));
        assert_eq!(u8_from_dec_digits(b"0A"), Err(DecodeError::IllegalDecimalDigit(b'A')));
    }

    #[test]
    fn bytes_encode_to_uppercase_pairs() {
        assert_eq!(byte_to_hex_pair(0x0F), *b"0F");
        assert_eq!(byte_to_hex_pair(0xA5), *b"A5");
        assert_eq!(byte_to_hex_pair(0x00), *b"00");
    }
}
