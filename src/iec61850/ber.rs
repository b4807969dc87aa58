//! Minimal BER reader for the GOOSE, SV and MMS PDUs.
//!
//! Only what the decoders need: single-byte tags, definite lengths in short
//! or long form, unsigned integers and visible strings.

use super::DecodeError;

/// One tag-length-value element borrowed from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    pub tag: u8,
    pub value: &'a [u8],
}

/// Read one element from the front of `input`, returning it and the rest.
pub fn read_tlv(input: &[u8]) -> Result<(Tlv<'_>, &[u8]), DecodeError> {
    let (&tag, rest) = input.split_first().ok_or(DecodeError::Truncated("tag"))?;
    if tag & 0x1f == 0x1f {
        return Err(DecodeError::Unsupported("multi-byte tag"));
    }
    let (&first, rest) = rest.split_first().ok_or(DecodeError::Truncated("length"))?;

    let (len, rest) = if first & 0x80 == 0 {
        (first as usize, rest)
    } else {
        let count = (first & 0x7f) as usize;
        if count == 0 {
            return Err(DecodeError::Unsupported("indefinite length"));
        }
        if count > 4 {
            return Err(DecodeError::Unsupported("length wider than 4 bytes"));
        }
        if rest.len() < count {
            return Err(DecodeError::Truncated("length"));
        }
        let len = rest[..count]
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize);
        (len, &rest[count..])
    };

    if rest.len() < len {
        return Err(DecodeError::Truncated("value"));
    }
    let (value, rest) = rest.split_at(len);
    Ok((Tlv { tag, value }, rest))
}

/// Iterator over consecutive elements of a constructed value.
pub struct Elements<'a> {
    rest: &'a [u8],
}

pub fn elements(input: &[u8]) -> Elements<'_> {
    Elements { rest: input }
}

impl<'a> Iterator for Elements<'a> {
    type Item = Result<Tlv<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        match read_tlv(self.rest) {
            Ok((tlv, rest)) => {
                self.rest = rest;
                Some(Ok(tlv))
            }
            Err(e) => {
                self.rest = &[];
                Some(Err(e))
            }
        }
    }
}

/// Read the single element that must make up `input` and check its tag.
pub fn expect_tag<'a>(
    input: &'a [u8],
    tag: u8,
    what: &'static str,
) -> Result<&'a [u8], DecodeError> {
    let (tlv, _) = read_tlv(input)?;
    if tlv.tag != tag {
        return Err(DecodeError::UnexpectedTag { what, tag: tlv.tag });
    }
    Ok(tlv.value)
}

/// Big-endian unsigned integer of at most four bytes.
///
/// A leading zero byte, used to keep the BER sign bit clear, does not count
/// against the width.
pub fn uint(value: &[u8], field: &'static str) -> Result<u32, DecodeError> {
    let digits = match value {
        [] => return Err(DecodeError::Malformed(field)),
        [0, rest @ ..] if !rest.is_empty() => rest,
        _ => value,
    };
    if digits.len() > 4 {
        return Err(DecodeError::Malformed(field));
    }
    Ok(digits.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32))
}

/// Visible string; must be UTF-8.
pub fn string(value: &[u8], field: &'static str) -> Result<String, DecodeError> {
    std::str::from_utf8(value)
        .map(str::to_string)
        .map_err(|_| DecodeError::Malformed(field))
}
