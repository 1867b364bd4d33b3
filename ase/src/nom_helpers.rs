use nom::{
    IResult as _IResult, Parser,
    bytes::complete::take,
    combinator::map,
    number::complete::{le_i32, le_u8, le_u16, le_u32},
};

use crate::{
    error::AseError,
    types::{Color, Point, Rect},
};

pub type IResult<'a, T> = _IResult<&'a [u8], T>;

/// `u16` byte length followed by the string bytes.
pub fn ase_string(i: &[u8]) -> IResult<'_, String> {
    let (i, length) = le_u16(i)?;

    map(take(length as usize), |bytes: &[u8]| {
        String::from_utf8_lossy(bytes).into_owned()
    })
    .parse(i)
}

pub fn skip_string(i: &[u8]) -> IResult<'_, ()> {
    let (i, length) = le_u16(i)?;

    map(take(length as usize), |_| ()).parse(i)
}

pub fn ase_color(i: &[u8]) -> IResult<'_, Color> {
    map((le_u8, le_u8, le_u8, le_u8), |(r, g, b, a)| [r, g, b, a]).parse(i)
}

pub fn ase_rect(i: &[u8]) -> IResult<'_, Rect> {
    map((le_i32, le_i32, le_u32, le_u32), |(x, y, width, height)| {
        Rect::new(x, y, width, height)
    })
    .parse(i)
}

pub fn ase_point(i: &[u8]) -> IResult<'_, Point> {
    map((le_i32, le_i32), |(x, y)| Point { x, y }).parse(i)
}

/// Splits off exactly `count` bytes, reporting a truncated input instead of a parser error.
pub fn split_exact(i: &[u8], count: usize) -> Result<(&[u8], &[u8]), AseError> {
    if i.len() < count {
        return Err(AseError::Truncated {
            needed: count,
            available: i.len(),
        });
    }

    Ok(i.split_at(count))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn string_is_length_prefixed() {
        let bytes = [5, 0, b'h', b'e', b'l', b'l', b'o', 0xff];
        let (rest, s) = ase_string(&bytes).unwrap();

        assert_eq!(s, "hello");
        assert_eq!(rest, &[0xff]);
    }

    #[test]
    fn string_past_end_is_error() {
        let bytes = [9, 0, b'a'];
        assert!(ase_string(&bytes).is_err());
    }

    #[test]
    fn rect_uses_signed_origin() {
        let mut bytes = vec![];
        bytes.extend((-3i32).to_le_bytes());
        bytes.extend(4i32.to_le_bytes());
        bytes.extend(10u32.to_le_bytes());
        bytes.extend(2u32.to_le_bytes());

        let (_, rect) = ase_rect(&bytes).unwrap();
        assert_eq!(rect, Rect::new(-3, 4, 10, 2));
    }

    #[test]
    fn split_exact_reports_truncation() {
        let err = split_exact(&[1, 2, 3], 4).unwrap_err();
        assert!(matches!(
            err,
            AseError::Truncated {
                needed: 4,
                available: 3
            }
        ));
    }
}
