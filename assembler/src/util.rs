use std::ops::Range;
use num_traits::Num;

/// Byte range of `inner` within `outer`. `inner` must be a subslice of `outer`.
pub(crate) fn span_within(outer: &str, inner: &str) -> Range<usize> {
    let start = (inner.as_ptr() as usize).saturating_sub(outer.as_ptr() as usize);
    start..(start + inner.len())
}

pub(crate) fn parse_number<T: Num>(src: &str, radix: u32) -> Option<T> {
    T::from_str_radix(src, radix).ok()
}

/// Reads the longest signed decimal prefix of `src`, yielding 0 when there is none.
/// `"12AB"` is 12, `"-4"` is -4, `"LENGTH"` is 0.
pub(crate) fn leading_decimal(src: &str) -> i64 {
    let src = src.trim_start();
    let (negative, digits) = match src.as_bytes().first() {
        Some(b'-') => (true, &src[1..]),
        Some(b'+') => (false, &src[1..]),
        _ => (false, src),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    let value = digits[..end].bytes()
        .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add((d - b'0') as i64));
    if negative { -value } else { value }
}

/// Whether `src` is a complete signed decimal integer.
pub(crate) fn is_decimal(src: &str) -> bool {
    let digits = src.strip_prefix('-').or_else(|| src.strip_prefix('+')).unwrap_or(src);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_prefix() {
        assert_eq!(4096, leading_decimal("4096"));
        assert_eq!(12, leading_decimal("12AB"));
        assert_eq!(-4, leading_decimal("-4"));
        assert_eq!(0, leading_decimal("LENGTH"));
        assert_eq!(0, leading_decimal(""));
    }

    #[test]
    fn decimal_check() {
        assert!(is_decimal("5"));
        assert!(is_decimal("-17"));
        assert!(!is_decimal("ALPHA"));
        assert!(!is_decimal("-"));
        assert!(!is_decimal("1A"));
    }

    #[test]
    fn hex_numbers() {
        assert_eq!(Some(0x4Cu8), parse_number("4C", 16));
        assert_eq!(None, parse_number::<u8>("G1", 16));
    }

    #[test]
    fn span_of_subslice() {
        let line = "FIRST\tSTL\tRETADR";
        let operand = &line[10..];
        assert_eq!(10..16, span_within(line, operand));
    }
}
