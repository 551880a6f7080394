//! Value coercion: the single write-time conversion contract.
//!
//! Every write path accepts any input with a canonical, deterministic text
//! rendering; the store retains only that rendering. This is what makes a
//! numeric hash field and its text form interchangeable keys, and what lets
//! `set("n", 1)` followed by `incr("n")` read back `"2"`.

use bytes::Bytes;

/// A value with a canonical text rendering.
///
/// The rendering must be deterministic: the same input always produces the
/// same text. Integers render base-10, booleans render `true`/`false`, and
/// floats render through [`format_float`] so `10.0` stores as `"10"`.
pub trait Textual {
    /// Returns the canonical text form stored by the engine.
    fn render(&self) -> String;

    /// Returns the canonical text form as `Bytes`, ready for storage.
    fn to_bytes(&self) -> Bytes {
        Bytes::from(self.render())
    }
}

impl Textual for str {
    fn render(&self) -> String {
        self.to_owned()
    }

    fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl Textual for String {
    fn render(&self) -> String {
        self.clone()
    }
}

impl Textual for bool {
    fn render(&self) -> String {
        if *self { "true" } else { "false" }.to_owned()
    }
}

macro_rules! textual_for_int {
    ($($t:ty),*) => {
        $(impl Textual for $t {
            fn render(&self) -> String {
                self.to_string()
            }
        })*
    };
}

textual_for_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Textual for f64 {
    fn render(&self) -> String {
        format_float(*self)
    }
}

impl Textual for f32 {
    fn render(&self) -> String {
        format_float(f64::from(*self))
    }
}

impl<T: Textual + ?Sized> Textual for &T {
    fn render(&self) -> String {
        (**self).render()
    }

    fn to_bytes(&self) -> Bytes {
        (**self).to_bytes()
    }
}

/// Formats a float the way Redis renders stored numbers.
///
/// Whole numbers that fit in i64 render without a decimal point; everything
/// else uses the shortest representation that round-trips, with trailing
/// zeros stripped.
pub fn format_float(val: f64) -> String {
    if val == 0.0 {
        return "0".into();
    }
    if val.is_infinite() {
        return if val > 0.0 { "inf".into() } else { "-inf".into() };
    }
    if val == val.trunc() && val >= i64::MIN as f64 && val <= i64::MAX as f64 {
        return format!("{}", val as i64);
    }
    format!("{val}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_renders_verbatim() {
        assert_eq!("hello".render(), "hello");
        assert_eq!(String::from("world").render(), "world");
    }

    #[test]
    fn integers_render_base_ten() {
        assert_eq!(42i64.render(), "42");
        assert_eq!((-7i32).render(), "-7");
        assert_eq!(0usize.render(), "0");
    }

    #[test]
    fn bools_render_lowercase() {
        assert_eq!(true.render(), "true");
        assert_eq!(false.render(), "false");
    }

    #[test]
    fn floats_strip_trailing_zeros() {
        assert_eq!(10.0f64.render(), "10");
        assert_eq!(10.5f64.render(), "10.5");
        assert_eq!(2.72f64.render(), "2.72");
        assert_eq!((-5.0f64).render(), "-5");
    }

    #[test]
    fn rendering_is_deterministic() {
        let a = 3.5f64.render();
        let b = 3.5f64.render();
        assert_eq!(a, b);
    }

    #[test]
    fn to_bytes_matches_render() {
        assert_eq!(7u32.to_bytes(), Bytes::from("7"));
        assert_eq!("abc".to_bytes(), Bytes::from("abc"));
    }

    #[test]
    fn format_float_edge_cases() {
        assert_eq!(format_float(0.0), "0");
        assert_eq!(format_float(f64::INFINITY), "inf");
        assert_eq!(format_float(f64::NEG_INFINITY), "-inf");
        assert_eq!(format_float(1e15), "1000000000000000");
    }
}
