use std::fmt;

use crate::error::ParseError;

/// A `<dateTime.iso8601>` value.
///
/// The wire format is the ISO 8601 basic form `YYYYMMDDThh:mm:ss` with an optional
/// `.ffffff` fractional-second suffix (up to microsecond precision) and, notably, no time
/// zone designator. Implementations that need a time zone must agree on one out of band;
/// this type only stores the decomposed calendar fields it was given.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: u32,
}

impl DateTime {
    #[allow(clippy::too_many_arguments)]
    pub fn new(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: u8, microsecond: u32) -> Self {
        DateTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
            microsecond,
        }
    }

    /// Parses the wire form `YYYYMMDDThh:mm:ss[.ffffff]`.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let err = || ParseError::DateTimeDecodeError(s.to_string());

        let bytes = s.as_bytes();
        if bytes.len() < 17 || bytes[8] != b'T' || bytes[11] != b':' || bytes[14] != b':' {
            return Err(err());
        }

        let digits = |range: std::ops::Range<usize>| -> Result<i32, ParseError> {
            s.get(range).and_then(|d| d.parse().ok()).ok_or_else(err)
        };

        let year = digits(0..4)?;
        let month = digits(4..6)?;
        let day = digits(6..8)?;
        let hour = digits(9..11)?;
        let minute = digits(12..14)?;
        let second = digits(15..17)?;

        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(err());
        }
        if hour > 23 || minute > 59 || second > 60 {
            return Err(err());
        }

        let microsecond = match bytes.get(17) {
            None => 0,
            Some(b'.') => {
                let frac = &s[18..];
                if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(err());
                }
                let mut digits: String = frac.chars().take(6).collect();
                while digits.len() < 6 {
                    digits.push('0');
                }
                digits.parse().map_err(|_| err())?
            }
            Some(_) => return Err(err()),
        };

        Ok(DateTime::new(
            year,
            month as u8,
            day as u8,
            hour as u8,
            minute as u8,
            second as u8,
            microsecond,
        ))
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}{:02}{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;
        if self.microsecond != 0 {
            write!(f, ".{:06}", self.microsecond)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_without_fraction() {
        let dt = DateTime::parse("19980717T14:08:55").unwrap();
        assert_eq!(dt, DateTime::new(1998, 7, 17, 14, 8, 55, 0));
        assert_eq!(dt.to_string(), "19980717T14:08:55");
    }

    #[test]
    fn parse_with_fraction() {
        let dt = DateTime::parse("19980717T14:08:55.123456").unwrap();
        assert_eq!(dt.microsecond, 123456);
        assert_eq!(dt.to_string(), "19980717T14:08:55.123456");
    }

    #[test]
    fn parse_pads_short_fraction() {
        let dt = DateTime::parse("19980717T14:08:55.5").unwrap();
        assert_eq!(dt.microsecond, 500000);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(DateTime::parse("not-a-date").is_err());
        assert!(DateTime::parse("19980717T14-08-55").is_err());
        assert!(DateTime::parse("19981317T14:08:55").is_err());
    }
}
