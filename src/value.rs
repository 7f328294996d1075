use std::str;

use crate::error::Error;
use crate::protocol::{ColumnFlags, ColumnType};

/// Whether a row was produced by the text or the binary protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MySqlValueFormat {
    Text,
    Binary,
}

/// A single field of a row, borrowed from the row's storage, or a parameter
/// for a statement execution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MySqlValue<'r> {
    Null,
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    Text(&'r str),
    Bytes(&'r [u8]),
    Date(MySqlDate),
    DateTime(MySqlDateTime),
    Time(MySqlTime),
}

/// A calendar date. MySQL permits zero components (`0000-00-00`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MySqlDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

/// A date paired with a time of day, microsecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MySqlDateTime {
    pub date: MySqlDate,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub micros: u32,
}

/// A signed duration with a day component; the protocol range is
/// ±34 days 22:59:59.999999 (838:59:59 in `HH:MM:SS` form).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MySqlTime {
    pub negative: bool,
    pub days: u32,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub micros: u32,
}

impl MySqlValue<'_> {
    pub const fn is_null(&self) -> bool {
        matches!(self, MySqlValue::Null)
    }

    /// The parameter type code and unsigned flag sent ahead of this value in
    /// a statement execution.
    pub(crate) fn param_type(&self) -> (ColumnType, bool) {
        match self {
            MySqlValue::Null => (ColumnType::Null, false),
            MySqlValue::Int(_) => (ColumnType::LongLong, false),
            MySqlValue::UInt(_) => (ColumnType::LongLong, true),
            MySqlValue::Float(_) => (ColumnType::Float, false),
            MySqlValue::Double(_) => (ColumnType::Double, false),
            MySqlValue::Text(_) => (ColumnType::String, false),
            MySqlValue::Bytes(_) => (ColumnType::Blob, false),
            MySqlValue::Date(_) => (ColumnType::Date, false),
            MySqlValue::DateTime(_) => (ColumnType::Datetime, false),
            MySqlValue::Time(_) => (ColumnType::Time, false),
        }
    }

    /// Binary-protocol encoding of this value. NULL has no encoding; it
    /// travels in the NULL bitmap.
    pub(crate) fn encode_binary(&self, buf: &mut Vec<u8>) -> Result<(), Error> {
        use crate::io::BufMutExt;

        match *self {
            MySqlValue::Null => {}
            MySqlValue::Int(v) => buf.extend_from_slice(&v.to_le_bytes()),
            MySqlValue::UInt(v) => buf.extend_from_slice(&v.to_le_bytes()),
            MySqlValue::Float(v) => buf.extend_from_slice(&v.to_le_bytes()),
            MySqlValue::Double(v) => buf.extend_from_slice(&v.to_le_bytes()),
            MySqlValue::Text(v) => buf.put_bytes_lenenc(v.as_bytes()),
            MySqlValue::Bytes(v) => buf.put_bytes_lenenc(v),
            MySqlValue::Date(v) => v.encode_binary(buf)?,
            MySqlValue::DateTime(v) => v.encode_binary(buf)?,
            MySqlValue::Time(v) => v.encode_binary(buf)?,
        }

        Ok(())
    }
}

impl MySqlDate {
    pub const fn is_zero(&self) -> bool {
        self.year == 0 && self.month == 0 && self.day == 0
    }

    fn validate(&self) -> Result<(), Error> {
        if self.month > 12 || self.day > 31 {
            return Err(err_protocol!(
                "date {}-{}-{} out of range",
                self.year,
                self.month,
                self.day
            ));
        }
        Ok(())
    }

    pub(crate) fn encode_binary(&self, buf: &mut Vec<u8>) -> Result<(), Error> {
        self.validate()?;

        if self.is_zero() {
            buf.push(0);
        } else {
            buf.push(4);
            buf.extend_from_slice(&self.year.to_le_bytes());
            buf.push(self.month);
            buf.push(self.day);
        }

        Ok(())
    }

    /// Parse the `YYYY-MM-DD` text form.
    pub(crate) fn parse_text(text: &str) -> Result<Self, Error> {
        let mut parts = text.splitn(3, '-');

        let year = parse_component(parts.next(), text)?;
        let month = parse_component(parts.next(), text)?;
        let day = parse_component(parts.next(), text)?;

        Ok(Self { year, month, day })
    }
}

impl MySqlDateTime {
    pub(crate) fn encode_binary(&self, buf: &mut Vec<u8>) -> Result<(), Error> {
        self.date.validate()?;

        if self.hour > 23 || self.minute > 59 || self.second > 59 || self.micros > 999_999 {
            return Err(err_protocol!("datetime time-of-day out of range"));
        }

        // the shortest variant that carries every non-zero component
        if self.micros != 0 {
            buf.push(11);
        } else if self.hour != 0 || self.minute != 0 || self.second != 0 {
            buf.push(7);
        } else if !self.date.is_zero() {
            buf.push(4);
        } else {
            buf.push(0);
            return Ok(());
        }

        buf.extend_from_slice(&self.date.year.to_le_bytes());
        buf.push(self.date.month);
        buf.push(self.date.day);

        if self.hour != 0 || self.minute != 0 || self.second != 0 || self.micros != 0 {
            buf.push(self.hour);
            buf.push(self.minute);
            buf.push(self.second);

            if self.micros != 0 {
                buf.extend_from_slice(&self.micros.to_le_bytes());
            }
        }

        Ok(())
    }

    /// Parse the `YYYY-MM-DD HH:MM:SS[.ffffff]` text form.
    pub(crate) fn parse_text(text: &str) -> Result<Self, Error> {
        let (date, time) = match text.split_once(' ') {
            Some((date, time)) => (date, Some(time)),
            None => (text, None),
        };

        let date = MySqlDate::parse_text(date)?;

        let Some(time) = time else {
            return Ok(Self { date, ..Self::default() });
        };

        let (hour, minute, second, micros) = parse_text_hms(time, text)?;

        Ok(Self { date, hour, minute, second, micros })
    }
}

impl MySqlTime {
    pub const fn is_zero(&self) -> bool {
        self.days == 0
            && self.hour == 0
            && self.minute == 0
            && self.second == 0
            && self.micros == 0
    }

    pub(crate) fn encode_binary(&self, buf: &mut Vec<u8>) -> Result<(), Error> {
        // 838:59:59 is the server-side limit for TIME
        if u64::from(self.days) * 24 + u64::from(self.hour) > 838
            || self.minute > 59
            || self.second > 59
            || self.micros > 999_999
        {
            return Err(err_protocol!("time value out of the ±838:59:59.999999 range"));
        }

        if self.is_zero() {
            buf.push(0);
            return Ok(());
        }

        buf.push(if self.micros != 0 { 12 } else { 8 });
        buf.push(u8::from(self.negative));
        buf.extend_from_slice(&self.days.to_le_bytes());
        buf.push(self.hour);
        buf.push(self.minute);
        buf.push(self.second);

        if self.micros != 0 {
            buf.extend_from_slice(&self.micros.to_le_bytes());
        }

        Ok(())
    }

    /// Parse the `[-]HHH:MM:SS[.ffffff]` text form; hours absorb the day
    /// component.
    pub(crate) fn parse_text(text: &str) -> Result<Self, Error> {
        let (negative, rest) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let mut parts = rest.splitn(3, ':');

        let hours: u32 = parse_component(parts.next(), text)?;
        let minute = parse_component(parts.next(), text)?;
        let second_and_micros = parts.next().ok_or_else(|| malformed_temporal(text))?;

        let (second, micros) = match second_and_micros.split_once('.') {
            Some((second, frac)) => (
                second.parse().map_err(|_| malformed_temporal(text))?,
                parse_text_micros(frac, text)?,
            ),
            None => (
                second_and_micros.parse().map_err(|_| malformed_temporal(text))?,
                0,
            ),
        };

        Ok(Self {
            negative,
            days: hours / 24,
            #[allow(clippy::cast_possible_truncation)]
            hour: (hours % 24) as u8,
            minute,
            second,
            micros,
        })
    }
}

fn malformed_temporal(text: &str) -> Error {
    err_protocol!("malformed temporal value {text:?}")
}

fn parse_component<T: str::FromStr>(part: Option<&str>, text: &str) -> Result<T, Error> {
    part.ok_or_else(|| malformed_temporal(text))?
        .parse()
        .map_err(|_| malformed_temporal(text))
}

fn parse_text_hms(time: &str, text: &str) -> Result<(u8, u8, u8, u32), Error> {
    let mut parts = time.splitn(3, ':');

    let hour = parse_component(parts.next(), text)?;
    let minute = parse_component(parts.next(), text)?;
    let second_and_micros = parts.next().ok_or_else(|| malformed_temporal(text))?;

    let (second, micros) = match second_and_micros.split_once('.') {
        Some((second, frac)) => (
            second.parse().map_err(|_| malformed_temporal(text))?,
            parse_text_micros(frac, text)?,
        ),
        None => (
            second_and_micros.parse().map_err(|_| malformed_temporal(text))?,
            0,
        ),
    };

    Ok((hour, minute, second, micros))
}

// fractional seconds come with up to 6 digits; scale shorter fractions up
fn parse_text_micros(frac: &str, text: &str) -> Result<u32, Error> {
    if frac.is_empty() || frac.len() > 6 {
        return Err(malformed_temporal(text));
    }

    let parsed: u32 = frac.parse().map_err(|_| malformed_temporal(text))?;

    Ok(parsed * 10_u32.pow(6 - frac.len() as u32))
}

/// Decode the self-describing binary form of a `DATE`.
pub(crate) fn decode_binary_date(raw: &[u8]) -> Result<MySqlDate, Error> {
    match raw {
        [0] => Ok(MySqlDate::default()),
        [4, y0, y1, month, day] => Ok(MySqlDate {
            year: u16::from_le_bytes([*y0, *y1]),
            month: *month,
            day: *day,
        }),
        // a DATE may legally come down in any DATETIME variant
        _ => decode_binary_datetime(raw).map(|dt| dt.date),
    }
}

/// Decode the self-describing binary form of a `DATETIME`/`TIMESTAMP`.
pub(crate) fn decode_binary_datetime(raw: &[u8]) -> Result<MySqlDateTime, Error> {
    let mut value = MySqlDateTime::default();

    match raw {
        [0] => return Ok(value),
        [4, rest @ ..] | [7, rest @ ..] | [11, rest @ ..] if rest.len() == raw[0] as usize => {}
        _ => return Err(err_protocol!("malformed binary datetime of {} bytes", raw.len())),
    }

    let rest = &raw[1..];

    value.date = MySqlDate {
        year: u16::from_le_bytes([rest[0], rest[1]]),
        month: rest[2],
        day: rest[3],
    };

    if rest.len() >= 7 {
        value.hour = rest[4];
        value.minute = rest[5];
        value.second = rest[6];
    }

    if rest.len() == 11 {
        value.micros = u32::from_le_bytes([rest[7], rest[8], rest[9], rest[10]]);
    }

    Ok(value)
}

/// Decode the self-describing binary form of a `TIME`.
pub(crate) fn decode_binary_time(raw: &[u8]) -> Result<MySqlTime, Error> {
    match raw {
        [0] => Ok(MySqlTime::default()),
        [8, negative, d0, d1, d2, d3, hour, minute, second] => Ok(MySqlTime {
            negative: *negative != 0,
            days: u32::from_le_bytes([*d0, *d1, *d2, *d3]),
            hour: *hour,
            minute: *minute,
            second: *second,
            micros: 0,
        }),
        [12, negative, d0, d1, d2, d3, hour, minute, second, m0, m1, m2, m3] => Ok(MySqlTime {
            negative: *negative != 0,
            days: u32::from_le_bytes([*d0, *d1, *d2, *d3]),
            hour: *hour,
            minute: *minute,
            second: *second,
            micros: u32::from_le_bytes([*m0, *m1, *m2, *m3]),
        }),
        _ => Err(err_protocol!("malformed binary time of {} bytes", raw.len())),
    }
}

/// Decode one text-protocol field into a typed value using its column
/// metadata.
pub(crate) fn decode_text<'r>(
    raw: &'r [u8],
    r#type: ColumnType,
    flags: ColumnFlags,
) -> Result<MySqlValue<'r>, Error> {
    let unsigned = flags.contains(ColumnFlags::UNSIGNED);

    Ok(match r#type {
        ColumnType::Null => MySqlValue::Null,

        ColumnType::Tiny
        | ColumnType::Short
        | ColumnType::Long
        | ColumnType::Int24
        | ColumnType::LongLong
        | ColumnType::Year => {
            let text = text_utf8(raw)?;

            if unsigned {
                MySqlValue::UInt(text.parse().map_err(|_| bad_text(text, "an integer"))?)
            } else {
                MySqlValue::Int(text.parse().map_err(|_| bad_text(text, "an integer"))?)
            }
        }

        ColumnType::Float => {
            let text = text_utf8(raw)?;
            MySqlValue::Float(text.parse().map_err(|_| bad_text(text, "a float"))?)
        }

        ColumnType::Double => {
            let text = text_utf8(raw)?;
            MySqlValue::Double(text.parse().map_err(|_| bad_text(text, "a double"))?)
        }

        ColumnType::Date => MySqlValue::Date(MySqlDate::parse_text(text_utf8(raw)?)?),

        ColumnType::Datetime | ColumnType::Timestamp => {
            MySqlValue::DateTime(MySqlDateTime::parse_text(text_utf8(raw)?)?)
        }

        ColumnType::Time => MySqlValue::Time(MySqlTime::parse_text(text_utf8(raw)?)?),

        _ => bytes_or_text(raw, flags)?,
    })
}

/// Decode one binary-protocol field into a typed value using its column
/// metadata.
pub(crate) fn decode_binary<'r>(
    raw: &'r [u8],
    r#type: ColumnType,
    flags: ColumnFlags,
) -> Result<MySqlValue<'r>, Error> {
    let unsigned = flags.contains(ColumnFlags::UNSIGNED);

    Ok(match r#type {
        ColumnType::Null => MySqlValue::Null,

        ColumnType::Tiny => match (fixed::<1>(raw)?, unsigned) {
            ([v], true) => MySqlValue::UInt(u64::from(v)),
            ([v], false) => MySqlValue::Int(i64::from(v as i8)),
        },

        ColumnType::Short | ColumnType::Year => {
            let v = fixed::<2>(raw)?;
            if unsigned {
                MySqlValue::UInt(u64::from(u16::from_le_bytes(v)))
            } else {
                MySqlValue::Int(i64::from(i16::from_le_bytes(v)))
            }
        }

        ColumnType::Long | ColumnType::Int24 => {
            let v = fixed::<4>(raw)?;
            if unsigned {
                MySqlValue::UInt(u64::from(u32::from_le_bytes(v)))
            } else {
                MySqlValue::Int(i64::from(i32::from_le_bytes(v)))
            }
        }

        ColumnType::LongLong => {
            let v = fixed::<8>(raw)?;
            if unsigned {
                MySqlValue::UInt(u64::from_le_bytes(v))
            } else {
                MySqlValue::Int(i64::from_le_bytes(v))
            }
        }

        ColumnType::Float => MySqlValue::Float(f32::from_le_bytes(fixed::<4>(raw)?)),
        ColumnType::Double => MySqlValue::Double(f64::from_le_bytes(fixed::<8>(raw)?)),

        ColumnType::Date => MySqlValue::Date(decode_binary_date(raw)?),
        ColumnType::Datetime | ColumnType::Timestamp => {
            MySqlValue::DateTime(decode_binary_datetime(raw)?)
        }
        ColumnType::Time => MySqlValue::Time(decode_binary_time(raw)?),

        _ => bytes_or_text(raw, flags)?,
    })
}

fn bytes_or_text(raw: &[u8], flags: ColumnFlags) -> Result<MySqlValue<'_>, Error> {
    // a binary collation means the value is an opaque byte string
    if flags.contains(ColumnFlags::BINARY) {
        Ok(MySqlValue::Bytes(raw))
    } else {
        Ok(MySqlValue::Text(text_utf8(raw)?))
    }
}

fn text_utf8(raw: &[u8]) -> Result<&str, Error> {
    str::from_utf8(raw).map_err(|_| Error::InvalidEncoding)
}

fn bad_text(text: &str, expected: &str) -> Error {
    err_protocol!("{text:?} cannot be parsed as {expected}")
}

fn fixed<const N: usize>(raw: &[u8]) -> Result<[u8; N], Error> {
    raw.try_into().map_err(|_| Error::IncompleteMessage)
}

impl<'r> TryFrom<MySqlValue<'r>> for i64 {
    type Error = Error;

    fn try_from(value: MySqlValue<'r>) -> Result<Self, Error> {
        match value {
            MySqlValue::Int(v) => Ok(v),
            MySqlValue::UInt(v) => i64::try_from(v).map_err(|_| Error::RowTypeMismatch),
            _ => Err(Error::RowTypeMismatch),
        }
    }
}

impl<'r> TryFrom<MySqlValue<'r>> for u64 {
    type Error = Error;

    fn try_from(value: MySqlValue<'r>) -> Result<Self, Error> {
        match value {
            MySqlValue::UInt(v) => Ok(v),
            MySqlValue::Int(v) => u64::try_from(v).map_err(|_| Error::RowTypeMismatch),
            _ => Err(Error::RowTypeMismatch),
        }
    }
}

impl<'r> TryFrom<MySqlValue<'r>> for f32 {
    type Error = Error;

    fn try_from(value: MySqlValue<'r>) -> Result<Self, Error> {
        match value {
            MySqlValue::Float(v) => Ok(v),
            _ => Err(Error::RowTypeMismatch),
        }
    }
}

impl<'r> TryFrom<MySqlValue<'r>> for f64 {
    type Error = Error;

    fn try_from(value: MySqlValue<'r>) -> Result<Self, Error> {
        match value {
            MySqlValue::Double(v) => Ok(v),
            MySqlValue::Float(v) => Ok(f64::from(v)),
            _ => Err(Error::RowTypeMismatch),
        }
    }
}

impl<'r> TryFrom<MySqlValue<'r>> for &'r str {
    type Error = Error;

    fn try_from(value: MySqlValue<'r>) -> Result<Self, Error> {
        match value {
            MySqlValue::Text(v) => Ok(v),
            _ => Err(Error::RowTypeMismatch),
        }
    }
}

impl<'r> TryFrom<MySqlValue<'r>> for &'r [u8] {
    type Error = Error;

    fn try_from(value: MySqlValue<'r>) -> Result<Self, Error> {
        match value {
            MySqlValue::Bytes(v) => Ok(v),
            MySqlValue::Text(v) => Ok(v.as_bytes()),
            _ => Err(Error::RowTypeMismatch),
        }
    }
}

impl<'r> TryFrom<MySqlValue<'r>> for MySqlDate {
    type Error = Error;

    fn try_from(value: MySqlValue<'r>) -> Result<Self, Error> {
        match value {
            MySqlValue::Date(v) => Ok(v),
            _ => Err(Error::RowTypeMismatch),
        }
    }
}

impl<'r> TryFrom<MySqlValue<'r>> for MySqlDateTime {
    type Error = Error;

    fn try_from(value: MySqlValue<'r>) -> Result<Self, Error> {
        match value {
            MySqlValue::DateTime(v) => Ok(v),
            _ => Err(Error::RowTypeMismatch),
        }
    }
}

impl<'r> TryFrom<MySqlValue<'r>> for MySqlTime {
    type Error = Error;

    fn try_from(value: MySqlValue<'r>) -> Result<Self, Error> {
        match value {
            MySqlValue::Time(v) => Ok(v),
            _ => Err(Error::RowTypeMismatch),
        }
    }
}
