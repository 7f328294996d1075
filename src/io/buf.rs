use bytes::{Buf, Bytes};

use crate::error::Error;

/// Checked reads over a message payload.
///
/// Every reader consumes from the front of the buffer and fails with
/// [`Error::IncompleteMessage`] instead of panicking when the payload is
/// shorter than the field being read.
pub(crate) trait BufExt {
    fn read_u8(&mut self) -> Result<u8, Error>;
    fn read_u16_le(&mut self) -> Result<u16, Error>;
    fn read_u24_le(&mut self) -> Result<u32, Error>;
    fn read_u32_le(&mut self) -> Result<u32, Error>;
    fn read_u48_le(&mut self) -> Result<u64, Error>;
    fn read_u64_le(&mut self) -> Result<u64, Error>;

    fn skip(&mut self, n: usize) -> Result<(), Error>;

    /// Read exactly `n` bytes.
    fn get_bytes(&mut self, n: usize) -> Result<Bytes, Error>;

    /// Read up to (and consume) the first NUL byte.
    fn get_bytes_nul(&mut self) -> Result<Bytes, Error>;

    /// Read all remaining bytes.
    fn get_bytes_eof(&mut self) -> Bytes;

    fn get_str(&mut self, n: usize) -> Result<String, Error>;
    fn get_str_nul(&mut self) -> Result<String, Error>;
    fn get_str_eof(&mut self) -> Result<String, Error>;

    /// Read a length-encoded integer.
    ///
    /// The lead bytes 0xfb (NULL in a row context) and 0xff (ERR marker) are
    /// reserved here; callers that can encounter them peek before reading.
    /// <https://dev.mysql.com/doc/internals/en/integer.html#packet-Protocol::LengthEncodedInteger>
    fn get_uint_lenenc(&mut self) -> Result<u64, Error>;

    /// Read a length-encoded byte sequence.
    fn get_bytes_lenenc(&mut self) -> Result<Bytes, Error>;

    /// Read a length-encoded string.
    fn get_str_lenenc(&mut self) -> Result<String, Error>;
}

fn str_from_utf8(bytes: Bytes) -> Result<String, Error> {
    String::from_utf8(bytes.to_vec()).map_err(|_| Error::InvalidEncoding)
}

impl BufExt for Bytes {
    fn read_u8(&mut self) -> Result<u8, Error> {
        if self.remaining() < 1 {
            return Err(Error::IncompleteMessage);
        }
        Ok(self.get_u8())
    }

    fn read_u16_le(&mut self) -> Result<u16, Error> {
        if self.remaining() < 2 {
            return Err(Error::IncompleteMessage);
        }
        Ok(self.get_u16_le())
    }

    fn read_u24_le(&mut self) -> Result<u32, Error> {
        if self.remaining() < 3 {
            return Err(Error::IncompleteMessage);
        }

        #[allow(clippy::cast_possible_truncation)]
        let value = self.get_uint_le(3) as u32;

        Ok(value)
    }

    fn read_u32_le(&mut self) -> Result<u32, Error> {
        if self.remaining() < 4 {
            return Err(Error::IncompleteMessage);
        }
        Ok(self.get_u32_le())
    }

    fn read_u48_le(&mut self) -> Result<u64, Error> {
        if self.remaining() < 6 {
            return Err(Error::IncompleteMessage);
        }
        Ok(self.get_uint_le(6))
    }

    fn read_u64_le(&mut self) -> Result<u64, Error> {
        if self.remaining() < 8 {
            return Err(Error::IncompleteMessage);
        }
        Ok(self.get_u64_le())
    }

    fn skip(&mut self, n: usize) -> Result<(), Error> {
        if self.remaining() < n {
            return Err(Error::IncompleteMessage);
        }
        self.advance(n);
        Ok(())
    }

    fn get_bytes(&mut self, n: usize) -> Result<Bytes, Error> {
        if self.remaining() < n {
            return Err(Error::IncompleteMessage);
        }
        Ok(self.split_to(n))
    }

    fn get_bytes_nul(&mut self) -> Result<Bytes, Error> {
        let nul = memchr::memchr(b'\0', self).ok_or(Error::IncompleteMessage)?;
        let bytes = self.split_to(nul);
        self.advance(1);
        Ok(bytes)
    }

    fn get_bytes_eof(&mut self) -> Bytes {
        self.split_to(self.len())
    }

    fn get_str(&mut self, n: usize) -> Result<String, Error> {
        str_from_utf8(self.get_bytes(n)?)
    }

    fn get_str_nul(&mut self) -> Result<String, Error> {
        str_from_utf8(self.get_bytes_nul()?)
    }

    fn get_str_eof(&mut self) -> Result<String, Error> {
        str_from_utf8(self.get_bytes_eof())
    }

    fn get_uint_lenenc(&mut self) -> Result<u64, Error> {
        match self.read_u8()? {
            0xfc => self.read_u16_le().map(u64::from),
            0xfd => self.read_u24_le().map(u64::from),
            0xfe => self.read_u64_le(),
            lead @ (0xfb | 0xff) => Err(err_protocol!(
                "reserved lead byte 0x{lead:02x} in a length-encoded integer"
            )),
            v => Ok(u64::from(v)),
        }
    }

    fn get_bytes_lenenc(&mut self) -> Result<Bytes, Error> {
        let size = self.get_uint_lenenc()?;
        let size = usize::try_from(size)
            .map_err(|_| err_protocol!("length-encoded size overflows usize: {size}"))?;
        self.get_bytes(size)
    }

    fn get_str_lenenc(&mut self) -> Result<String, Error> {
        str_from_utf8(self.get_bytes_lenenc()?)
    }
}
