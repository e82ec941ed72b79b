use super::header::{Signature, le64};
use crate::error::{Result, YzError};
use std::io::{Read, Write};

/// PART header: signature(8) | index(4). Starts every physical part file.
pub const PART_HEADER_LEN: usize = Signature::LEN + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartHeader {
    pub index: u32,
}

impl PartHeader {
    pub fn write_to(&self, mut w: impl Write) -> std::io::Result<()> {
        w.write_all(&Signature::Part.to_le_bytes())?;
        w.write_all(&self.index.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from(mut r: impl Read) -> Result<Self> {
        let mut buf = [0u8; PART_HEADER_LEN];
        r.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                YzError::format("part file too small for its header")
            } else {
                e.into()
            }
        })?;
        let sig = le64(&buf[..8]);
        if sig != Signature::Part as u64 {
            return Err(YzError::format(format!("bad part signature 0x{sig:x}")));
        }
        let index = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
        Ok(Self { index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_header_is_twelve_bytes() {
        let mut buf = Vec::new();
        PartHeader { index: 3 }.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), PART_HEADER_LEN);
        assert_eq!(PartHeader::read_from(&buf[..]).unwrap().index, 3);
        assert!(matches!(
            PartHeader::read_from(&buf[..5]),
            Err(YzError::Format(_))
        ));
    }
}
