// ABOUTME: DTB header structure definitions and parsing
// ABOUTME: Handles the 40-byte device tree blob header and block bounds checks

use super::error::DtbError;

/// DTB header structure (40 bytes total)
#[derive(Debug, Clone, PartialEq)]
pub struct DtbHeader {
    /// Magic number (should be 0xd00dfeed)
    pub magic: u32,
    /// Total size of the DTB
    pub totalsize: u32,
    /// Offset to structure block
    pub off_dt_struct: u32,
    /// Offset to strings block
    pub off_dt_strings: u32,
    /// Offset to memory reservation block
    pub off_mem_rsvmap: u32,
    /// Version of the DTB format
    pub version: u32,
    /// Last compatible version
    pub last_comp_version: u32,
    /// Boot CPU ID
    pub boot_cpuid_phys: u32,
    /// Size of strings block
    pub size_dt_strings: u32,
    /// Size of structure block
    pub size_dt_struct: u32,
}

impl DtbHeader {
    /// DTB magic number constant
    pub const MAGIC: u32 = 0xd00d_feed;

    /// Header size in bytes
    pub const SIZE: usize = 40;

    /// Parse DTB header from input bytes
    pub fn parse(input: &[u8]) -> Result<Self, DtbError> {
        if input.len() < Self::SIZE {
            return Err(DtbError::MalformedHeader);
        }

        let mut fields = input[..Self::SIZE]
            .chunks_exact(4)
            .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        let mut next = || fields.next().ok_or(DtbError::MalformedHeader);

        let magic = next()?;
        if magic != Self::MAGIC {
            return Err(DtbError::InvalidMagic(magic));
        }

        Ok(DtbHeader {
            magic,
            totalsize: next()?,
            off_dt_struct: next()?,
            off_dt_strings: next()?,
            off_mem_rsvmap: next()?,
            version: next()?,
            last_comp_version: next()?,
            boot_cpuid_phys: next()?,
            size_dt_strings: next()?,
            size_dt_struct: next()?,
        })
    }

    /// Structure block slice, bounds-checked against the blob
    pub fn struct_block<'a>(&self, blob: &'a [u8]) -> Result<&'a [u8], DtbError> {
        block(blob, self.off_dt_struct, self.size_dt_struct)
    }

    /// Strings block slice, bounds-checked against the blob
    pub fn strings_block<'a>(&self, blob: &'a [u8]) -> Result<&'a [u8], DtbError> {
        block(blob, self.off_dt_strings, self.size_dt_strings)
    }
}

fn block(blob: &[u8], offset: u32, size: u32) -> Result<&[u8], DtbError> {
    let start = offset as usize;
    let end = start
        .checked_add(size as usize)
        .ok_or(DtbError::MalformedHeader)?;
    if start < DtbHeader::SIZE || end > blob.len() {
        return Err(DtbError::MalformedHeader);
    }
    Ok(&blob[start..end])
}
