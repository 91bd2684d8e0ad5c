// ABOUTME: Test-only DTB writer used to assemble fixture blobs
// ABOUTME: Emits a version 17 blob with an empty memory reservation map

use crate::dtb::{DtbHeader, DtbToken};

/// Builds a DTB structure block token by token
#[derive(Default)]
pub struct BlobBuilder {
    structure: Vec<u8>,
    strings: Vec<u8>,
}

impl BlobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(mut self, name: &str) -> Self {
        self.token(DtbToken::FDT_BEGIN_NODE);
        self.structure.extend_from_slice(name.as_bytes());
        self.structure.push(0);
        self.pad();
        self
    }

    pub fn end(mut self) -> Self {
        self.token(DtbToken::FDT_END_NODE);
        self
    }

    pub fn nop(mut self) -> Self {
        self.token(DtbToken::FDT_NOP);
        self
    }

    pub fn prop(mut self, name: &str, value: &[u8]) -> Self {
        let name_offset = self.string_offset(name);
        self.token(DtbToken::FDT_PROP);
        self.token(value.len() as u32);
        self.token(name_offset);
        self.structure.extend_from_slice(value);
        self.pad();
        self
    }

    pub fn prop_cells(self, name: &str, cells: &[u32]) -> Self {
        let bytes: Vec<u8> = cells.iter().flat_map(|c| c.to_be_bytes()).collect();
        self.prop(name, &bytes)
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.token(DtbToken::FDT_END);

        let rsvmap = DtbHeader::SIZE;
        let off_struct = rsvmap + 16;
        let off_strings = off_struct + self.structure.len();
        let total = off_strings + self.strings.len();

        let header = [
            DtbHeader::MAGIC,
            total as u32,
            off_struct as u32,
            off_strings as u32,
            rsvmap as u32,
            17,
            16,
            0,
            self.strings.len() as u32,
            self.structure.len() as u32,
        ];

        let mut blob: Vec<u8> = header.iter().flat_map(|f| f.to_be_bytes()).collect();
        blob.extend_from_slice(&[0u8; 16]);
        blob.extend_from_slice(&self.structure);
        blob.extend_from_slice(&self.strings);
        blob
    }

    fn token(&mut self, value: u32) {
        self.structure.extend_from_slice(&value.to_be_bytes());
    }

    fn pad(&mut self) {
        let padding = DtbToken::calculate_padding(self.structure.len());
        self.structure.extend(core::iter::repeat_n(0u8, padding));
    }

    fn string_offset(&mut self, name: &str) -> u32 {
        let needle: Vec<u8> = name.bytes().chain([0]).collect();
        if let Some(pos) = self
            .strings
            .windows(needle.len())
            .position(|w| w == needle.as_slice())
            .filter(|&pos| pos == 0 || self.strings[pos - 1] == 0)
        {
            return pos as u32;
        }
        let offset = self.strings.len() as u32;
        self.strings.extend_from_slice(&needle);
        offset
    }
}

/// Big-endian encoding of a list of cells
pub fn cells(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|c| c.to_be_bytes()).collect()
}
