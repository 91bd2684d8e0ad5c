// ABOUTME: DTB structure block token definitions and parsing
// ABOUTME: Handles the five structure tokens with 4-byte alignment

use super::error::DtbError;

/// DTB structure block token values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DtbToken {
    /// Begin node token (0x00000001)
    BeginNode,
    /// End node token (0x00000002)
    EndNode,
    /// Property token (0x00000003)
    Property,
    /// No-op token (0x00000004)
    Nop,
    /// End of structure token (0x00000009)
    End,
}

impl DtbToken {
    /// Begin node token constant
    pub const FDT_BEGIN_NODE: u32 = 0x00000001;
    /// End node token constant
    pub const FDT_END_NODE: u32 = 0x00000002;
    /// Property token constant
    pub const FDT_PROP: u32 = 0x00000003;
    /// No-op token constant
    pub const FDT_NOP: u32 = 0x00000004;
    /// End of structure token constant
    pub const FDT_END: u32 = 0x00000009;

    /// Convert u32 value to DtbToken
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            Self::FDT_BEGIN_NODE => Some(DtbToken::BeginNode),
            Self::FDT_END_NODE => Some(DtbToken::EndNode),
            Self::FDT_PROP => Some(DtbToken::Property),
            Self::FDT_NOP => Some(DtbToken::Nop),
            Self::FDT_END => Some(DtbToken::End),
            _ => None,
        }
    }

    /// Read the token at `offset` within the structure block
    pub fn parse(block: &[u8], offset: usize) -> Result<Self, DtbError> {
        let token = read_be_u32(block, offset)?;
        Self::from_u32(token).ok_or(DtbError::InvalidToken { token, offset })
    }

    /// Calculate padding needed for 4-byte alignment
    pub fn calculate_padding(offset: usize) -> usize {
        (4 - (offset % 4)) % 4
    }

    /// Round `offset` up to the next 4-byte boundary
    pub fn align(offset: usize) -> usize {
        offset + Self::calculate_padding(offset)
    }
}

/// Read a big-endian u32 at `offset`
pub fn read_be_u32(block: &[u8], offset: usize) -> Result<u32, DtbError> {
    block
        .get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(DtbError::Truncated(offset))
}
