//! PSID/RSID music file parser.
//!
//! A SID file is a big-endian header followed by a C64 memory image. The
//! header names the load, init and play addresses; a load address of zero
//! means the first two payload bytes hold it (little-endian, PRG style).
//!
//! | Offset | Size | Field            |
//! |--------|------|------------------|
//! | $00    | 4    | magic (PSID/RSID)|
//! | $04    | 2    | version (1-4)    |
//! | $06    | 2    | data offset      |
//! | $08    | 2    | load address     |
//! | $0A    | 2    | init address     |
//! | $0C    | 2    | play address     |
//! | $0E    | 2    | song count       |
//! | $10    | 2    | start song       |
//! | $12    | 4    | speed flags      |
//! | $16    | 32   | name             |
//! | $36    | 32   | author           |
//! | $56    | 32   | released         |
//! | $76    | 2    | flags (v2+)      |

use thiserror::Error;

/// Size of a version 1 header.
pub const V1_HEADER_SIZE: usize = 0x76;
/// Size of a version 2+ header.
pub const V2_HEADER_SIZE: usize = 0x7C;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PsidError {
    #[error("not a SID file (magic {0:?})")]
    BadMagic([u8; 4]),
    #[error("file too small for a SID header: {0} bytes")]
    TruncatedHeader(usize),
    #[error("unsupported SID version {0}")]
    BadVersion(u16),
    #[error("data offset ${offset:04X} past end of {len}-byte file")]
    DataOffsetPastEnd { offset: u16, len: usize },
    #[error("file too small for embedded load address")]
    MissingLoadAddress,
}

/// Video standard the tune was timed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    Pal,
    Ntsc,
}

impl Clock {
    /// Play calls per second.
    #[must_use]
    pub fn frame_rate(self) -> u32 {
        match self {
            Clock::Pal => 50,
            Clock::Ntsc => 60,
        }
    }

    /// CPU frequency in Hz.
    #[must_use]
    pub fn cpu_frequency(self) -> u32 {
        match self {
            Clock::Pal => 985_248,
            Clock::Ntsc => 1_022_727,
        }
    }
}

/// Parsed header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsidHeader {
    pub is_rsid: bool,
    pub version: u16,
    pub data_offset: u16,
    pub load_address: u16,
    pub init_address: u16,
    pub play_address: u16,
    pub songs: u16,
    pub start_song: u16,
    pub speed: u32,
    pub name: String,
    pub author: String,
    pub released: String,
    pub clock: Clock,
}

impl PsidHeader {
    /// True if `song` (1-based) is paced by a CIA timer rather than the
    /// vertical blank. Songs past 32 share bit 31.
    #[must_use]
    pub fn uses_cia_timing(&self, song: u16) -> bool {
        let bit = u32::from(song.saturating_sub(1).min(31));
        self.speed & (1 << bit) != 0
    }
}

/// A loaded tune: header plus the memory image and where it goes.
#[derive(Debug, Clone)]
pub struct PsidFile {
    pub header: PsidHeader,
    pub load_address: u16,
    pub payload: Vec<u8>,
}

impl PsidFile {
    /// Parse a complete SID file.
    pub fn parse(data: &[u8]) -> Result<Self, PsidError> {
        let header = parse_header(data)?;
        let start = usize::from(header.data_offset);
        if start >= data.len() {
            return Err(PsidError::DataOffsetPastEnd {
                offset: header.data_offset,
                len: data.len(),
            });
        }

        let (load_address, payload_start) = if header.load_address == 0 {
            let bytes = data
                .get(start..start + 2)
                .ok_or(PsidError::MissingLoadAddress)?;
            (u16::from_le_bytes([bytes[0], bytes[1]]), start + 2)
        } else {
            (header.load_address, start)
        };

        Ok(Self {
            header,
            load_address,
            payload: data[payload_start..].to_vec(),
        })
    }

    /// Init address, defaulting to the load address when zero.
    #[must_use]
    pub fn init_address(&self) -> u16 {
        match self.header.init_address {
            0 => self.load_address,
            addr => addr,
        }
    }
}

fn be_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

fn be_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// Read a NUL-padded Latin-1 string field.
fn text(data: &[u8], offset: usize) -> String {
    data[offset..offset + 32]
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| char::from(b))
        .collect()
}

/// Parse just the header.
pub fn parse_header(data: &[u8]) -> Result<PsidHeader, PsidError> {
    if data.len() < V1_HEADER_SIZE {
        return Err(PsidError::TruncatedHeader(data.len()));
    }
    let magic = [data[0], data[1], data[2], data[3]];
    let is_rsid = match &magic {
        b"PSID" => false,
        b"RSID" => true,
        _ => return Err(PsidError::BadMagic(magic)),
    };

    let version = be_u16(data, 0x04);
    if !(1..=4).contains(&version) || (is_rsid && version == 1) {
        return Err(PsidError::BadVersion(version));
    }
    if version >= 2 && data.len() < V2_HEADER_SIZE {
        return Err(PsidError::TruncatedHeader(data.len()));
    }

    // Flags bits 2-3: 01 PAL, 10 NTSC, 11 both. Unknown plays as PAL.
    let clock = if version >= 2 && (be_u16(data, 0x76) >> 2) & 0x03 == 0x02 {
        Clock::Ntsc
    } else {
        Clock::Pal
    };

    Ok(PsidHeader {
        is_rsid,
        version,
        data_offset: be_u16(data, 0x06),
        load_address: be_u16(data, 0x08),
        init_address: be_u16(data, 0x0A),
        play_address: be_u16(data, 0x0C),
        songs: be_u16(data, 0x0E),
        start_song: be_u16(data, 0x10),
        speed: be_u32(data, 0x12),
        name: text(data, 0x16),
        author: text(data, 0x36),
        released: text(data, 0x56),
        clock,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(version: u16, load: u16) -> Vec<u8> {
        let mut data = vec![0u8; V2_HEADER_SIZE];
        data[0..4].copy_from_slice(b"PSID");
        data[0x04..0x06].copy_from_slice(&version.to_be_bytes());
        data[0x06..0x08].copy_from_slice(&(V2_HEADER_SIZE as u16).to_be_bytes());
        data[0x08..0x0A].copy_from_slice(&load.to_be_bytes());
        data[0x0A..0x0C].copy_from_slice(&0x1000u16.to_be_bytes());
        data[0x0C..0x0E].copy_from_slice(&0x1003u16.to_be_bytes());
        data[0x0E..0x10].copy_from_slice(&3u16.to_be_bytes());
        data[0x10..0x12].copy_from_slice(&2u16.to_be_bytes());
        data[0x16..0x1B].copy_from_slice(b"Tune!");
        data
    }

    #[test]
    fn parses_header_fields() {
        let mut data = header(2, 0x1000);
        data.extend_from_slice(&[0xA9, 0x00, 0x60]);
        let file = PsidFile::parse(&data).expect("valid file");

        assert_eq!(file.header.init_address, 0x1000);
        assert_eq!(file.header.play_address, 0x1003);
        assert_eq!(file.header.songs, 3);
        assert_eq!(file.header.start_song, 2);
        assert_eq!(file.header.name, "Tune!");
        assert_eq!(file.header.clock, Clock::Pal);
        assert_eq!(file.load_address, 0x1000);
        assert_eq!(file.payload, vec![0xA9, 0x00, 0x60]);
    }

    #[test]
    fn embedded_load_address() {
        let mut data = header(2, 0);
        data.extend_from_slice(&[0x00, 0x20, 0xEA]);
        let file = PsidFile::parse(&data).expect("valid file");
        assert_eq!(file.load_address, 0x2000);
        assert_eq!(file.payload, vec![0xEA]);
    }

    #[test]
    fn embedded_load_address_missing() {
        let mut data = header(2, 0);
        data.push(0x00);
        assert_eq!(
            PsidFile::parse(&data).map(|_| ()),
            Err(PsidError::MissingLoadAddress)
        );
    }

    #[test]
    fn rejects_bad_magic_and_short_files() {
        let mut data = header(2, 0x1000);
        data[0] = b'X';
        assert!(matches!(
            parse_header(&data),
            Err(PsidError::BadMagic(_))
        ));
        assert_eq!(
            parse_header(&data[..0x20]),
            Err(PsidError::TruncatedHeader(0x20))
        );
    }

    #[test]
    fn rejects_data_offset_past_end() {
        let data = header(2, 0x1000);
        assert!(matches!(
            PsidFile::parse(&data),
            Err(PsidError::DataOffsetPastEnd { .. })
        ));
    }

    #[test]
    fn ntsc_flag_and_speed_bits() {
        let mut data = header(2, 0x1000);
        data[0x77] = 0x08;
        data[0x15] = 0x02;
        let parsed = parse_header(&data).expect("valid header");
        assert_eq!(parsed.clock, Clock::Ntsc);
        assert!(!parsed.uses_cia_timing(1));
        assert!(parsed.uses_cia_timing(2));
    }
}
