use std::time::Duration;

use log::trace;
use nom::{
    Parser,
    bytes::complete::take,
    combinator::map,
    number::complete::{le_i16, le_u8, le_u16, le_u32},
};

use crate::{
    error::AseError,
    nom_helpers::{IResult, split_exact},
    types::{
        CHUNK_HEADER_SIZE, ColorDepth, FRAME_HEADER_SIZE, FRAME_MAGIC, HEADER_MAGIC, HEADER_SIZE,
        Header, HeaderFlags, Rect,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChunkKind {
    /// 0x0004, 8 bit channels.
    OldPalette,
    /// 0x0011, 6 bit channels.
    OldPalette64,
    Layer,
    Cel,
    Tags,
    Palette,
    UserData,
    Slice,
    Unknown(u16),
}

impl From<u16> for ChunkKind {
    fn from(value: u16) -> Self {
        match value {
            0x0004 => ChunkKind::OldPalette,
            0x0011 => ChunkKind::OldPalette64,
            0x2004 => ChunkKind::Layer,
            0x2005 => ChunkKind::Cel,
            0x2018 => ChunkKind::Tags,
            0x2019 => ChunkKind::Palette,
            0x2020 => ChunkKind::UserData,
            0x2022 => ChunkKind::Slice,
            other => ChunkKind::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Chunk<'a> {
    pub kind: ChunkKind,
    /// Payload without the chunk header.
    pub data: &'a [u8],
}

#[derive(Debug, Clone)]
pub(crate) struct RawFrame<'a> {
    pub duration: Duration,
    pub chunks: Vec<Chunk<'a>>,
}

/// Header plus every frame split into chunks, borrowing from the input buffer.
#[derive(Debug, Clone)]
pub(crate) struct Container<'a> {
    pub header: Header,
    pub frames: Vec<RawFrame<'a>>,
}

struct RawHeader {
    file_size: u32,
    magic: u16,
    frame_count: u16,
    width: u16,
    height: u16,
    color_depth: u16,
    flags: u32,
    transparent_index: u8,
    palette_size: u16,
    pixel_width: u8,
    pixel_height: u8,
    grid: Rect,
}

fn parse_raw_header(i: &[u8]) -> IResult<'_, RawHeader> {
    map(
        (
            (le_u32, le_u16, le_u16, le_u16, le_u16, le_u16, le_u32),
            // speed and two reserved dwords
            take(10usize),
            le_u8,
            take(3usize),
            (le_u16, le_u8, le_u8),
            (le_i16, le_i16, le_u16, le_u16),
        ),
        |(
            (file_size, magic, frame_count, width, height, color_depth, flags),
            _,
            transparent_index,
            _,
            (palette_size, pixel_width, pixel_height),
            (grid_x, grid_y, grid_width, grid_height),
        )| RawHeader {
            file_size,
            magic,
            frame_count,
            width,
            height,
            color_depth,
            flags,
            transparent_index,
            palette_size,
            pixel_width,
            pixel_height,
            grid: Rect::new(
                grid_x as i32,
                grid_y as i32,
                grid_width as u32,
                grid_height as u32,
            ),
        },
    )
    .parse(i)
}

/// Validates the fixed 128 byte header.
pub(crate) fn parse_header(i: &[u8]) -> Result<Header, AseError> {
    let (header_bytes, _) = split_exact(i, HEADER_SIZE)?;
    let (_, raw) = parse_raw_header(header_bytes)?;

    if raw.magic != HEADER_MAGIC {
        return Err(AseError::InvalidMagic {
            expected: HEADER_MAGIC,
            found: raw.magic,
        });
    }

    if raw.pixel_width != raw.pixel_height {
        return Err(AseError::UnsupportedPixelRatio {
            width: raw.pixel_width,
            height: raw.pixel_height,
        });
    }

    let color_depth = ColorDepth::try_from(raw.color_depth)?;

    Ok(Header {
        file_size: raw.file_size,
        frame_count: raw.frame_count,
        width: raw.width,
        height: raw.height,
        color_depth,
        flags: HeaderFlags::from_bits_retain(raw.flags),
        transparent_index: raw.transparent_index,
        palette_size: if raw.palette_size == 0 {
            256
        } else {
            raw.palette_size
        },
        pixel_width: raw.pixel_width,
        pixel_height: raw.pixel_height,
        grid: raw.grid,
    })
}

struct FrameHeader {
    length: u32,
    magic: u16,
    old_chunk_count: u16,
    duration: u16,
    new_chunk_count: u32,
}

impl FrameHeader {
    fn chunk_count(&self) -> usize {
        if self.new_chunk_count == 0 {
            self.old_chunk_count as usize
        } else {
            self.new_chunk_count as usize
        }
    }
}

fn parse_frame_header(i: &[u8]) -> IResult<'_, FrameHeader> {
    map(
        (le_u32, le_u16, le_u16, le_u16, take(2usize), le_u32),
        |(length, magic, old_chunk_count, duration, _, new_chunk_count)| FrameHeader {
            length,
            magic,
            old_chunk_count,
            duration,
            new_chunk_count,
        },
    )
    .parse(i)
}

fn parse_chunk_header(i: &[u8]) -> IResult<'_, (u32, u16)> {
    (le_u32, le_u16).parse(i)
}

fn read_chunks(frame_index: usize, mut i: &[u8], count: usize) -> Result<Vec<Chunk<'_>>, AseError> {
    let mut chunks = Vec::with_capacity(count.min(i.len() / CHUNK_HEADER_SIZE));

    for _ in 0..count {
        let (chunk_header, _) = split_exact(i, CHUNK_HEADER_SIZE)?;
        let (_, (length, kind)) = parse_chunk_header(chunk_header)?;

        if (length as usize) < CHUNK_HEADER_SIZE {
            return Err(AseError::InvalidChunkLength {
                frame: frame_index,
                length,
            });
        }

        // Always advance by the declared length so a chunk we only partially
        // understand cannot throw off the ones after it.
        let (chunk, rest) = split_exact(i, length as usize)?;
        let kind = ChunkKind::from(kind);

        if let ChunkKind::Unknown(code) = kind {
            trace!("frame {frame_index}: skipping unknown chunk {code:#06x} ({length} bytes)");
        }

        chunks.push(Chunk {
            kind,
            data: &chunk[CHUNK_HEADER_SIZE..],
        });

        i = rest;
    }

    Ok(chunks)
}

fn read_frame(frame_index: usize, i: &[u8]) -> Result<(&[u8], RawFrame<'_>), AseError> {
    let (frame_header, _) = split_exact(i, FRAME_HEADER_SIZE)?;
    let (_, header) = parse_frame_header(frame_header)?;

    if header.magic != FRAME_MAGIC {
        return Err(AseError::InvalidMagic {
            expected: FRAME_MAGIC,
            found: header.magic,
        });
    }

    if (header.length as usize) < FRAME_HEADER_SIZE {
        return Err(AseError::Truncated {
            needed: FRAME_HEADER_SIZE,
            available: header.length as usize,
        });
    }

    let (frame, rest) = split_exact(i, header.length as usize)?;
    let chunks = read_chunks(
        frame_index,
        &frame[FRAME_HEADER_SIZE..],
        header.chunk_count(),
    )?;

    Ok((
        rest,
        RawFrame {
            duration: Duration::from_millis(header.duration as u64),
            chunks,
        },
    ))
}

/// Splits the whole buffer into frames and chunks. Nothing is decoded yet.
pub(crate) fn parse_container(bytes: &[u8]) -> Result<Container<'_>, AseError> {
    let header = parse_header(bytes)?;

    if header.frame_count == 0 {
        return Err(AseError::NoFrames);
    }

    let file_size = (header.file_size as usize).max(HEADER_SIZE);
    let (file, trailing) = split_exact(bytes, file_size)?;

    if !trailing.is_empty() {
        trace!("ignoring {} bytes past the declared file size", trailing.len());
    }

    let mut i = &file[HEADER_SIZE..];
    let mut frames = Vec::with_capacity(header.frame_count as usize);

    for frame_index in 0..header.frame_count as usize {
        let (rest, frame) = read_frame(frame_index, i)?;

        frames.push(frame);
        i = rest;
    }

    Ok(Container { header, frames })
}
