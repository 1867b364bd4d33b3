use log::{debug, warn};
use nom::{
    Parser,
    bytes::complete::take,
    number::complete::{le_u8, le_u16, le_u32},
};

use crate::{
    container::{ChunkKind, RawFrame},
    error::AseError,
    nom_helpers::{IResult, ase_color, skip_string},
    types::{Header, OPAQUE_BLACK, Palette, TRANSPARENT},
};

/// Indices are a single byte, nothing past this is addressable.
const MAX_PALETTE_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PaletteSource {
    Palette,
    OldPalette64,
    OldPalette,
    Default,
}

/// Opaque black everywhere except the transparent index.
pub(crate) fn default_palette(header: &Header) -> Palette {
    let mut palette = vec![OPAQUE_BLACK; (header.palette_size as usize).min(MAX_PALETTE_SIZE)];

    if let Some(entry) = palette.get_mut(header.transparent_index as usize) {
        *entry = TRANSPARENT;
    }

    palette
}

fn parse_new_palette<'a>(i: &'a [u8], palette: &mut Palette) -> IResult<'a, ()> {
    let (i, (size, first, last, _)) = (le_u32, le_u32, le_u32, take(8usize)).parse(i)?;

    let size = (size as usize).min(MAX_PALETTE_SIZE);
    if size > palette.len() {
        palette.resize(size, OPAQUE_BLACK);
    }

    let mut i = i;

    for index in first..=last {
        let (rest, (flags, color)) = (le_u16, ase_color).parse(i)?;
        i = rest;

        if flags & 1 != 0 {
            let (rest, _) = skip_string(i)?;
            i = rest;
        }

        if let Some(entry) = palette.get_mut(index as usize) {
            *entry = color;
        }
    }

    Ok((i, ()))
}

/// Both legacy chunks: packets of "skip N entries, then write M colors" (M = 0 means 256).
fn parse_old_palette<'a>(i: &'a [u8], palette: &mut Palette, scale: bool) -> IResult<'a, ()> {
    let (mut i, packet_count) = le_u16.parse(i)?;
    let mut index = 0usize;

    for _ in 0..packet_count {
        let (rest, (skip, count)) = (le_u8, le_u8).parse(i)?;
        i = rest;

        index += skip as usize;
        let count = if count == 0 { 256 } else { count as usize };

        for _ in 0..count {
            if index >= palette.len() {
                return Ok((i, ()));
            }

            let (rest, (r, g, b)) = (le_u8, le_u8, le_u8).parse(i)?;
            i = rest;

            palette[index] = if scale {
                [r << 2, g << 2, b << 2, 255]
            } else {
                [r, g, b, 255]
            };
            index += 1;
        }
    }

    Ok((i, ()))
}

/// Palette state is global, so only the first frame is consulted.
pub(crate) fn resolve_palette(
    header: &Header,
    first_frame: &RawFrame<'_>,
) -> Result<Palette, AseError> {
    let mut palette = default_palette(header);

    let find = |kind: ChunkKind| {
        first_frame
            .chunks
            .iter()
            .find(|chunk| chunk.kind == kind)
            .map(|chunk| chunk.data)
    };

    let source = if let Some(data) = find(ChunkKind::Palette) {
        parse_new_palette(data, &mut palette)?;
        PaletteSource::Palette
    } else if let Some(data) = find(ChunkKind::OldPalette) {
        parse_old_palette(data, &mut palette, false)?;
        PaletteSource::OldPalette
    } else if let Some(data) = find(ChunkKind::OldPalette64) {
        parse_old_palette(data, &mut palette, true)?;
        PaletteSource::OldPalette64
    } else {
        PaletteSource::Default
    };

    if header.flags.has_transparent_color() {
        match palette.get_mut(header.transparent_index as usize) {
            Some(entry) => *entry = TRANSPARENT,
            None => warn!(
                "transparent index {} is outside the {} entry palette",
                header.transparent_index,
                palette.len()
            ),
        }
    }

    debug!("palette: {} entries from {:?}", palette.len(), source);

    Ok(palette)
}
