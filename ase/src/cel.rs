use std::{borrow::Cow, io::Read};

use flate2::read::ZlibDecoder;
use log::debug;
use nom::{
    Parser,
    bytes::complete::take,
    number::complete::{le_i16, le_u8, le_u16},
};

use crate::{
    container::{ChunkKind, RawFrame},
    error::AseError,
    nom_helpers::{IResult, split_exact},
    types::{ColorDepth, Layer, Rect, UserData},
    user_data::trailing_user_data,
};

/// Decoded pixels of one cel. Grayscale is expanded to RGBA while decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CelPixels {
    Indexed(Vec<u8>),
    Rgba(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CelImage {
    pub width: u32,
    pub height: u32,
    pub pixels: CelPixels,
}

/// Index into a [`CelArena`]. Linked cels hold the same handle as the cel they link to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CelHandle(usize);

/// Pixel storage of every decoded cel of one sprite.
#[derive(Debug, Default)]
pub(crate) struct CelArena {
    images: Vec<CelImage>,
}

impl CelArena {
    pub fn push(&mut self, image: CelImage) -> CelHandle {
        self.images.push(image);
        CelHandle(self.images.len() - 1)
    }

    pub fn get(&self, handle: CelHandle) -> &CelImage {
        &self.images[handle.0]
    }

    pub fn get_mut(&mut self, handle: CelHandle) -> &mut CelImage {
        &mut self.images[handle.0]
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Cel {
    pub image: CelHandle,
    /// Canvas space.
    pub bounds: Rect,
    /// Cel opacity already combined with the layer opacity.
    pub opacity: u8,
    pub user_data: UserData,
}

/// Cels of one frame, one slot per layer.
pub(crate) type CelSlots = Vec<Option<Cel>>;

struct CelHeader {
    layer: u16,
    x: i16,
    y: i16,
    opacity: u8,
    cel_type: u16,
}

fn parse_cel_header(i: &[u8]) -> IResult<'_, CelHeader> {
    let (i, (layer, x, y, opacity, cel_type, _z_index, _)) =
        (le_u16, le_i16, le_i16, le_u8, le_u16, le_i16, take(5usize)).parse(i)?;

    Ok((
        i,
        CelHeader {
            layer,
            x,
            y,
            opacity,
            cel_type,
        },
    ))
}

fn parse_dimensions(i: &[u8]) -> IResult<'_, (u16, u16)> {
    (le_u16, le_u16).parse(i)
}

fn parse_linked_frame(i: &[u8]) -> IResult<'_, u16> {
    le_u16.parse(i)
}

/// `floor(cel * layer / 255)`.
pub(crate) fn effective_opacity(cel_opacity: u8, layer_opacity: u8) -> u8 {
    (cel_opacity as u32 * layer_opacity as u32 / 255) as u8
}

/// Reads at most `expected` bytes. Short streams are caught by [`reconstruct`].
fn inflate(data: &[u8], expected: usize) -> Result<Vec<u8>, AseError> {
    // the declared size is untrusted, let the buffer grow with the stream
    let mut pixels = Vec::new();

    ZlibDecoder::new(data)
        .take(expected as u64)
        .read_to_end(&mut pixels)
        .map_err(|op| AseError::Decompress { source: op })?;

    Ok(pixels)
}

/// Builds the cel image from exactly `width * height` pixels of the active depth.
fn reconstruct(
    depth: ColorDepth,
    width: u16,
    height: u16,
    bytes: &[u8],
    opacity: u8,
) -> Result<CelImage, AseError> {
    let expected = width as usize * height as usize * depth.bytes_per_pixel();
    let (bytes, _) = split_exact(bytes, expected)?;

    let pixels = match depth {
        ColorDepth::Indexed => CelPixels::Indexed(bytes.to_vec()),
        ColorDepth::Rgba => CelPixels::Rgba(bytes.to_vec()),
        ColorDepth::Grayscale => CelPixels::Rgba(
            bytes
                .chunks_exact(2)
                .flat_map(|p| {
                    let (gray, alpha) = (p[0], p[1]);
                    let alpha = (alpha as u32 * opacity as u32 / 255) as u8;

                    [gray, gray, gray, alpha]
                })
                .collect(),
        ),
    };

    Ok(CelImage {
        width: width as u32,
        height: height as u32,
        pixels,
    })
}

/// Decodes one cel chunk of `frame_index` into `slots`.
///
/// Returns the layer index that received a cel, or `None` when the target
/// layer is left out of compositing.
fn decode_cel(
    depth: ColorDepth,
    layers: &[Layer],
    frames: &[CelSlots],
    slots: &mut CelSlots,
    arena: &mut CelArena,
    frame_index: usize,
    data: &[u8],
) -> Result<Option<usize>, AseError> {
    let (i, header) = parse_cel_header(data)?;
    let layer_index = header.layer as usize;

    let layer = layers
        .get(layer_index)
        .ok_or(AseError::InvalidLayerIndex {
            frame: frame_index,
            layer: header.layer,
            layer_count: layers.len(),
        })?;

    if !layer.is_composited() {
        return Ok(None);
    }

    let opacity = effective_opacity(header.opacity, layer.opacity);

    let (width, height, pixels) = match header.cel_type {
        0 => {
            let (i, (width, height)) = parse_dimensions(i)?;
            (width, height, Cow::Borrowed(i))
        }
        1 => {
            let (_, target) = parse_linked_frame(i)?;

            let linked = frames
                .get(target as usize)
                .ok_or(AseError::InvalidLinkedCel {
                    frame: frame_index,
                    target,
                })?;

            // shares the handle, nothing is decoded again
            slots[layer_index] = linked[layer_index].clone();

            return Ok(Some(layer_index));
        }
        2 => {
            let (i, (width, height)) = parse_dimensions(i)?;
            let expected = width as usize * height as usize * depth.bytes_per_pixel();

            (width, height, Cow::Owned(inflate(i, expected)?))
        }
        cel_type => {
            return Err(AseError::UnsupportedCelType {
                frame: frame_index,
                cel_type,
            });
        }
    };

    let image = reconstruct(depth, width, height, &pixels, opacity)?;

    slots[layer_index] = Some(Cel {
        image: arena.push(image),
        bounds: Rect::new(header.x as i32, header.y as i32, width as u32, height as u32),
        opacity,
        user_data: UserData::default(),
    });

    Ok(Some(layer_index))
}

/// Decodes every cel of every frame, one slot per layer and frame.
pub(crate) fn decode_cels(
    depth: ColorDepth,
    layers: &[Layer],
    raw_frames: &[RawFrame<'_>],
    arena: &mut CelArena,
) -> Result<Vec<CelSlots>, AseError> {
    let mut frames: Vec<CelSlots> = Vec::with_capacity(raw_frames.len());

    for (frame_index, raw_frame) in raw_frames.iter().enumerate() {
        let mut slots: CelSlots = vec![None; layers.len()];
        let chunks = &raw_frame.chunks;

        for (chunk_index, chunk) in chunks.iter().enumerate() {
            if chunk.kind != ChunkKind::Cel {
                continue;
            }

            let Some(layer_index) = decode_cel(
                depth,
                layers,
                &frames,
                &mut slots,
                arena,
                frame_index,
                chunk.data,
            )?
            else {
                continue;
            };

            if let (Some(cel), Some(user_data)) = (
                slots[layer_index].as_mut(),
                trailing_user_data(chunks, chunk_index)?,
            ) {
                cel.user_data = user_data;
            }
        }

        frames.push(slots);
    }

    debug!(
        "decoded {} cel images across {} frames",
        arena.len(),
        frames.len()
    );

    Ok(frames)
}
