//! Builders for sprite files used by the tests.
use std::io::Write;

use flate2::{Compression, write::ZlibEncoder};

use crate::types::{Color, FRAME_MAGIC, HEADER_MAGIC, HEADER_SIZE, Point, Rect};

#[derive(Default)]
struct ByteWriter {
    data: Vec<u8>,
}

impl ByteWriter {
    fn u8(&mut self, i: u8) -> &mut Self {
        self.data.push(i);
        self
    }

    fn u16(&mut self, i: u16) -> &mut Self {
        self.data.extend(i.to_le_bytes());
        self
    }

    fn i16(&mut self, i: i16) -> &mut Self {
        self.data.extend(i.to_le_bytes());
        self
    }

    fn u32(&mut self, i: u32) -> &mut Self {
        self.data.extend(i.to_le_bytes());
        self
    }

    fn i32(&mut self, i: i32) -> &mut Self {
        self.data.extend(i.to_le_bytes());
        self
    }

    fn bytes(&mut self, i: &[u8]) -> &mut Self {
        self.data.extend_from_slice(i);
        self
    }

    fn zeros(&mut self, count: usize) -> &mut Self {
        self.data.resize(self.data.len() + count, 0);
        self
    }

    fn string(&mut self, s: &str) -> &mut Self {
        self.u16(s.len() as u16).bytes(s.as_bytes())
    }

    fn rect(&mut self, rect: Rect) -> &mut Self {
        self.i32(rect.x)
            .i32(rect.y)
            .u32(rect.width)
            .u32(rect.height)
    }

    fn replace_with_u32(&mut self, start: usize, val: u32) {
        self.data[start..start + 4].copy_from_slice(&val.to_le_bytes());
    }

    fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }
}

pub struct SpriteWriter {
    width: u16,
    height: u16,
    depth: u16,
    flags: u32,
    transparent_index: u8,
    palette_size: u16,
    pixel_ratio: (u8, u8),
    frames: Vec<FrameWriter>,
}

impl SpriteWriter {
    pub fn new(width: u16, height: u16, depth: u16) -> Self {
        Self {
            width,
            height,
            depth,
            flags: 0,
            transparent_index: 0,
            palette_size: 256,
            pixel_ratio: (1, 1),
            frames: vec![],
        }
    }

    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn transparent_index(mut self, index: u8) -> Self {
        self.transparent_index = index;
        self
    }

    pub fn palette_size(mut self, size: u16) -> Self {
        self.palette_size = size;
        self
    }

    pub fn pixel_ratio(mut self, width: u8, height: u8) -> Self {
        self.pixel_ratio = (width, height);
        self
    }

    pub fn frame(mut self, frame: FrameWriter) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut writer = ByteWriter::default();

        writer
            .u32(0)
            .u16(HEADER_MAGIC)
            .u16(self.frames.len() as u16)
            .u16(self.width)
            .u16(self.height)
            .u16(self.depth)
            .u32(self.flags)
            .u16(100)
            .zeros(8)
            .u8(self.transparent_index)
            .zeros(3)
            .u16(self.palette_size)
            .u8(self.pixel_ratio.0)
            .u8(self.pixel_ratio.1)
            .i16(0)
            .i16(0)
            .u16(16)
            .u16(16);

        let padding = HEADER_SIZE - writer.data.len();
        writer.zeros(padding);

        for frame in &self.frames {
            frame.write(&mut writer);
        }

        let file_size = writer.data.len() as u32;
        writer.replace_with_u32(0, file_size);

        writer.finish()
    }
}

pub struct FrameWriter {
    duration: u16,
    chunks: Vec<(u16, Vec<u8>)>,
    old_chunk_count_only: bool,
}

impl FrameWriter {
    pub fn new(duration: u16) -> Self {
        Self {
            duration,
            chunks: vec![],
            old_chunk_count_only: false,
        }
    }

    pub fn chunk(mut self, chunk_type: u16, payload: Vec<u8>) -> Self {
        self.chunks.push((chunk_type, payload));
        self
    }

    /// Leaves the 32 bit chunk count zeroed, as older writers did.
    pub fn old_chunk_count_only(mut self) -> Self {
        self.old_chunk_count_only = true;
        self
    }

    fn write(&self, writer: &mut ByteWriter) {
        let start = writer.data.len();
        let count = self.chunks.len() as u32;

        writer
            .u32(0)
            .u16(FRAME_MAGIC)
            .u16(count.min(u16::MAX as u32) as u16)
            .u16(self.duration)
            .zeros(2)
            .u32(if self.old_chunk_count_only { 0 } else { count });

        for (chunk_type, payload) in &self.chunks {
            writer
                .u32(payload.len() as u32 + 6)
                .u16(*chunk_type)
                .bytes(payload);
        }

        let length = (writer.data.len() - start) as u32;
        writer.replace_with_u32(start, length);
    }
}

pub fn user_data_chunk(text: Option<&str>, color: Option<Color>) -> Vec<u8> {
    let mut writer = ByteWriter::default();
    let flags = text.map_or(0, |_| 1) | color.map_or(0, |_| 2);

    writer.u32(flags);

    if let Some(text) = text {
        writer.string(text);
    }

    if let Some(color) = color {
        writer.bytes(&color);
    }

    writer.finish()
}

/// Packets of `(skip, colors)`.
pub fn old_palette_chunk(packets: &[(u8, &[[u8; 3]])]) -> Vec<u8> {
    let mut writer = ByteWriter::default();

    writer.u16(packets.len() as u16);

    for (skip, colors) in packets {
        // 256 colors are written as 0
        writer.u8(*skip).u8(colors.len() as u8);

        for color in *colors {
            writer.bytes(color);
        }
    }

    writer.finish()
}

pub fn new_palette_chunk(size: u32, first: u32, colors: &[Color]) -> Vec<u8> {
    let mut writer = ByteWriter::default();

    writer
        .u32(size)
        .u32(first)
        .u32(first + colors.len() as u32 - 1)
        .zeros(8);

    for (index, color) in colors.iter().enumerate() {
        // every other entry carries a name to exercise skipping it
        if index % 2 == 1 {
            writer.u16(1).bytes(color).string("named");
        } else {
            writer.u16(0).bytes(color);
        }
    }

    writer.finish()
}

pub struct LayerChunk {
    name: String,
    flags: u16,
    layer_type: u16,
    child_level: u16,
    blend_mode: u16,
    opacity: u8,
}

impl LayerChunk {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            flags: 1,
            layer_type: 0,
            child_level: 0,
            blend_mode: 0,
            opacity: 255,
        }
    }

    pub fn flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    pub fn layer_type(mut self, layer_type: u16) -> Self {
        self.layer_type = layer_type;
        self
    }

    pub fn child_level(mut self, child_level: u16) -> Self {
        self.child_level = child_level;
        self
    }

    pub fn blend_mode(mut self, blend_mode: u16) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn opacity(mut self, opacity: u8) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        ByteWriter::default()
            .u16(self.flags)
            .u16(self.layer_type)
            .u16(self.child_level)
            .u16(0)
            .u16(0)
            .u16(self.blend_mode)
            .u8(self.opacity)
            .zeros(3)
            .string(&self.name)
            .finish()
    }
}

enum CelBody {
    Raw(u16, u16, Vec<u8>),
    Linked(u16),
    Compressed(u16, u16, Vec<u8>),
}

pub struct CelChunk {
    layer: u16,
    x: i16,
    y: i16,
    opacity: u8,
    body: CelBody,
}

impl CelChunk {
    pub fn raw(layer: u16, x: i16, y: i16, width: u16, height: u16, pixels: &[u8]) -> Self {
        Self {
            layer,
            x,
            y,
            opacity: 255,
            body: CelBody::Raw(width, height, pixels.to_vec()),
        }
    }

    pub fn compressed(layer: u16, x: i16, y: i16, width: u16, height: u16, pixels: &[u8]) -> Self {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(pixels).unwrap();

        Self {
            layer,
            x,
            y,
            opacity: 255,
            body: CelBody::Compressed(width, height, encoder.finish().unwrap()),
        }
    }

    pub fn linked(layer: u16, frame: u16) -> Self {
        Self {
            layer,
            x: 0,
            y: 0,
            opacity: 255,
            body: CelBody::Linked(frame),
        }
    }

    pub fn opacity(mut self, opacity: u8) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut writer = ByteWriter::default();
        let cel_type = match self.body {
            CelBody::Raw(..) => 0,
            CelBody::Linked(_) => 1,
            CelBody::Compressed(..) => 2,
        };

        writer
            .u16(self.layer)
            .i16(self.x)
            .i16(self.y)
            .u8(self.opacity)
            .u16(cel_type)
            .i16(0)
            .zeros(5);

        match &self.body {
            CelBody::Raw(width, height, data) | CelBody::Compressed(width, height, data) => {
                writer.u16(*width).u16(*height).bytes(data);
            }
            CelBody::Linked(frame) => {
                writer.u16(*frame);
            }
        }

        writer.finish()
    }
}

#[derive(Default)]
pub struct TagChunk {
    tags: Vec<(String, u16, u16, u8, u16)>,
}

impl TagChunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, name: &str, from: u16, to: u16, direction: u8, repeat: u16) -> Self {
        self.tags
            .push((name.to_string(), from, to, direction, repeat));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut writer = ByteWriter::default();

        writer.u16(self.tags.len() as u16).zeros(8);

        for (name, from, to, direction, repeat) in &self.tags {
            writer
                .u16(*from)
                .u16(*to)
                .u8(*direction)
                .u16(*repeat)
                .zeros(6)
                .bytes(&[0, 0, 0])
                .u8(0)
                .string(name);
        }

        writer.finish()
    }
}

pub struct SliceChunk {
    name: String,
    center: Option<Rect>,
    pivot: Option<Point>,
    keys: Vec<(u32, Rect)>,
}

impl SliceChunk {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            center: None,
            pivot: None,
            keys: vec![],
        }
    }

    /// Same 9-slice center on every key.
    pub fn center(mut self, center: Rect) -> Self {
        self.center = Some(center);
        self
    }

    pub fn pivot(mut self, pivot: Point) -> Self {
        self.pivot = Some(pivot);
        self
    }

    pub fn key(mut self, frame: u32, bounds: Rect) -> Self {
        self.keys.push((frame, bounds));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut writer = ByteWriter::default();
        let flags = self.center.map_or(0, |_| 1) | self.pivot.map_or(0, |_| 2);

        writer
            .u32(self.keys.len() as u32)
            .u32(flags)
            .u32(0)
            .string(&self.name);

        for (frame, bounds) in &self.keys {
            writer.u32(*frame).rect(*bounds);

            if let Some(center) = self.center {
                writer.rect(center);
            }

            if let Some(pivot) = self.pivot {
                writer.i32(pivot.x).i32(pivot.y);
            }
        }

        writer.finish()
    }
}
