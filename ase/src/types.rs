use std::{ops::RangeInclusive, time::Duration};

use bitflags::bitflags;
use image::RgbaImage;

use crate::{blend::BlendMode, error::AseError};

/// Straight (non-premultiplied) RGBA.
pub type Color = [u8; 4];
pub type Palette = Vec<Color>;

pub const TRANSPARENT: Color = [0, 0, 0, 0];
pub const OPAQUE_BLACK: Color = [0, 0, 0, 255];

pub const HEADER_MAGIC: u16 = 0xA5E0;
pub const FRAME_MAGIC: u16 = 0xF1FA;
pub const HEADER_SIZE: usize = 128;
pub const FRAME_HEADER_SIZE: usize = 16;
pub const CHUNK_HEADER_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    pub fn offset(&self, by: Point) -> Self {
        Self {
            x: self.x + by.x,
            y: self.y + by.y,
            ..*self
        }
    }

    pub fn origin(&self) -> Point {
        Point {
            x: self.x,
            y: self.y,
        }
    }

    /// Overlap of both rectangles, or an empty rectangle at the origin.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let left = (self.x as i64).max(other.x as i64);
        let top = (self.y as i64).max(other.y as i64);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right <= left || bottom <= top {
            return Rect::default();
        }

        Rect::new(
            left as i32,
            top as i32,
            (right - left) as u32,
            (bottom - top) as u32,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    Indexed,
    Grayscale,
    Rgba,
}

impl ColorDepth {
    pub fn bits_per_pixel(self) -> u16 {
        match self {
            ColorDepth::Indexed => 8,
            ColorDepth::Grayscale => 16,
            ColorDepth::Rgba => 32,
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        self.bits_per_pixel() as usize / 8
    }
}

impl TryFrom<u16> for ColorDepth {
    type Error = AseError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            8 => Ok(ColorDepth::Indexed),
            16 => Ok(ColorDepth::Grayscale),
            32 => Ok(ColorDepth::Rgba),
            depth => Err(AseError::UnsupportedColorDepth { depth }),
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HeaderFlags: u32 {
        const LAYER_OPACITY_VALID = 1;
        const GROUP_OPACITY_VALID = 1 << 1;
        const LAYER_UUID = 1 << 2;
    }
}

impl HeaderFlags {
    /// The low bit doubles as the "palette has a transparent index" switch.
    pub fn has_transparent_color(self) -> bool {
        self.contains(Self::LAYER_OPACITY_VALID)
    }
}

#[derive(Debug, Clone)]
pub struct Header {
    pub file_size: u32,
    pub frame_count: u16,
    pub width: u16,
    pub height: u16,
    pub color_depth: ColorDepth,
    pub flags: HeaderFlags,
    pub transparent_index: u8,
    /// Already resolved, a stored 0 reads as 256.
    pub palette_size: u16,
    pub pixel_width: u8,
    pub pixel_height: u8,
    pub grid: Rect,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserData {
    pub text: String,
    pub color: Option<Color>,
}

impl UserData {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.color.is_none()
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LayerFlags: u16 {
        const VISIBLE = 1;
        const EDITABLE = 1 << 1;
        const LOCK_MOVEMENT = 1 << 2;
        const BACKGROUND = 1 << 3;
        const PREFER_LINKED_CELS = 1 << 4;
        const COLLAPSED = 1 << 5;
        const REFERENCE = 1 << 6;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum LayerType {
    Normal = 0,
    Group = 1,
}

#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    pub flags: LayerFlags,
    pub layer_type: LayerType,
    pub child_level: u16,
    /// Raw blend mode id, see [`Layer::blend_mode`].
    pub blend_mode_id: u16,
    pub opacity: u8,
    pub user_data: UserData,
}

impl Layer {
    pub fn is_visible(&self) -> bool {
        self.flags.contains(LayerFlags::VISIBLE)
    }

    /// Hidden, background and reference layers are left out of every composite.
    pub fn is_composited(&self) -> bool {
        self.is_visible()
            && !self
                .flags
                .intersects(LayerFlags::BACKGROUND | LayerFlags::REFERENCE)
    }

    /// `None` for unknown ids, those composite as [`BlendMode::Normal`].
    pub fn blend_mode(&self) -> Option<BlendMode> {
        BlendMode::from_id(self.blend_mode_id)
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    /// Where the frame sits inside [`Sprite::atlas`].
    pub bounds: Rect,
    /// Frame-local area covered by the topmost non-empty cel.
    pub content_bounds: Rect,
    pub duration: Duration,
    /// Annotations of the cels making up this frame, in layer order.
    pub user_data: Vec<UserData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoopDirection {
    Forward = 0,
    Reverse = 1,
    PingPong = 2,
    PingPongReverse = 3,
}

impl TryFrom<u8> for LoopDirection {
    type Error = AseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LoopDirection::Forward),
            1 => Ok(LoopDirection::Reverse),
            2 => Ok(LoopDirection::PingPong),
            3 => Ok(LoopDirection::PingPongReverse),
            direction => Err(AseError::InvalidLoopDirection { direction }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Not unique.
    pub name: String,
    pub from: u16,
    /// Inclusive.
    pub to: u16,
    pub direction: LoopDirection,
    /// 0 loops forever.
    pub repeat: u16,
    pub user_data: UserData,
}

impl Tag {
    pub fn frames(&self) -> RangeInclusive<usize> {
        self.from as usize..=self.to as usize
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceFrame {
    pub bounds: Rect,
    /// 9-slice center, relative to `bounds`.
    pub center: Option<Rect>,
    /// Relative to `bounds`.
    pub pivot: Option<Point>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    pub name: String,
    /// One entry per animation frame.
    pub frames: Vec<SliceFrame>,
    pub user_data: UserData,
}

#[derive(Debug, Clone)]
pub struct Sprite {
    pub header: Header,
    /// Every composited frame packed in a grid, see [`Frame::bounds`].
    pub atlas: RgbaImage,
    pub frames: Vec<Frame>,
    pub layers: Vec<Layer>,
    pub tags: Vec<Tag>,
    pub slices: Vec<Slice>,
    /// Non-empty annotation texts of visible layers, in layer order.
    pub layer_data: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorModel {
    Indexed(Palette),
    Grayscale,
    Rgba,
}

/// Result of a structure-only read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteConfig {
    pub width: u32,
    pub height: u32,
    pub atlas_width: u32,
    pub atlas_height: u32,
    pub frame_count: usize,
    pub color_model: ColorModel,
}
