use std::{ffi::OsStr, path::Path};

use image::{RgbaImage, imageops};

use crate::{
    Slice, Sprite, SpriteConfig, Tag,
    decoder::{decode_sprite, probe_sprite},
    error::AseError,
};

impl Sprite {
    pub fn open_from_bytes(i: &[u8]) -> Result<Sprite, AseError> {
        decode_sprite(i)
    }

    pub fn open_from_file(path: impl AsRef<OsStr> + AsRef<Path>) -> Result<Sprite, AseError> {
        let file = std::fs::read(path).map_err(|op| AseError::IOError { source: op })?;

        Self::open_from_bytes(&file)
    }

    /// Canvas, atlas size and color model, without decoding any pixels.
    pub fn probe_from_bytes(i: &[u8]) -> Result<SpriteConfig, AseError> {
        probe_sprite(i)
    }

    pub fn probe_from_file(
        path: impl AsRef<OsStr> + AsRef<Path>,
    ) -> Result<SpriteConfig, AseError> {
        let file = std::fs::read(path).map_err(|op| AseError::IOError { source: op })?;

        Self::probe_from_bytes(&file)
    }

    /// Copy of one composited frame.
    pub fn frame_image(&self, frame_index: usize) -> Option<RgbaImage> {
        let bounds = self.frames.get(frame_index)?.bounds;

        Some(
            imageops::crop_imm(
                &self.atlas,
                bounds.x as u32,
                bounds.y as u32,
                bounds.width,
                bounds.height,
            )
            .to_image(),
        )
    }

    /// The named slice as it appears in one frame, clipped to the canvas.
    pub fn slice_image(&self, name: &str, frame_index: usize) -> Option<RgbaImage> {
        let frame = self.frames.get(frame_index)?;
        let slice_bounds = self.slice(name)?.frames.get(frame_index)?.bounds;

        let canvas = crate::Rect::new(0, 0, frame.bounds.width, frame.bounds.height);
        let area = slice_bounds.intersect(&canvas);

        if area.is_empty() {
            return None;
        }

        let area = area.offset(frame.bounds.origin());

        Some(
            imageops::crop_imm(
                &self.atlas,
                area.x as u32,
                area.y as u32,
                area.width,
                area.height,
            )
            .to_image(),
        )
    }

    /// First tag with this name.
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.name == name)
    }

    /// First slice with this name.
    pub fn slice(&self, name: &str) -> Option<&Slice> {
        self.slices.iter().find(|slice| slice.name == name)
    }
}
