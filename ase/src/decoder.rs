use log::info;

use crate::{
    atlas::{Atlas, build_atlas, grid_size},
    cel::{CelArena, CelSlots, decode_cels},
    container::{Container, RawFrame, parse_container},
    error::AseError,
    layer::build_layers,
    palette::resolve_palette,
    slice::build_slices,
    tag::build_tags,
    types::{
        ColorDepth, ColorModel, Frame, Header, Layer, Palette, Sprite, SpriteConfig, UserData,
    },
};

/// Everything one decode accumulates. Dropped once the sprite is published.
struct Decoder<'a> {
    header: Header,
    raw_frames: Vec<RawFrame<'a>>,
    palette: Palette,
    layers: Vec<Layer>,
    cels: Vec<CelSlots>,
    arena: CelArena,
}

impl<'a> Decoder<'a> {
    fn new(bytes: &'a [u8]) -> Result<Self, AseError> {
        let Container { header, frames } = parse_container(bytes)?;

        Ok(Self {
            header,
            raw_frames: frames,
            palette: vec![],
            layers: vec![],
            cels: vec![],
            arena: CelArena::default(),
        })
    }

    /// The container never yields zero frames.
    fn first_frame(&self) -> &RawFrame<'a> {
        &self.raw_frames[0]
    }

    fn resolve_palette(&mut self) -> Result<(), AseError> {
        self.palette = resolve_palette(&self.header, self.first_frame())?;
        Ok(())
    }

    fn build_layers(&mut self) -> Result<(), AseError> {
        self.layers = build_layers(&self.header, self.first_frame())?;
        Ok(())
    }

    fn decode_cels(&mut self) -> Result<(), AseError> {
        self.cels = decode_cels(
            self.header.color_depth,
            &self.layers,
            &self.raw_frames,
            &mut self.arena,
        )?;
        Ok(())
    }

    fn finish(mut self) -> Result<Sprite, AseError> {
        let frame_count = self.raw_frames.len();
        let tags = build_tags(self.first_frame(), frame_count)?;
        let slices = build_slices(self.first_frame(), frame_count)?;

        let Atlas {
            image: atlas,
            frames: atlas_rects,
            content_bounds,
        } = build_atlas(
            &self.header,
            &self.palette,
            &self.layers,
            &self.cels,
            &mut self.arena,
        );

        let frames = self
            .raw_frames
            .iter()
            .zip(&self.cels)
            .zip(atlas_rects.into_iter().zip(content_bounds))
            .map(|((raw, slots), (bounds, content_bounds))| Frame {
                bounds,
                content_bounds,
                duration: raw.duration,
                user_data: cel_user_data(slots),
            })
            .collect();

        let layer_data = self
            .layers
            .iter()
            .filter(|layer| layer.is_visible() && !layer.user_data.text.is_empty())
            .map(|layer| layer.user_data.text.clone())
            .collect();

        Ok(Sprite {
            header: self.header,
            atlas,
            frames,
            layers: self.layers,
            tags,
            slices,
            layer_data,
        })
    }
}

fn cel_user_data(slots: &CelSlots) -> Vec<UserData> {
    slots
        .iter()
        .flatten()
        .filter(|cel| !cel.user_data.is_empty())
        .map(|cel| cel.user_data.clone())
        .collect()
}

pub(crate) fn decode_sprite(bytes: &[u8]) -> Result<Sprite, AseError> {
    let mut decoder = Decoder::new(bytes)?;

    decoder.resolve_palette()?;
    decoder.build_layers()?;
    decoder.decode_cels()?;

    let sprite = decoder.finish()?;

    info!(
        "decoded {}x{} sprite with {} frames, {} layers",
        sprite.header.width,
        sprite.header.height,
        sprite.frames.len(),
        sprite.layers.len()
    );

    Ok(sprite)
}

/// Reads the container and palette only. Cel data is never inflated.
pub(crate) fn probe_sprite(bytes: &[u8]) -> Result<SpriteConfig, AseError> {
    let Container { header, frames } = parse_container(bytes)?;

    let (width, height) = (header.width as u32, header.height as u32);
    let (columns, rows) = grid_size(frames.len(), width, height);

    let color_model = match header.color_depth {
        ColorDepth::Indexed => ColorModel::Indexed(resolve_palette(&header, &frames[0])?),
        ColorDepth::Grayscale => ColorModel::Grayscale,
        ColorDepth::Rgba => ColorModel::Rgba,
    };

    Ok(SpriteConfig {
        width,
        height,
        atlas_width: columns * width,
        atlas_height: rows * height,
        frame_count: frames.len(),
        color_model,
    })
}
