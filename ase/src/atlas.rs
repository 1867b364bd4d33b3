use image::{Rgba, RgbaImage, imageops};
use log::{debug, warn};

use crate::{
    blend::{BlendMode, div255},
    cel::{Cel, CelArena, CelImage, CelPixels, CelSlots},
    types::{Color, Header, Layer, Palette, Rect, TRANSPARENT},
};

/// Computes `n <= a * b` where `a` and `b` are powers of two and `a >= b`.
pub fn factor_power_of_two(n: usize) -> (u32, u32) {
    let x = n.max(1).next_power_of_two().trailing_zeros();

    (1 << (x - x / 2), 1 << (x / 2))
}

/// Columns and rows of the atlas grid. Wide frames are stacked into more rows.
pub fn grid_size(frame_count: usize, frame_width: u32, frame_height: u32) -> (u32, u32) {
    let (a, b) = factor_power_of_two(frame_count);

    if frame_width > frame_height {
        (b, a)
    } else {
        (a, b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AtlasLayout {
    pub width: u32,
    pub height: u32,
    /// Row-major.
    pub frames: Vec<Rect>,
}

pub(crate) fn atlas_layout(frame_count: usize, frame_width: u32, frame_height: u32) -> AtlasLayout {
    let (columns, rows) = grid_size(frame_count, frame_width, frame_height);

    let frames = (0..frame_count as u32)
        .map(|index| {
            let (column, row) = (index % columns, index / columns);

            Rect::new(
                (column * frame_width) as i32,
                (row * frame_height) as i32,
                frame_width,
                frame_height,
            )
        })
        .collect();

    AtlasLayout {
        width: columns * frame_width,
        height: rows * frame_height,
        frames,
    }
}

/// Straight alpha "over", with `mask` scaling the source alpha.
fn over(dst: Color, src: Color, mask: u8) -> Color {
    let sa = div255(src[3] as u32 * mask as u32) as u32;

    if sa == 0 {
        return dst;
    }

    let da = dst[3] as u32;
    let inv = 255 - sa;
    let out_a = sa * 255 + da * inv;

    let channel = |s: u8, d: u8| {
        let num = s as u32 * sa * 255 + d as u32 * da * inv;
        ((num + out_a / 2) / out_a) as u8
    };

    [
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        div255(out_a),
    ]
}

fn cel_pixel(image: &CelImage, palette: &Palette, x: u32, y: u32) -> Color {
    let index = (y * image.width + x) as usize;

    match &image.pixels {
        CelPixels::Indexed(indices) => palette
            .get(indices[index] as usize)
            .copied()
            .unwrap_or(TRANSPARENT),
        CelPixels::Rgba(bytes) => {
            let p = &bytes[index * 4..index * 4 + 4];
            [p[0], p[1], p[2], p[3]]
        }
    }
}

/// Indices past the end of the palette (colors deleted after drawing) become transparent.
fn clamp_indices(image: &mut CelImage, palette_len: usize, transparent_index: u8) {
    let CelPixels::Indexed(indices) = &mut image.pixels else {
        return;
    };

    let mut clamped = 0;

    for index in indices.iter_mut() {
        if *index as usize >= palette_len {
            *index = transparent_index;
            clamped += 1;
        }
    }

    if clamped > 0 {
        warn!("{clamped} pixels referenced colors past the end of the palette");
    }
}

/// Scratch buffers reused for every frame of one sprite.
pub(crate) struct Compositor<'a> {
    palette: &'a Palette,
    layers: &'a [Layer],
    transparent_index: u8,
    canvas: Rect,
    frame: RgbaImage,
    scratch: RgbaImage,
}

impl<'a> Compositor<'a> {
    pub fn new(header: &Header, palette: &'a Palette, layers: &'a [Layer]) -> Self {
        let (width, height) = (header.width as u32, header.height as u32);

        Self {
            palette,
            layers,
            transparent_index: header.transparent_index,
            canvas: Rect::new(0, 0, width, height),
            frame: RgbaImage::new(width, height),
            scratch: RgbaImage::new(width, height),
        }
    }

    pub fn frame(&self) -> &RgbaImage {
        &self.frame
    }

    /// Paints the cels bottom to top. Returns the area covered by the topmost cel.
    pub fn composite(&mut self, slots: &CelSlots, arena: &mut CelArena) -> Rect {
        self.frame.fill(0);

        let mut content = Rect::default();

        for (layer_index, cel) in slots.iter().enumerate() {
            let Some(cel) = cel else {
                continue;
            };

            content = cel.bounds.intersect(&self.canvas);

            clamp_indices(
                arena.get_mut(cel.image),
                self.palette.len(),
                self.transparent_index,
            );

            let mode = self.layers[layer_index]
                .blend_mode()
                .filter(|mode| *mode != BlendMode::Normal);

            self.paint(cel, arena.get(cel.image), mode);
        }

        content
    }

    fn paint(&mut self, cel: &Cel, image: &CelImage, mode: Option<BlendMode>) {
        let area = cel.bounds.intersect(&self.canvas);

        if area.is_empty() {
            return;
        }

        let palette: &Palette = self.palette;
        let (frame, scratch) = (&mut self.frame, &mut self.scratch);

        let rows = area.y as u32..area.bottom() as u32;
        let columns = area.x as u32..area.right() as u32;
        let local = |x: u32, y: u32| {
            (
                (x as i64 - cel.bounds.x as i64) as u32,
                (y as i64 - cel.bounds.y as i64) as u32,
            )
        };

        match mode {
            Some(mode) => {
                scratch.fill(0);

                for y in rows.clone() {
                    for x in columns.clone() {
                        let (cx, cy) = local(x, y);
                        let backdrop = frame.get_pixel(x, y).0;
                        let source = cel_pixel(image, palette, cx, cy);

                        scratch.put_pixel(x, y, Rgba(mode.apply(backdrop, source)));
                    }
                }

                for y in rows {
                    for x in columns.clone() {
                        let source = scratch.get_pixel(x, y).0;
                        let pixel = frame.get_pixel_mut(x, y);

                        pixel.0 = over(pixel.0, source, cel.opacity);
                    }
                }
            }
            None => {
                for y in rows {
                    for x in columns.clone() {
                        let (cx, cy) = local(x, y);
                        let source = cel_pixel(image, palette, cx, cy);
                        let pixel = frame.get_pixel_mut(x, y);

                        pixel.0 = over(pixel.0, source, cel.opacity);
                    }
                }
            }
        }
    }
}

pub(crate) struct Atlas {
    pub image: RgbaImage,
    pub frames: Vec<Rect>,
    pub content_bounds: Vec<Rect>,
}

/// Composites every frame and packs the results into one grid image.
pub(crate) fn build_atlas(
    header: &Header,
    palette: &Palette,
    layers: &[Layer],
    cels: &[CelSlots],
    arena: &mut CelArena,
) -> Atlas {
    let layout = atlas_layout(cels.len(), header.width as u32, header.height as u32);

    debug!(
        "atlas {}x{} for {} frames",
        layout.width,
        layout.height,
        cels.len()
    );

    let mut image = RgbaImage::new(layout.width, layout.height);
    let mut compositor = Compositor::new(header, palette, layers);
    let mut content_bounds = Vec::with_capacity(cels.len());

    for (slots, rect) in cels.iter().zip(&layout.frames) {
        content_bounds.push(compositor.composite(slots, arena));
        imageops::replace(&mut image, compositor.frame(), rect.x as i64, rect.y as i64);
    }

    Atlas {
        image,
        frames: layout.frames,
        content_bounds,
    }
}
