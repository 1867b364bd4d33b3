//! Per-layer blend modes, ids as stored in the layer chunk.
//!
//! A blend computes a new source color against the backdrop. The result keeps
//! the source alpha and is later composited with the plain "over" operator.
use crate::types::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum BlendMode {
    Normal = 0,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
    Addition,
    Subtract,
    Divide,
}

const MODES: [BlendMode; 19] = [
    BlendMode::Normal,
    BlendMode::Multiply,
    BlendMode::Screen,
    BlendMode::Overlay,
    BlendMode::Darken,
    BlendMode::Lighten,
    BlendMode::ColorDodge,
    BlendMode::ColorBurn,
    BlendMode::HardLight,
    BlendMode::SoftLight,
    BlendMode::Difference,
    BlendMode::Exclusion,
    BlendMode::Hue,
    BlendMode::Saturation,
    BlendMode::Color,
    BlendMode::Luminosity,
    BlendMode::Addition,
    BlendMode::Subtract,
    BlendMode::Divide,
];

impl BlendMode {
    pub fn from_id(id: u16) -> Option<Self> {
        MODES.get(id as usize).copied()
    }

    /// Source color after blending against `backdrop`.
    ///
    /// Where the backdrop is partly transparent the blended color fades back
    /// towards the unblended source.
    pub fn apply(self, backdrop: Color, source: Color) -> Color {
        let blended = match self {
            BlendMode::Normal => return source,
            BlendMode::Hue => non_separable(backdrop, source, |b, s| {
                set_lum(set_sat(s, sat(b)), lum(b))
            }),
            BlendMode::Saturation => non_separable(backdrop, source, |b, s| {
                set_lum(set_sat(b, sat(s)), lum(b))
            }),
            BlendMode::Color => non_separable(backdrop, source, |b, s| set_lum(s, lum(b))),
            BlendMode::Luminosity => non_separable(backdrop, source, |b, s| set_lum(b, lum(s))),
            separable => {
                let f = separable.channel_fn();
                [
                    f(backdrop[0], source[0]),
                    f(backdrop[1], source[1]),
                    f(backdrop[2], source[2]),
                ]
            }
        };

        let backdrop_alpha = backdrop[3] as u32;
        let inv = 255 - backdrop_alpha;
        let mix = |s: u8, b: u8| div255(inv * s as u32 + backdrop_alpha * b as u32);

        [
            mix(source[0], blended[0]),
            mix(source[1], blended[1]),
            mix(source[2], blended[2]),
            source[3],
        ]
    }

    fn channel_fn(self) -> fn(u8, u8) -> u8 {
        match self {
            BlendMode::Multiply => multiply,
            BlendMode::Screen => screen,
            BlendMode::Overlay => |b, s| hard_light(s, b),
            BlendMode::Darken => |b, s| b.min(s),
            BlendMode::Lighten => |b, s| b.max(s),
            BlendMode::ColorDodge => color_dodge,
            BlendMode::ColorBurn => color_burn,
            BlendMode::HardLight => hard_light,
            BlendMode::SoftLight => soft_light,
            BlendMode::Difference => |b, s| b.abs_diff(s),
            BlendMode::Exclusion => |b, s| {
                let t = mul_un8(b, s) as i32;
                (b as i32 + s as i32 - 2 * t).clamp(0, 255) as u8
            },
            BlendMode::Addition => |b, s| b.saturating_add(s),
            BlendMode::Subtract => |b, s| b.saturating_sub(s),
            BlendMode::Divide => divide,
            // non-separable modes never get here
            _ => |_, s| s,
        }
    }
}

#[inline]
pub(crate) fn div255(v: u32) -> u8 {
    ((v + 127) / 255).min(255) as u8
}

#[inline]
fn mul_un8(a: u8, b: u8) -> u8 {
    let t = a as u32 * b as u32 + 0x80;
    (((t >> 8) + t) >> 8) as u8
}

fn multiply(b: u8, s: u8) -> u8 {
    mul_un8(b, s)
}

fn screen(b: u8, s: u8) -> u8 {
    (b as u32 + s as u32 - mul_un8(b, s) as u32) as u8
}

fn hard_light(b: u8, s: u8) -> u8 {
    if s < 128 {
        multiply(b, s << 1)
    } else {
        screen(b, ((s as u32) << 1).saturating_sub(255) as u8)
    }
}

fn color_dodge(b: u8, s: u8) -> u8 {
    if b == 0 {
        0
    } else if s == 255 {
        255
    } else {
        (b as u32 * 255 / (255 - s as u32)).min(255) as u8
    }
}

fn color_burn(b: u8, s: u8) -> u8 {
    if b == 255 {
        255
    } else if s == 0 {
        0
    } else {
        255 - ((255 - b as u32) * 255 / s as u32).min(255) as u8
    }
}

fn soft_light(b: u8, s: u8) -> u8 {
    let b = b as f64 / 255.;
    let s = s as f64 / 255.;

    let d = if b <= 0.25 {
        ((16. * b - 12.) * b + 4.) * b
    } else {
        b.sqrt()
    };

    let r = if s <= 0.5 {
        b - (1. - 2. * s) * b * (1. - b)
    } else {
        b + (2. * s - 1.) * (d - b)
    };

    (r * 255. + 0.5).clamp(0., 255.) as u8
}

fn divide(b: u8, s: u8) -> u8 {
    if b == 0 {
        0
    } else if b >= s {
        255
    } else {
        (b as u32 * 255 / s as u32) as u8
    }
}

type Rgb = [f64; 3];

fn non_separable(backdrop: Color, source: Color, f: impl Fn(Rgb, Rgb) -> Rgb) -> [u8; 3] {
    let to_unit = |c: Color| [c[0] as f64 / 255., c[1] as f64 / 255., c[2] as f64 / 255.];
    let result = f(to_unit(backdrop), to_unit(source));

    result.map(|c| (c * 255. + 0.5).clamp(0., 255.) as u8)
}

fn lum(c: Rgb) -> f64 {
    0.3 * c[0] + 0.59 * c[1] + 0.11 * c[2]
}

fn sat(c: Rgb) -> f64 {
    c[0].max(c[1]).max(c[2]) - c[0].min(c[1]).min(c[2])
}

fn clip_color(c: Rgb) -> Rgb {
    let l = lum(c);
    let n = c[0].min(c[1]).min(c[2]);
    let x = c[0].max(c[1]).max(c[2]);

    c.map(|v| {
        let mut v = v;

        if n < 0. && l - n != 0. {
            v = l + (v - l) * l / (l - n);
        }

        if x > 1. && x - l != 0. {
            v = l + (v - l) * (1. - l) / (x - l);
        }

        v
    })
}

fn set_lum(c: Rgb, l: f64) -> Rgb {
    let d = l - lum(c);
    clip_color(c.map(|v| v + d))
}

fn set_sat(c: Rgb, s: f64) -> Rgb {
    let max = c[0].max(c[1]).max(c[2]);
    let min = c[0].min(c[1]).min(c[2]);
    let range = max - min;

    if range == 0. {
        return [0.; 3];
    }

    c.map(|v| {
        if v == max {
            s
        } else if v == min {
            0.
        } else {
            (v - min) * s / range
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;

    const OPAQUE_GRAY: Color = [128, 128, 128, 255];

    #[test]
    fn ids_map_in_order() {
        assert_eq!(BlendMode::from_id(0), Some(BlendMode::Normal));
        assert_eq!(BlendMode::from_id(1), Some(BlendMode::Multiply));
        assert_eq!(BlendMode::from_id(18), Some(BlendMode::Divide));
        assert_eq!(BlendMode::from_id(19), None);
    }

    #[test]
    fn multiply_against_opaque_backdrop() {
        let out = BlendMode::Multiply.apply([255, 128, 0, 255], [128, 128, 128, 200]);

        assert_eq!(out, [128, 64, 0, 200]);
    }

    #[test]
    fn screen_against_black_is_source() {
        let out = BlendMode::Screen.apply([0, 0, 0, 255], [10, 20, 30, 255]);
        assert_eq!(out, [10, 20, 30, 255]);
    }

    #[test]
    fn transparent_backdrop_keeps_source() {
        for id in 0..19 {
            let mode = BlendMode::from_id(id).unwrap();
            assert_eq!(mode.apply([0, 0, 0, 0], [12, 34, 56, 78]), [12, 34, 56, 78]);
        }
    }

    #[test]
    fn difference_and_exclusion() {
        assert_eq!(
            BlendMode::Difference.apply([200, 50, 0, 255], [50, 200, 0, 255]),
            [150, 150, 0, 255]
        );
        assert_eq!(
            BlendMode::Exclusion.apply([255, 0, 0, 255], [255, 255, 0, 255]),
            [0, 255, 0, 255]
        );
    }

    #[test]
    fn addition_and_subtract_saturate() {
        assert_eq!(
            BlendMode::Addition.apply([200, 10, 0, 255], [100, 10, 0, 255]),
            [255, 20, 0, 255]
        );
        assert_eq!(
            BlendMode::Subtract.apply([10, 200, 0, 255], [100, 100, 0, 255]),
            [0, 100, 0, 255]
        );
    }

    #[test]
    fn luminosity_of_gray_source() {
        let out = BlendMode::Luminosity.apply([255, 0, 0, 255], OPAQUE_GRAY);
        let l = |c: Color| 0.3 * c[0] as f64 + 0.59 * c[1] as f64 + 0.11 * c[2] as f64;

        assert!((l(out) - 128.).abs() <= 1.5);
    }

    #[test]
    fn darken_lighten() {
        assert_eq!(
            BlendMode::Darken.apply([10, 200, 0, 255], [100, 100, 0, 255]),
            [10, 100, 0, 255]
        );
        assert_eq!(
            BlendMode::Lighten.apply([10, 200, 0, 255], [100, 100, 0, 255]),
            [100, 200, 0, 255]
        );
    }
}
