//! Serializable views of a decoded sprite for `info` and `probe`.
use std::fmt::{self, Display, Write};

use ase::{ColorModel, Rect, Slice, SliceFrame, Sprite, SpriteConfig, Tag, UserData};
use serde::Serialize;

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct RectSummary {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl From<Rect> for RectSummary {
    fn from(rect: Rect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }
}

impl Display for RectSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} at ({}, {})", self.width, self.height, self.x, self.y)
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct UserDataSummary {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<[u8; 4]>,
}

impl UserDataSummary {
    fn from_user_data(user_data: &UserData) -> Option<Self> {
        (!user_data.is_empty()).then(|| Self {
            text: user_data.text.clone(),
            color: user_data.color,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct FrameSummary {
    pub atlas: RectSummary,
    pub content: RectSummary,
    pub duration_ms: u64,
    pub user_data: Vec<UserDataSummary>,
}

#[derive(Debug, Serialize)]
pub struct LayerSummary {
    pub name: String,
    pub visible: bool,
    pub blend_mode: String,
    pub opacity: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<UserDataSummary>,
}

#[derive(Debug, Serialize)]
pub struct TagSummary {
    pub name: String,
    pub from: u16,
    pub to: u16,
    pub direction: String,
    pub repeat: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<UserDataSummary>,
}

impl From<&Tag> for TagSummary {
    fn from(tag: &Tag) -> Self {
        Self {
            name: tag.name.clone(),
            from: tag.from,
            to: tag.to,
            direction: format!("{:?}", tag.direction),
            repeat: tag.repeat,
            user_data: UserDataSummary::from_user_data(&tag.user_data),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SliceFrameSummary {
    pub bounds: RectSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<RectSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot: Option<(i32, i32)>,
}

impl From<&SliceFrame> for SliceFrameSummary {
    fn from(frame: &SliceFrame) -> Self {
        Self {
            bounds: frame.bounds.into(),
            center: frame.center.map(RectSummary::from),
            pivot: frame.pivot.map(|pivot| (pivot.x, pivot.y)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SliceSummary {
    pub name: String,
    pub frames: Vec<SliceFrameSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<UserDataSummary>,
}

impl From<&Slice> for SliceSummary {
    fn from(slice: &Slice) -> Self {
        Self {
            name: slice.name.clone(),
            frames: slice.frames.iter().map(SliceFrameSummary::from).collect(),
            user_data: UserDataSummary::from_user_data(&slice.user_data),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SpriteSummary {
    pub width: u16,
    pub height: u16,
    pub color_depth: String,
    pub atlas_width: u32,
    pub atlas_height: u32,
    pub frames: Vec<FrameSummary>,
    pub layers: Vec<LayerSummary>,
    pub tags: Vec<TagSummary>,
    pub slices: Vec<SliceSummary>,
    pub layer_data: Vec<String>,
}

impl From<&Sprite> for SpriteSummary {
    fn from(sprite: &Sprite) -> Self {
        let frames = sprite
            .frames
            .iter()
            .map(|frame| FrameSummary {
                atlas: frame.bounds.into(),
                content: frame.content_bounds.into(),
                duration_ms: frame.duration.as_millis() as u64,
                user_data: frame
                    .user_data
                    .iter()
                    .filter_map(UserDataSummary::from_user_data)
                    .collect(),
            })
            .collect();

        let layers = sprite
            .layers
            .iter()
            .map(|layer| LayerSummary {
                name: layer.name.clone(),
                visible: layer.is_visible(),
                blend_mode: layer
                    .blend_mode()
                    .map(|mode| format!("{mode:?}"))
                    .unwrap_or_else(|| format!("Unknown({})", layer.blend_mode_id)),
                opacity: layer.opacity,
                user_data: UserDataSummary::from_user_data(&layer.user_data),
            })
            .collect();

        Self {
            width: sprite.header.width,
            height: sprite.header.height,
            color_depth: format!("{:?}", sprite.header.color_depth),
            atlas_width: sprite.atlas.width(),
            atlas_height: sprite.atlas.height(),
            frames,
            layers,
            tags: sprite.tags.iter().map(TagSummary::from).collect(),
            slices: sprite.slices.iter().map(SliceSummary::from).collect(),
            layer_data: sprite.layer_data.clone(),
        }
    }
}

impl Display for SpriteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}x{} {} sprite, atlas {}x{}",
            self.width, self.height, self.color_depth, self.atlas_width, self.atlas_height
        )?;

        writeln!(f, "frames: {}", self.frames.len())?;
        for (index, frame) in self.frames.iter().enumerate() {
            writeln!(
                f,
                "  #{index}: {}ms, atlas {}, content {}",
                frame.duration_ms, frame.atlas, frame.content
            )?;
        }

        writeln!(f, "layers: {}", self.layers.len())?;
        for layer in &self.layers {
            let hidden = if layer.visible { "" } else { " (hidden)" };

            writeln!(
                f,
                "  {}{hidden}: {}, opacity {}",
                layer.name, layer.blend_mode, layer.opacity
            )?;
        }

        writeln!(f, "tags: {}", self.tags.len())?;
        for tag in &self.tags {
            writeln!(
                f,
                "  {}: frames {}..={} {}, repeat {}",
                tag.name, tag.from, tag.to, tag.direction, tag.repeat
            )?;
        }

        writeln!(f, "slices: {}", self.slices.len())?;
        for slice in &self.slices {
            let first = slice
                .frames
                .first()
                .map(|frame| frame.bounds.to_string())
                .unwrap_or_else(|| "no keys".to_string());

            writeln!(f, "  {}: {first}", slice.name)?;
        }

        if !self.layer_data.is_empty() {
            writeln!(f, "layer data:")?;
            for text in &self.layer_data {
                writeln!(f, "  {text}")?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ProbeSummary {
    pub width: u32,
    pub height: u32,
    pub atlas_width: u32,
    pub atlas_height: u32,
    pub frame_count: usize,
    pub color_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub palette: Option<Vec<[u8; 4]>>,
}

impl From<&SpriteConfig> for ProbeSummary {
    fn from(config: &SpriteConfig) -> Self {
        let (color_model, palette) = match &config.color_model {
            ColorModel::Indexed(palette) => ("indexed", Some(palette.clone())),
            ColorModel::Grayscale => ("grayscale", None),
            ColorModel::Rgba => ("rgba", None),
        };

        Self {
            width: config.width,
            height: config.height,
            atlas_width: config.atlas_width,
            atlas_height: config.atlas_height,
            frame_count: config.frame_count,
            color_model: color_model.to_string(),
            palette,
        }
    }
}

impl Display for ProbeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut model = self.color_model.clone();

        if let Some(palette) = &self.palette {
            let _ = write!(model, " ({} colors)", palette.len());
        }

        writeln!(
            f,
            "{}x{} {model}, {} frames, atlas {}x{}",
            self.width, self.height, self.frame_count, self.atlas_width, self.atlas_height
        )
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn probe_of_indexed_sprite() {
        let config = SpriteConfig {
            width: 16,
            height: 8,
            atlas_width: 32,
            atlas_height: 16,
            frame_count: 3,
            color_model: ColorModel::Indexed(vec![[0, 0, 0, 0], [255, 0, 0, 255]]),
        };

        let summary = ProbeSummary::from(&config);

        assert_eq!(summary.to_string(), "16x8 indexed (2 colors), 3 frames, atlas 32x16\n");

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["palette"][1], serde_json::json!([255, 0, 0, 255]));
    }

    #[test]
    fn empty_user_data_is_omitted() {
        assert_eq!(UserDataSummary::from_user_data(&UserData::default()), None);

        let summary = UserDataSummary::from_user_data(&UserData {
            text: "note".into(),
            color: None,
        })
        .unwrap();
        let json = serde_json::to_string(&summary).unwrap();

        assert_eq!(json, r#"{"text":"note"}"#);
    }

    #[test]
    fn slice_frame_without_extras() {
        let summary = SliceFrameSummary::from(&SliceFrame {
            bounds: Rect::new(1, 2, 3, 4),
            center: None,
            pivot: None,
        });

        assert_eq!(
            serde_json::to_string(&summary).unwrap(),
            r#"{"bounds":{"x":1,"y":2,"width":3,"height":4}}"#
        );
    }
}
