use log::debug;
use nom::{
    Parser,
    bytes::complete::take,
    number::complete::{le_u8, le_u16},
};

use crate::{
    container::{ChunkKind, RawFrame},
    error::AseError,
    nom_helpers::{IResult, ase_string},
    types::{Header, HeaderFlags, Layer, LayerFlags, LayerType, UserData},
    user_data::trailing_user_data,
};

struct RawLayer {
    flags: u16,
    layer_type: u16,
    child_level: u16,
    blend_mode_id: u16,
    opacity: u8,
    name: String,
}

fn parse_raw_layer(i: &[u8]) -> IResult<'_, RawLayer> {
    let (i, (flags, layer_type, child_level, _default_width, _default_height, blend_mode_id)) =
        (le_u16, le_u16, le_u16, le_u16, le_u16, le_u16).parse(i)?;
    let (i, (opacity, _, name)) = (le_u8, take(3usize), ase_string).parse(i)?;

    Ok((
        i,
        RawLayer {
            flags,
            layer_type,
            child_level,
            blend_mode_id,
            opacity,
            name,
        },
    ))
}

pub(crate) fn parse_layer(i: &[u8], header_flags: HeaderFlags) -> Result<Layer, AseError> {
    let (_, raw) = parse_raw_layer(i)?;

    let layer_type = match raw.layer_type {
        0 => LayerType::Normal,
        1 => LayerType::Group,
        // tilemaps and anything newer
        layer_type => return Err(AseError::UnsupportedLayerType { layer_type }),
    };

    // The oldest files leave the opacity byte undefined and say so in the header.
    let opacity = if header_flags.contains(HeaderFlags::LAYER_OPACITY_VALID) {
        raw.opacity
    } else {
        255
    };

    Ok(Layer {
        name: raw.name,
        flags: LayerFlags::from_bits_retain(raw.flags),
        layer_type,
        child_level: raw.child_level,
        blend_mode_id: raw.blend_mode_id,
        opacity,
        user_data: UserData::default(),
    })
}

/// Layers in file order, which is also paint order.
pub(crate) fn build_layers(
    header: &Header,
    first_frame: &RawFrame<'_>,
) -> Result<Vec<Layer>, AseError> {
    let chunks = &first_frame.chunks;
    let mut layers = vec![];

    for (index, chunk) in chunks.iter().enumerate() {
        if chunk.kind != ChunkKind::Layer {
            continue;
        }

        let mut layer = parse_layer(chunk.data, header.flags)?;

        if let Some(user_data) = trailing_user_data(chunks, index)? {
            layer.user_data = user_data;
        }

        layers.push(layer);
    }

    debug!("{} layers", layers.len());

    Ok(layers)
}
