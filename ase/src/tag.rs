use log::{debug, warn};
use nom::{
    Parser,
    bytes::complete::take,
    multi::count,
    number::complete::{le_u8, le_u16},
};

use crate::{
    container::{ChunkKind, RawFrame},
    error::AseError,
    nom_helpers::{IResult, ase_string},
    types::{LoopDirection, Tag},
    user_data::user_data_run,
};

struct RawTag {
    from: u16,
    to: u16,
    direction: u8,
    repeat: u16,
    name: String,
}

fn parse_raw_tag(i: &[u8]) -> IResult<'_, RawTag> {
    let (i, (from, to, direction, repeat)) = (le_u16, le_u16, le_u8, le_u16).parse(i)?;
    // reserved, deprecated rgb color, extra byte
    let (i, (_, _, _, name)) = (take(6usize), take(3usize), le_u8, ase_string).parse(i)?;

    Ok((
        i,
        RawTag {
            from,
            to,
            direction,
            repeat,
            name,
        },
    ))
}

fn parse_tags_chunk(i: &[u8]) -> IResult<'_, Vec<RawTag>> {
    let (i, (tag_count, _)) = (le_u16, take(8usize)).parse(i)?;

    count(parse_raw_tag, tag_count as usize).parse(i)
}

/// Only the first tags chunk of the first frame is read.
pub(crate) fn build_tags(
    first_frame: &RawFrame<'_>,
    frame_count: usize,
) -> Result<Vec<Tag>, AseError> {
    let Some(index) = first_frame
        .chunks
        .iter()
        .position(|chunk| chunk.kind == ChunkKind::Tags)
    else {
        return Ok(vec![]);
    };

    let (_, raw_tags) = parse_tags_chunk(first_frame.chunks[index].data)?;
    let mut annotations = user_data_run(&first_frame.chunks, index, raw_tags.len())?.into_iter();

    let tags = raw_tags
        .into_iter()
        .map(|raw| {
            if raw.from > raw.to || raw.to as usize >= frame_count {
                warn!(
                    "tag `{}` spans frames {}..={} of {}",
                    raw.name, raw.from, raw.to, frame_count
                );
            }

            Ok(Tag {
                direction: LoopDirection::try_from(raw.direction)?,
                name: raw.name,
                from: raw.from,
                to: raw.to,
                repeat: raw.repeat,
                user_data: annotations.next().unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<_>, AseError>>()?;

    debug!("{} tags", tags.len());

    Ok(tags)
}
