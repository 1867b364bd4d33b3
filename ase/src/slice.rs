use bitflags::bitflags;
use log::{debug, warn};
use nom::{Parser, multi::count, number::complete::le_u32};

use crate::{
    container::{ChunkKind, RawFrame},
    error::AseError,
    nom_helpers::{IResult, ase_point, ase_rect, ase_string},
    types::{Slice, SliceFrame},
    user_data::trailing_user_data,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct SliceFlags: u32 {
        const NINE_PATCH = 1;
        const PIVOT = 1 << 1;
    }
}

/// Geometry authored at one frame, held until the next key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SliceKey {
    pub frame: u32,
    pub geometry: SliceFrame,
}

fn parse_slice_key(i: &[u8], flags: SliceFlags) -> IResult<'_, SliceKey> {
    let (i, (frame, bounds)) = (le_u32, ase_rect).parse(i)?;

    let (i, center) = if flags.contains(SliceFlags::NINE_PATCH) {
        let (i, center) = ase_rect(i)?;
        (i, Some(center))
    } else {
        (i, None)
    };

    let (i, pivot) = if flags.contains(SliceFlags::PIVOT) {
        let (i, pivot) = ase_point(i)?;
        (i, Some(pivot))
    } else {
        (i, None)
    };

    Ok((
        i,
        SliceKey {
            frame,
            geometry: SliceFrame {
                bounds,
                center,
                pivot,
            },
        },
    ))
}

fn parse_slice_chunk(i: &[u8]) -> IResult<'_, (String, Vec<SliceKey>)> {
    let (i, (key_count, flags, _, name)) = (le_u32, le_u32, le_u32, ase_string).parse(i)?;
    let flags = SliceFlags::from_bits_retain(flags);

    let (i, keys) = count(|i| parse_slice_key(i, flags), key_count as usize).parse(i)?;

    Ok((i, (name, keys)))
}

/// One geometry per frame. The first key also covers the frames before it.
pub(crate) fn expand_keys(keys: &[SliceKey], frame_count: usize) -> Vec<SliceFrame> {
    let mut keys = keys.to_vec();
    keys.sort_by_key(|key| key.frame);

    let Some(first) = keys.first() else {
        return vec![];
    };

    let mut current = first.geometry;
    let mut next = 0;

    (0..frame_count)
        .map(|frame| {
            while let Some(key) = keys.get(next).filter(|key| key.frame as usize <= frame) {
                current = key.geometry;
                next += 1;
            }

            current
        })
        .collect()
}

pub(crate) fn build_slices(
    first_frame: &RawFrame<'_>,
    frame_count: usize,
) -> Result<Vec<Slice>, AseError> {
    let mut slices = vec![];

    for (index, chunk) in first_frame.chunks.iter().enumerate() {
        if chunk.kind != ChunkKind::Slice {
            continue;
        }

        let (_, (name, keys)) = parse_slice_chunk(chunk.data)?;

        if let Some(key) = keys.iter().find(|key| key.frame as usize >= frame_count) {
            warn!(
                "slice `{name}` has a key at frame {} of {frame_count}",
                key.frame
            );
        }

        slices.push(Slice {
            frames: expand_keys(&keys, frame_count),
            user_data: trailing_user_data(&first_frame.chunks, index)?.unwrap_or_default(),
            name,
        });
    }

    debug!("{} slices", slices.len());

    Ok(slices)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        container::parse_container,
        fixture::{FrameWriter, SliceChunk, SpriteWriter, user_data_chunk},
        types::{Point, Rect},
    };

    fn key(frame: u32, x: i32) -> SliceKey {
        SliceKey {
            frame,
            geometry: SliceFrame {
                bounds: Rect::new(x, 0, 4, 4),
                center: None,
                pivot: None,
            },
        }
    }

    fn xs(frames: &[SliceFrame]) -> Vec<i32> {
        frames.iter().map(|frame| frame.bounds.x).collect()
    }

    #[test]
    fn keys_hold_until_next() {
        let frames = expand_keys(&[key(0, 1), key(3, 2)], 5);

        assert_eq!(xs(&frames), vec![1, 1, 1, 2, 2]);
    }

    #[test]
    fn first_key_backfills() {
        let frames = expand_keys(&[key(2, 7), key(4, 9)], 5);

        assert_eq!(xs(&frames), vec![7, 7, 7, 7, 9]);
    }

    #[test]
    fn keys_past_the_end_are_ignored() {
        let frames = expand_keys(&[key(1, 3), key(10, 4)], 3);

        assert_eq!(xs(&frames), vec![3, 3, 3]);
    }

    #[test]
    fn no_keys() {
        assert_eq!(expand_keys(&[], 4), vec![]);
    }

    fn slices(frame: FrameWriter) -> Vec<Slice> {
        let bytes = SpriteWriter::new(8, 8, 32)
            .frame(frame)
            .frame(FrameWriter::new(100))
            .build();
        let container = parse_container(&bytes).unwrap();

        build_slices(&container.frames[0], container.frames.len()).unwrap()
    }

    #[test]
    fn nine_patch_and_pivot() {
        let chunk = SliceChunk::new("button")
            .center(Rect::new(1, 1, 2, 2))
            .pivot(Point { x: 2, y: 3 })
            .key(0, Rect::new(0, 0, 4, 4))
            .key(1, Rect::new(4, 4, 4, 4))
            .build();

        let slices = slices(
            FrameWriter::new(100)
                .chunk(0x2022, chunk)
                .chunk(0x2020, user_data_chunk(Some("clickable"), None)),
        );

        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].name, "button");
        assert_eq!(slices[0].user_data.text, "clickable");
        assert_eq!(
            slices[0].frames[1],
            SliceFrame {
                bounds: Rect::new(4, 4, 4, 4),
                center: Some(Rect::new(1, 1, 2, 2)),
                pivot: Some(Point { x: 2, y: 3 }),
            }
        );
    }

    #[test]
    fn every_slice_chunk_is_read() {
        let frame = FrameWriter::new(100)
            .chunk(0x2022, SliceChunk::new("a").key(0, Rect::new(0, 0, 1, 1)).build())
            .chunk(0x2022, SliceChunk::new("b").key(1, Rect::new(0, 0, 2, 2)).build());

        let slices = slices(frame);

        assert_eq!(slices.len(), 2);
        assert_eq!(slices[1].frames[0].bounds, Rect::new(0, 0, 2, 2));
        assert!(slices[1].user_data.is_empty());
    }
}
