//! Annotations ride in a user data chunk placed right after the chunk they describe.
use bitflags::bitflags;
use nom::{Parser, number::complete::le_u32};

use crate::{
    container::{Chunk, ChunkKind},
    error::AseError,
    nom_helpers::{IResult, ase_color, ase_string},
    types::UserData,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct UserDataFlags: u32 {
        const TEXT = 1;
        const COLOR = 1 << 1;
        const PROPERTIES = 1 << 2;
    }
}

pub(crate) fn parse_user_data(i: &[u8]) -> IResult<'_, UserData> {
    let (i, flags) = le_u32.parse(i)?;
    let flags = UserDataFlags::from_bits_retain(flags);

    let (i, text) = if flags.contains(UserDataFlags::TEXT) {
        ase_string(i)?
    } else {
        (i, String::new())
    };

    let (i, color) = if flags.contains(UserDataFlags::COLOR) {
        let (i, color) = ase_color(i)?;
        (i, Some(color))
    } else {
        (i, None)
    };

    // property maps are not interpreted
    Ok((i, UserData { text, color }))
}

/// The annotation for `chunks[index]`, if the next chunk is a user data chunk.
pub(crate) fn trailing_user_data(
    chunks: &[Chunk<'_>],
    index: usize,
) -> Result<Option<UserData>, AseError> {
    match chunks.get(index + 1) {
        Some(chunk) if chunk.kind == ChunkKind::UserData => {
            let (_, user_data) = parse_user_data(chunk.data)?;
            Ok(Some(user_data))
        }
        _ => Ok(None),
    }
}

/// Annotations for a chunk describing several subjects, such as the tags chunk.
///
/// User data chunks after `chunks[index]` are taken in order, one per subject, until
/// `limit` are found or another tags or palette chunk starts.
pub(crate) fn user_data_run(
    chunks: &[Chunk<'_>],
    index: usize,
    limit: usize,
) -> Result<Vec<UserData>, AseError> {
    let mut run = Vec::new();

    for chunk in chunks.iter().skip(index + 1) {
        if run.len() >= limit {
            break;
        }

        match chunk.kind {
            ChunkKind::UserData => {
                let (_, user_data) = parse_user_data(chunk.data)?;
                run.push(user_data);
            }
            ChunkKind::Tags | ChunkKind::Palette => break,
            _ => {}
        }
    }

    Ok(run)
}
