//! Writes decoded images next to the input or into the configured folder.
use std::path::{Path, PathBuf};

use ase::Sprite;
use eyre::eyre;
use image::imageops;
use log::info;

/// `output` if given, otherwise the configured folder, otherwise the input's folder.
pub fn output_root(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default()
}

fn file_stem(input: &Path) -> eyre::Result<String> {
    input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .ok_or_else(|| eyre!("Cannot name output after `{}`", input.display()))
}

pub fn atlas_path(input: &Path, output_dir: Option<&Path>) -> eyre::Result<PathBuf> {
    Ok(output_root(input, output_dir).join(format!("{}.png", file_stem(input)?)))
}

/// One file per frame, suffixed with its index.
pub fn frame_path(input: &Path, dir: &Path, frame_index: usize) -> eyre::Result<PathBuf> {
    Ok(dir.join(format!("{}_{frame_index}.png", file_stem(input)?)))
}

pub fn write_atlas(sprite: &Sprite, path: &Path) -> eyre::Result<()> {
    sprite.atlas.save(path)?;

    info!("wrote atlas to {}", path.display());

    Ok(())
}

pub fn write_frames(sprite: &Sprite, input: &Path, dir: &Path, trim: bool) -> eyre::Result<usize> {
    std::fs::create_dir_all(dir)?;

    for (frame_index, frame) in sprite.frames.iter().enumerate() {
        let Some(image) = sprite.frame_image(frame_index) else {
            return Err(eyre!("Frame {frame_index} is outside the atlas"));
        };

        let image = if trim {
            let content = frame.content_bounds;

            // an empty frame keeps its full canvas so every index still gets a file
            if content.is_empty() {
                image
            } else {
                imageops::crop_imm(
                    &image,
                    content.x as u32,
                    content.y as u32,
                    content.width,
                    content.height,
                )
                .to_image()
            }
        } else {
            image
        };

        let path = frame_path(input, dir, frame_index)?;
        image.save(&path)?;

        info!("wrote frame {frame_index} to {}", path.display());
    }

    Ok(sprite.frames.len())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn atlas_next_to_input() {
        let path = atlas_path(Path::new("art/hero.aseprite"), None).unwrap();

        assert_eq!(path, PathBuf::from("art/hero.png"));
    }

    #[test]
    fn configured_output_dir_wins() {
        let path = atlas_path(Path::new("art/hero.aseprite"), Some(Path::new("out"))).unwrap();

        assert_eq!(path, PathBuf::from("out/hero.png"));
    }

    #[test]
    fn frames_are_suffixed() {
        let path = frame_path(Path::new("art/hero.ase"), Path::new("out"), 3).unwrap();

        assert_eq!(path, PathBuf::from("out/hero_3.png"));
    }
}
