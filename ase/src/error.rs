#[derive(Debug, thiserror::Error)]
pub enum AseError {
    #[error("Invalid magic number: expected {expected:#06x}, found {found:#06x}")]
    InvalidMagic { expected: u16, found: u16 },
    #[error("Unsupported pixel ratio {width}:{height}")]
    UnsupportedPixelRatio { width: u8, height: u8 },
    #[error("Unsupported color depth: {depth}")]
    UnsupportedColorDepth { depth: u16 },
    #[error("Sprite has no frames")]
    NoFrames,
    #[error("Unexpected end of data: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    #[error("Invalid chunk length {length} in frame {frame}")]
    InvalidChunkLength { frame: usize, length: u32 },
    #[error("Unsupported layer type: {layer_type}")]
    UnsupportedLayerType { layer_type: u16 },
    #[error("Unsupported cel type {cel_type} in frame {frame}")]
    UnsupportedCelType { frame: usize, cel_type: u16 },
    #[error("Cel in frame {frame} targets layer {layer} but there are {layer_count} layers")]
    InvalidLayerIndex {
        frame: usize,
        layer: u16,
        layer_count: usize,
    },
    #[error("Cel in frame {frame} links to frame {target}, which is not an earlier frame")]
    InvalidLinkedCel { frame: usize, target: u16 },
    #[error("Invalid loop direction: {direction}")]
    InvalidLoopDirection { direction: u8 },
    #[error("Error inflating cel data: {source}")]
    Decompress {
        #[source]
        source: std::io::Error,
    },
    #[error("Error parsing sprite: {source}")]
    NomError {
        #[source]
        source: nom::Err<nom::error::Error<Vec<u8>>>,
    },
    #[error("Error opening sprite: {source}")]
    IOError {
        #[source]
        source: std::io::Error,
    },
}

impl AseError {
    /// Everything except [`AseError::IOError`] describes malformed input.
    pub fn is_format_error(&self) -> bool {
        !matches!(self, Self::IOError { .. })
    }
}

impl From<nom::Err<nom::error::Error<&[u8]>>> for AseError {
    fn from(value: nom::Err<nom::error::Error<&[u8]>>) -> Self {
        Self::NomError {
            source: value.to_owned(),
        }
    }
}
