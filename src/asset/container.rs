//! Binary container framing
//!
//! GLB framing is parsed by [`gltf::binary::Glb`]; this module only decides
//! whether bytes are text or binary and maps framing failures onto
//! [`ViewerError`]. The first chunk must be JSON and an optional BIN chunk
//! supplies buffer 0.
//!
//! Text input (a JSON document whose first significant byte is `{`) passes
//! through unchanged, so callers can hand any asset bytes to [`split`].

use std::borrow::Cow;

use gltf::binary::{ChunkType, Glb};

use crate::error::{Result, ViewerError};

const GLB_HEADER_LEN: usize = 12;

/// The JSON document and optional embedded binary payload of an asset
#[derive(Debug, Clone)]
pub struct Container<'a> {
    pub json: Cow<'a, [u8]>,
    pub bin: Option<Cow<'a, [u8]>>,
    pub is_binary: bool,
}

/// Splits raw asset bytes into their JSON and BIN parts
pub fn split(bytes: &[u8]) -> Result<Container<'_>> {
    if looks_like_json(bytes) {
        return Ok(Container {
            json: Cow::Borrowed(bytes),
            bin: None,
            is_binary: false,
        });
    }

    // The declared length is checked here so the parser only sees the
    // declared span and never a length shorter than its own header
    let declared = bytes
        .get(8..GLB_HEADER_LEN)
        .and_then(|b| <[u8; 4]>::try_from(b).ok())
        .map(|b| u32::from_le_bytes(b) as usize);
    let span = match declared {
        Some(total) if (GLB_HEADER_LEN..=bytes.len()).contains(&total) => &bytes[..total],
        Some(total) if bytes.starts_with(b"glTF") => {
            return Err(ViewerError::MalformedContainer(format!(
                "declared length {} but {} bytes available",
                total,
                bytes.len()
            )))
        }
        _ => bytes,
    };

    let glb = Glb::from_slice(span).map_err(container_error)?;
    Ok(Container {
        json: glb.json,
        bin: glb.bin,
        is_binary: true,
    })
}

fn container_error(error: gltf::Error) -> ViewerError {
    use gltf::binary::Error;

    let gltf::Error::Binary(error) = error else {
        return ViewerError::MalformedContainer(error.to_string());
    };
    match error {
        Error::Version(version) => ViewerError::UnsupportedVersion(format!("container version {}", version)),
        Error::Magic(magic) => ViewerError::MalformedContainer(format!("bad magic {:?}", magic)),
        Error::Io(e) => ViewerError::MalformedContainer(format!("truncated container: {}", e)),
        Error::Length { length, length_read } => ViewerError::MalformedContainer(format!(
            "declared length {} but {} bytes available",
            length, length_read
        )),
        Error::ChunkLength { ty, length, length_read } => ViewerError::MalformedContainer(format!(
            "{} chunk of {} bytes overruns the container ({} left)",
            chunk_name(ty),
            length,
            length_read
        )),
        Error::ChunkType(ChunkType::Bin) => ViewerError::MalformedContainer("first chunk is not JSON".to_string()),
        Error::ChunkType(ty) => ViewerError::MalformedContainer(format!("unexpected {} chunk", chunk_name(ty))),
        Error::UnknownChunkType(ty) => ViewerError::MalformedContainer(format!("unknown chunk type {:?}", ty)),
    }
}

fn chunk_name(ty: ChunkType) -> &'static str {
    match ty {
        ChunkType::Json => "JSON",
        ChunkType::Bin => "BIN",
    }
}

fn looks_like_json(bytes: &[u8]) -> bool {
    let trimmed = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    trimmed
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'{')
}
