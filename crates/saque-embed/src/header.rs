//! C header rendering for artifact bytes.
//!
//! The artifact's byte buffer is the single source of truth: both the array
//! literal and the length constant derive from the bytes read off disk, so
//! the embedded length can never disagree with the embedded data.

use saque_common::{Result, SaqueError};
use std::path::{Path, PathBuf};

/// Bytes per line in the rendered initializer body.
const BYTES_PER_LINE: usize = 12;

/// A header written to disk.
#[derive(Debug, Clone)]
pub struct GeneratedHeader {
    /// Where the header was written
    pub header_path: PathBuf,
    /// Number of bytes embedded (value of the length constant)
    pub byte_len: usize,
}

/// Render artifact bytes as initializer-body lines, 12 `0x..` values per
/// line, comma after every byte except the last.
pub fn byte_lines(bytes: &[u8]) -> Vec<String> {
    let mut lines = Vec::with_capacity(bytes.len().div_ceil(BYTES_PER_LINE));

    for (line_idx, chunk) in bytes.chunks(BYTES_PER_LINE).enumerate() {
        let mut line = String::with_capacity(chunk.len() * 6);
        for (i, byte) in chunk.iter().enumerate() {
            let global_idx = line_idx * BYTES_PER_LINE + i;
            line.push_str(&format!("0x{byte:02x}"));
            if global_idx + 1 < bytes.len() {
                line.push(',');
                if i + 1 < chunk.len() {
                    line.push(' ');
                }
            }
        }
        lines.push(line);
    }

    lines
}

/// Derive the include guard from an artifact file name: the stem,
/// uppercased, separators normalized to `_`, with `_DATA_H` appended.
pub fn include_guard(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());

    let mut guard: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    guard.push_str("_DATA_H");
    guard
}

/// Render the complete header text.
pub fn render_header(guard: &str, array_name: &str, len_name: &str, bytes: &[u8]) -> String {
    let mut out = String::new();

    out.push_str(&format!("#ifndef {guard}\n"));
    out.push_str(&format!("#define {guard}\n\n"));
    out.push_str("// AUTO-GENERATED CLASSIFIER MODEL DATA\n\n");

    out.push_str(&format!("const unsigned char {array_name}[] = {{\n"));
    for line in byte_lines(bytes) {
        out.push_str(&format!("  {line}\n"));
    }
    out.push_str("};\n\n");

    out.push_str(&format!("const unsigned int {len_name} = {};\n\n", bytes.len()));

    out.push_str(&format!("#endif // {guard}\n"));

    out
}

/// Read an artifact and write its header into `output_dir`.
///
/// The header file is named `<artifact stem>_data.h`.
pub fn generate_header(
    artifact_path: &Path,
    output_dir: &Path,
    array_name: &str,
    len_name: &str,
) -> Result<GeneratedHeader> {
    if !artifact_path.exists() {
        return Err(SaqueError::ArtifactNotFound { path: artifact_path.to_path_buf() });
    }

    let bytes = std::fs::read(artifact_path).map_err(|e| SaqueError::Io {
        context: format!("reading artifact: {}", artifact_path.display()),
        source: e,
    })?;

    std::fs::create_dir_all(output_dir).map_err(|e| SaqueError::Io {
        context: format!("creating output directory: {}", output_dir.display()),
        source: e,
    })?;

    let file_name = artifact_path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = artifact_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let guard = include_guard(&file_name);
    let header = render_header(&guard, array_name, len_name, &bytes);

    let header_path = output_dir.join(format!("{stem}_data.h"));
    std::fs::write(&header_path, header).map_err(|e| SaqueError::Io {
        context: format!("writing header: {}", header_path.display()),
        source: e,
    })?;

    Ok(GeneratedHeader { header_path, byte_len: bytes.len() })
}
