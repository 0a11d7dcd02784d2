//! Dictionary serialization.

use crate::aggregator::OutputDictionary;
use crate::error::{Result, ScanError};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Mode given to a dictionary that did not exist before.
#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

/// Writes an [`OutputDictionary`] as 4-space indented JSON.
pub struct DictionaryWriter;

impl DictionaryWriter {
    /// Render the document exactly as it is written to disk.
    pub fn render(dictionary: &OutputDictionary) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        dictionary.serialize(&mut serializer)?;
        buffer.push(b'\n');
        Ok(buffer)
    }

    /// Write the dictionary to `path`, replacing any previous content.
    ///
    /// The document goes to a temporary file in the same directory first and
    /// is then renamed over `path`, so readers never see a partial file.
    pub fn write(dictionary: &OutputDictionary, path: &Path) -> Result<()> {
        let output_error = |source| ScanError::Output {
            path: path.display().to_string(),
            source,
        };

        let contents = Self::render(dictionary)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(output_error)?;

        let mut file = NamedTempFile::new_in(dir).map_err(output_error)?;
        file.write_all(&contents).map_err(output_error)?;
        file.as_file().sync_all().map_err(output_error)?;
        apply_permissions(&file, path).map_err(output_error)?;
        file.persist(path).map_err(|e| output_error(e.error))?;

        tracing::info!(
            path = %path.display(),
            tables = dictionary.dictionary.len(),
            fields = dictionary.field_count(),
            "Dictionary written"
        );

        Ok(())
    }
}

/// Give the temporary file the mode the dictionary should end up with.
///
/// Temporary files are created owner-only. An existing dictionary keeps its
/// mode; a new one gets [`NEW_FILE_MODE`].
#[cfg(unix)]
fn apply_permissions(file: &NamedTempFile, path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let permissions = match std::fs::metadata(path) {
        Ok(existing) => existing.permissions(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            std::fs::Permissions::from_mode(NEW_FILE_MODE)
        }
        Err(e) => return Err(e),
    };
    file.as_file().set_permissions(permissions)
}

#[cfg(not(unix))]
fn apply_permissions(_file: &NamedTempFile, _path: &Path) -> std::io::Result<()> {
    Ok(())
}
