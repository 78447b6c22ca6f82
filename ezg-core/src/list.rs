use std::io::Cursor;

use zip::ZipArchive;

use crate::error::{EzgError, Result};

pub type PayloadArchive<'a> = ZipArchive<Cursor<&'a [u8]>>;

pub fn open_archive(bytes: &[u8]) -> Result<PayloadArchive<'_>> {
    ZipArchive::new(Cursor::new(bytes)).map_err(|e| EzgError::Archive(e.to_string()))
}

/// Entry names in the archive's own enumeration (central directory) order.
pub fn entry_names(archive: &mut PayloadArchive<'_>) -> Result<Vec<String>> {
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive
            .by_index_raw(i)
            .map_err(|e| EzgError::Archive(format!("entry #{i}: {e}")))?;
        names.push(entry.name().to_string());
    }
    Ok(names)
}

pub fn list(bytes: &[u8]) -> Result<Vec<String>> {
    let mut archive = open_archive(bytes)?;
    entry_names(&mut archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    #[test]
    fn lists_in_enumeration_order() {
        let mut w = ZipWriter::new(Cursor::new(Vec::new()));
        for name in ["zeta.txt", "alpha.stl", "mid/beta.STL"] {
            w.start_file(name, SimpleFileOptions::default()).unwrap();
            w.write_all(name.as_bytes()).unwrap();
        }
        let bytes = w.finish().unwrap().into_inner();

        assert_eq!(list(&bytes).unwrap(), vec!["zeta.txt", "alpha.stl", "mid/beta.STL"]);
    }

    #[test]
    fn garbage_is_an_archive_error() {
        let err = list(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, EzgError::Archive(_)));
    }
}
