use std::io::{Cursor, Read};

use thiserror::Error;

use super::content_type::{content_type_for, file_extension};
use crate::blob::is_valid_object_key;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no HTML entry point found in archive")]
    NoEntryPoint,
    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("unsafe entry path in archive: {0}")]
    UnsafeEntryPath(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One file extracted from an upload, ready to be written to the bucket.
#[derive(Debug, Clone)]
pub struct BundleEntry {
    /// Path relative to the per-upload folder.
    pub path: String,
    pub data: Vec<u8>,
    pub content_type: &'static str,
}

/// The result of ingesting an upload: the files to store plus the path of the
/// HTML document a browser should load first.
#[derive(Debug)]
pub struct GameBundle {
    pub entries: Vec<BundleEntry>,
    pub entry_point: String,
}

const SINGLE_FILE_PATH: &str = "index.html";

fn has_hidden_segment(name: &str) -> bool {
    name.split('/').any(|segment| segment.starts_with('.'))
}

/// Ingests an uploaded game file.
///
/// The upload kind is decided solely by the original file name's extension: a
/// `zip` (case-insensitive) is walked entry by entry, anything else is treated
/// as a single HTML document stored at `index.html`. Content is never sniffed.
/// Directory entries, `__MACOSX` folders, and hidden files are dropped
/// silently; only traversal attempts fail the upload.
///
/// Entry-point selection walks the archive in order: any `.html` file becomes
/// the entry point while none is chosen, and a name ending in `index.html`
/// always takes over. A plain `.html` seen later never displaces an
/// already-chosen entry point.
pub fn ingest_upload(file_name: &str, data: &[u8]) -> Result<GameBundle, IngestError> {
    let is_zip = file_extension(file_name).is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));

    if !is_zip {
        return Ok(GameBundle {
            entries: vec![BundleEntry {
                path: SINGLE_FILE_PATH.to_string(),
                data: data.to_vec(),
                content_type: "text/html",
            }],
            entry_point: SINGLE_FILE_PATH.to_string(),
        });
    }

    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
    let mut entries = Vec::new();
    let mut entry_point: Option<String> = None;

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        let name = file.name().to_string();

        // Traversal attempts abort the whole upload.
        if name.starts_with('/') || name.split('/').any(|segment| segment == "..") {
            return Err(IngestError::UnsafeEntryPath(name));
        }

        // Directories, macOS metadata folders, and hidden files such as
        // .DS_Store are junk that rides along in hand-made zips; drop them
        // without failing the upload.
        if file.is_dir() || name.contains("__MACOSX") || has_hidden_segment(&name) {
            continue;
        }

        if !is_valid_object_key(&name) {
            return Err(IngestError::UnsafeEntryPath(name));
        }

        // Whole entry is buffered; archive size is bounded by available memory.
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;

        if name.ends_with("index.html") || entry_point.is_none() {
            if name.ends_with(".html") {
                entry_point = Some(name.clone());
            }
        }

        let content_type = content_type_for(&name);
        entries.push(BundleEntry {
            path: name,
            data: content,
            content_type,
        });
    }

    let entry_point = entry_point.ok_or(IngestError::NoEntryPoint)?;

    Ok(GameBundle {
        entries,
        entry_point,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);

        for (name, data) in entries {
            if name.ends_with('/') {
                writer.add_directory(name.trim_end_matches('/'), options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
        }

        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_single_file_upload() {
        let bundle = ingest_upload("my-game.html", b"<html></html>").unwrap();

        assert_eq!(bundle.entries.len(), 1);
        assert_eq!(bundle.entries[0].path, "index.html");
        assert_eq!(bundle.entries[0].content_type, "text/html");
        assert_eq!(bundle.entry_point, "index.html");
    }

    #[test]
    fn test_single_file_never_inspected() {
        // Not actually HTML; the single-file branch trusts the extension rule.
        let bundle = ingest_upload("whatever.htm", b"\x00\x01binary").unwrap();
        assert_eq!(bundle.entry_point, "index.html");
        assert_eq!(bundle.entries[0].content_type, "text/html");
    }

    #[test]
    fn test_zip_prefers_later_index_html() {
        let data = build_zip(&[
            ("readme.txt", b"hi"),
            ("level.html", b"<html>level</html>"),
            ("index.html", b"<html>main</html>"),
        ]);

        let bundle = ingest_upload("game.zip", &data).unwrap();
        assert_eq!(bundle.entry_point, "index.html");
    }

    #[test]
    fn test_zip_first_html_wins_over_later_plain_html() {
        let data = build_zip(&[
            ("index.html", b"<html>main</html>"),
            ("level.html", b"<html>level</html>"),
        ]);

        let bundle = ingest_upload("game.zip", &data).unwrap();
        assert_eq!(bundle.entry_point, "index.html");
    }

    #[test]
    fn test_zip_nested_index_overwrites_default() {
        let data = build_zip(&[
            ("help.html", b"<html>help</html>"),
            ("www/index.html", b"<html>main</html>"),
        ]);

        let bundle = ingest_upload("game.zip", &data).unwrap();
        assert_eq!(bundle.entry_point, "www/index.html");
    }

    #[test]
    fn test_zip_plain_html_fallback() {
        let data = build_zip(&[("a.png", b"png"), ("game.html", b"<html></html>")]);

        let bundle = ingest_upload("bundle.ZIP", &data).unwrap();
        assert_eq!(bundle.entry_point, "game.html");
    }

    #[test]
    fn test_zip_without_html_fails() {
        let data = build_zip(&[("a.png", b"png"), ("b.js", b"js")]);

        let result = ingest_upload("game.zip", &data);
        assert!(matches!(result, Err(IngestError::NoEntryPoint)));
    }

    #[test]
    fn test_zip_skips_directories_and_macosx() {
        let data = build_zip(&[
            ("assets/", b""),
            ("__MACOSX/._index.html", b"junk"),
            ("index.html", b"<html></html>"),
            ("assets/sprite.png", b"png"),
        ]);

        let bundle = ingest_upload("game.zip", &data).unwrap();
        let paths: Vec<&str> = bundle.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["index.html", "assets/sprite.png"]);
    }

    #[test]
    fn test_zip_skips_hidden_files() {
        // Finder-made archives carry .DS_Store entries outside __MACOSX too.
        let data = build_zip(&[
            (".DS_Store", b"junk"),
            ("index.html", b"<html></html>"),
            ("assets/.DS_Store", b"junk"),
            ("assets/sprite.png", b"png"),
        ]);

        let bundle = ingest_upload("game.zip", &data).unwrap();
        let paths: Vec<&str> = bundle.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["index.html", "assets/sprite.png"]);
        assert_eq!(bundle.entry_point, "index.html");
    }

    #[test]
    fn test_zip_entry_content_types() {
        let data = build_zip(&[
            ("index.html", b"<html></html>"),
            ("main.js", b"js"),
            ("data.bin", b"bin"),
        ]);

        let bundle = ingest_upload("game.zip", &data).unwrap();
        let types: Vec<&str> = bundle.entries.iter().map(|e| e.content_type).collect();
        assert_eq!(
            types,
            vec!["text/html", "application/javascript", "application/octet-stream"]
        );
    }

    #[test]
    fn test_zip_traversal_rejected() {
        let data = build_zip(&[("../evil.html", b"<html></html>")]);

        let result = ingest_upload("game.zip", &data);
        assert!(matches!(result, Err(IngestError::UnsafeEntryPath(_))));
    }
}
