/// Returns the file-name extension (text after the last '.'), if any.
#[must_use]
pub fn file_extension(file_name: &str) -> Option<&str> {
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Maps a file name to a MIME type by its extension, case-insensitively.
/// Browsers refuse to execute scripts and stylesheets served with the wrong
/// type, so bundled game assets need these set explicitly.
#[must_use]
pub fn content_type_for(file_name: &str) -> &'static str {
    let Some(ext) = file_extension(file_name) else {
        return "application/octet-stream";
    };

    match ext.to_ascii_lowercase().as_str() {
        "html" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}
