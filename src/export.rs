// export.rs
//
// Plain-text transcript export: a literal header block with the source
// file name and timestamp, saved next to the user's other files.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// File name for an exported transcript. With a source file, its basename
/// (up to the first dot) plus `-transcription.txt`; otherwise a
/// timestamped fallback.
pub fn export_file_name(source_name: Option<&str>, now: DateTime<Local>) -> String {
    match source_name {
        Some(name) => {
            let base = name.split('.').next().unwrap_or(name);
            format!("{base}-transcription.txt")
        }
        None => {
            let stamp: String = now
                .to_rfc3339()
                .chars()
                .map(|c| if c == ':' || c == '.' { '-' } else { c })
                .collect();
            format!("transcription-{stamp}.txt")
        }
    }
}

/// Render the exported document: header block, then the transcript body.
pub fn render_transcript(source_name: Option<&str>, text: &str, now: DateTime<Local>) -> String {
    format!(
        "Transcription\n=============\n\nFile: {}\nDate: {}\n\n{}",
        source_name.unwrap_or("(none)"),
        now.format("%Y-%m-%d %H:%M:%S"),
        text
    )
}

/// Write the rendered transcript into `dir`; returns the created path.
pub fn save_transcript(
    dir: &Path,
    source_name: Option<&str>,
    text: &str,
) -> std::io::Result<PathBuf> {
    let now = Local::now();
    let path = dir.join(export_file_name(source_name, now));
    let mut file = std::fs::File::create(&path)?;
    file.write_all(render_transcript(source_name, text, now).as_bytes())?;
    Ok(path)
}
