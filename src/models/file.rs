//! Media attachments.

use crate::models::{de_flag, de_num, de_opt_num, de_opt_text, de_text, macros::str_opt_ref};
use serde::{Deserialize, Serialize};

/// Resolves a numeric file type code to its label.
///
/// Unknown codes resolve to `None`.
pub fn kind_label(code: u64) -> Option<&'static str> {
    match code {
        1 => Some("jpeg"),
        2 | 100 => Some("png"),
        4 => Some("gif"),
        6 => Some("webm"),
        10 => Some("mp4"),
        _ => None,
    }
}

/// A media attachment of a post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    /// Server path of the full file, relative to the base URL.
    #[serde(deserialize_with = "de_text")]
    path: String,

    /// Server-side file name.
    #[serde(deserialize_with = "de_text")]
    name: String,

    /// Shortened original name shown on the page.
    #[serde(deserialize_with = "de_text")]
    displayname: String,

    /// Original name the file was uploaded with.
    #[serde(deserialize_with = "de_text")]
    fullname: String,

    /// Hex MD5 of the file.
    #[serde(deserialize_with = "de_text")]
    md5: String,

    /// Size in kilobytes.
    #[serde(deserialize_with = "de_num")]
    size: u64,

    #[serde(deserialize_with = "de_num")]
    width: u64,

    #[serde(deserialize_with = "de_num")]
    height: u64,

    /// Server path of the thumbnail.
    #[serde(deserialize_with = "de_text")]
    thumbnail: String,

    #[serde(deserialize_with = "de_num")]
    tn_width: u64,

    #[serde(deserialize_with = "de_num")]
    tn_height: u64,

    /// Numeric type code, see [`kind_label`].
    #[serde(rename = "type", deserialize_with = "de_num")]
    kind: u64,

    #[serde(deserialize_with = "de_flag")]
    nsfw: bool,

    /// Formatted duration (`HH:MM:SS`) for audio and video.
    #[serde(
        deserialize_with = "de_opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    duration: Option<String>,

    /// Duration in seconds for audio and video.
    #[serde(
        deserialize_with = "de_opt_num",
        skip_serializing_if = "Option::is_none"
    )]
    duration_secs: Option<u64>,
}

impl File {
    /// Returns the server path of the file.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the server-side file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the display name.
    pub fn displayname(&self) -> &str {
        &self.displayname
    }

    /// Returns the original upload name.
    pub fn fullname(&self) -> &str {
        &self.fullname
    }

    /// Returns the MD5 of the file.
    pub fn md5(&self) -> &str {
        &self.md5
    }

    /// Returns the size in kilobytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the width in pixels.
    pub fn width(&self) -> u64 {
        self.width
    }

    /// Returns the height in pixels.
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Returns the server path of the thumbnail.
    pub fn thumbnail(&self) -> &str {
        &self.thumbnail
    }

    /// Returns the thumbnail width in pixels.
    pub fn tn_width(&self) -> u64 {
        self.tn_width
    }

    /// Returns the thumbnail height in pixels.
    pub fn tn_height(&self) -> u64 {
        self.tn_height
    }

    /// Returns the numeric type code.
    pub fn type_code(&self) -> u64 {
        self.kind
    }

    /// Returns the label of the type code (`jpeg`, `png`, `gif`, `webm`, `mp4`).
    ///
    /// Returns `None` for codes missing from the table.
    pub fn kind(&self) -> Option<&'static str> {
        kind_label(self.kind)
    }

    /// Returns true if the file is marked not safe for work.
    pub fn nsfw(&self) -> bool {
        self.nsfw
    }

    /// Returns the formatted duration of audio and video files.
    pub fn duration(&self) -> Option<&str> {
        str_opt_ref!(self.duration)
    }

    /// Returns the duration of audio and video files in seconds.
    pub fn duration_secs(&self) -> Option<u64> {
        self.duration_secs
    }

    /// Returns the local file name a download of this file is stored under:
    /// the display name cut to 64 characters.
    ///
    /// Falls back to the server name when there is no display name. Path
    /// separators are replaced so the name stays inside the output directory.
    /// Two files sharing a 64 character prefix map to the same name.
    pub fn local_name(&self) -> String {
        let source = if self.displayname.is_empty() {
            &self.name
        } else {
            &self.displayname
        };
        source
            .chars()
            .take(64)
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn known_codes_resolve() {
        assert_eq!(kind_label(1), Some("jpeg"));
        assert_eq!(kind_label(2), Some("png"));
        assert_eq!(kind_label(100), Some("png"));
        assert_eq!(kind_label(4), Some("gif"));
        assert_eq!(kind_label(6), Some("webm"));
        assert_eq!(kind_label(10), Some("mp4"));
    }

    #[test]
    fn unknown_codes_are_not_errors() {
        assert_eq!(kind_label(0), None);
        assert_eq!(kind_label(3), None);
        assert_eq!(kind_label(u64::MAX), None);
    }

    #[test]
    fn decodes_api_file() {
        let file: File = serde_json::from_value(json!({
            "displayname": "video.mp4",
            "fullname": "video.mp4",
            "height": 720,
            "md5": "d41d8cd98f00b204e9800998ecf8427e",
            "name": "16700000000000.mp4",
            "nsfw": 0,
            "path": "/b/src/1/16700000000000.mp4",
            "size": 2048,
            "thumbnail": "/b/thumb/1/16700000000000s.jpg",
            "tn_height": 140,
            "tn_width": 250,
            "type": 10,
            "width": 1280,
            "duration": "00:00:15",
            "duration_secs": 15
        }))
        .unwrap();

        assert_eq!(file.kind(), Some("mp4"));
        assert_eq!(file.type_code(), 10);
        assert_eq!(file.path(), "/b/src/1/16700000000000.mp4");
        assert_eq!(file.duration(), Some("00:00:15"));
        assert_eq!(file.duration_secs(), Some(15));
        assert!(!file.nsfw());
    }

    #[test]
    fn still_images_have_no_duration() {
        let file: File = serde_json::from_value(json!({ "type": 1, "duration": "" })).unwrap();
        assert_eq!(file.duration(), None);
        assert_eq!(file.duration_secs(), None);
    }

    #[test]
    fn local_name_is_cut_to_64_chars() {
        let long = "я".repeat(80) + ".webm";
        let file: File = serde_json::from_value(json!({ "displayname": long })).unwrap();
        assert_eq!(file.local_name().chars().count(), 64);

        let file: File = serde_json::from_value(json!({ "displayname": "a.png" })).unwrap();
        assert_eq!(file.local_name(), "a.png");
    }

    #[test]
    fn local_name_falls_back_and_stays_flat() {
        let file: File = serde_json::from_value(json!({ "name": "123.jpg" })).unwrap();
        assert_eq!(file.local_name(), "123.jpg");

        let file: File = serde_json::from_value(json!({ "displayname": "../x.jpg" })).unwrap();
        assert_eq!(file.local_name(), ".._x.jpg");
    }
}
