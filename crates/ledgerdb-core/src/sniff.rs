//! File-type sniffing and text previews for reconstructed blobs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How many leading bytes the text heuristic samples.
pub const TEXT_SAMPLE_LEN: usize = 1024;

/// Share of printable bytes required to call a sample text.
pub const TEXT_RATIO: f64 = 0.9;

/// Payloads at or above this size never get a preview.
pub const PREVIEW_MAX_BYTES: usize = 10_000;

/// Characters kept in a preview.
pub const PREVIEW_CHARS: usize = 500;

/// Detected file type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Jpg,
    Png,
    Gif,
    Bmp,
    Webp,
    Mp4,
    Mov,
    Avi,
    Webm,
    Pdf,
    Docx,
    Xlsx,
    Pptx,
    Zip,
    Txt,
    Bin,
}

impl FileType {
    pub fn extension(self) -> &'static str {
        match self {
            FileType::Jpg => "jpg",
            FileType::Png => "png",
            FileType::Gif => "gif",
            FileType::Bmp => "bmp",
            FileType::Webp => "webp",
            FileType::Mp4 => "mp4",
            FileType::Mov => "mov",
            FileType::Avi => "avi",
            FileType::Webm => "webm",
            FileType::Pdf => "pdf",
            FileType::Docx => "docx",
            FileType::Xlsx => "xlsx",
            FileType::Pptx => "pptx",
            FileType::Zip => "zip",
            FileType::Txt => "txt",
            FileType::Bin => "bin",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            FileType::Jpg => "image/jpeg",
            FileType::Png => "image/png",
            FileType::Gif => "image/gif",
            FileType::Bmp => "image/bmp",
            FileType::Webp => "image/webp",
            FileType::Mp4 => "video/mp4",
            FileType::Mov => "video/quicktime",
            FileType::Avi => "video/x-msvideo",
            FileType::Webm => "video/webm",
            FileType::Pdf => "application/pdf",
            FileType::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            FileType::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            FileType::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            FileType::Zip => "application/zip",
            FileType::Txt => "text/plain",
            FileType::Bin => "application/octet-stream",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Printable ASCII or `\n`, `\r`, `\t`.
pub fn is_printable(b: u8) -> bool {
    (0x20..=0x7e).contains(&b) || matches!(b, b'\n' | b'\r' | b'\t')
}

/// Label a buffer by magic bytes, then by the printable-ratio heuristic.
pub fn sniff(data: &[u8]) -> FileType {
    if data.starts_with(&[0xff, 0xd8, 0xff]) {
        return FileType::Jpg;
    }
    if data.starts_with(&[0x89, 0x50, 0x4e, 0x47]) {
        return FileType::Png;
    }
    if data.starts_with(b"GIF") {
        return FileType::Gif;
    }
    if data.starts_with(b"BM") {
        return FileType::Bmp;
    }
    if riff_form(data) == Some(&b"WEBP"[..]) {
        return FileType::Webp;
    }
    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        return if &data[8..12] == b"qt  " {
            FileType::Mov
        } else {
            FileType::Mp4
        };
    }
    if riff_form(data) == Some(&b"AVI "[..]) {
        return FileType::Avi;
    }
    if data.starts_with(&[0x1a, 0x45, 0xdf, 0xa3]) {
        return FileType::Webm;
    }
    if data.starts_with(b"%PDF") {
        return FileType::Pdf;
    }
    if data.starts_with(&[0x50, 0x4b, 0x03, 0x04]) {
        return sniff_zip(data);
    }
    if looks_like_text(data) {
        return FileType::Txt;
    }
    FileType::Bin
}

fn riff_form(data: &[u8]) -> Option<&[u8]> {
    if data.len() >= 12 && data.starts_with(b"RIFF") {
        Some(&data[8..12])
    } else {
        None
    }
}

/// Office documents are zip archives; their entry paths give them away.
fn sniff_zip(data: &[u8]) -> FileType {
    if contains(data, b"word/") {
        FileType::Docx
    } else if contains(data, b"xl/") {
        FileType::Xlsx
    } else if contains(data, b"ppt/") {
        FileType::Pptx
    } else {
        FileType::Zip
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn looks_like_text(data: &[u8]) -> bool {
    let sample = &data[..data.len().min(TEXT_SAMPLE_LEN)];
    if sample.is_empty() {
        return false;
    }
    let printable = sample.iter().filter(|b| is_printable(**b)).count();
    printable as f64 / sample.len() as f64 > TEXT_RATIO
}

/// First [`PREVIEW_CHARS`] characters of a small, fully printable payload.
pub fn preview(data: &[u8]) -> Option<String> {
    if data.len() >= PREVIEW_MAX_BYTES || !data.iter().all(|b| is_printable(*b)) {
        return None;
    }
    let text = String::from_utf8_lossy(data);
    Some(text.chars().take(PREVIEW_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_prefix(prefix: &[u8]) -> Vec<u8> {
        let mut v = prefix.to_vec();
        v.extend_from_slice(&[0u8; 32]);
        v
    }

    #[test]
    fn test_image_magic() {
        assert_eq!(sniff(&with_prefix(&[0xff, 0xd8, 0xff, 0xe0])), FileType::Jpg);
        assert_eq!(sniff(&with_prefix(&[0x89, b'P', b'N', b'G'])), FileType::Png);
        assert_eq!(sniff(&with_prefix(b"GIF89a")), FileType::Gif);
        assert_eq!(sniff(&with_prefix(b"BM")), FileType::Bmp);
        assert_eq!(sniff(&with_prefix(b"RIFF\0\0\0\0WEBPVP8 ")), FileType::Webp);
    }

    #[test]
    fn test_video_magic() {
        assert_eq!(sniff(&with_prefix(b"\0\0\0\x18ftypisom")), FileType::Mp4);
        assert_eq!(sniff(&with_prefix(b"\0\0\0\x14ftypqt  ")), FileType::Mov);
        assert_eq!(sniff(&with_prefix(b"RIFF\0\0\0\0AVI LIST")), FileType::Avi);
        assert_eq!(sniff(&with_prefix(&[0x1a, 0x45, 0xdf, 0xa3])), FileType::Webm);
    }

    #[test]
    fn test_documents() {
        assert_eq!(sniff(b"%PDF-1.7\n%\xe2\xe3"), FileType::Pdf);
        let mut docx = vec![0x50, 0x4b, 0x03, 0x04];
        docx.extend_from_slice(b"\x14\0\0\0word/document.xml");
        assert_eq!(sniff(&docx), FileType::Docx);
        let mut xlsx = vec![0x50, 0x4b, 0x03, 0x04];
        xlsx.extend_from_slice(b"\x14\0xl/workbook.xml");
        assert_eq!(sniff(&xlsx), FileType::Xlsx);
        let mut pptx = vec![0x50, 0x4b, 0x03, 0x04];
        pptx.extend_from_slice(b"\x14\0ppt/slides/slide1.xml");
        assert_eq!(sniff(&pptx), FileType::Pptx);
        assert_eq!(sniff(&with_prefix(&[0x50, 0x4b, 0x03, 0x04])), FileType::Zip);
    }

    #[test]
    fn test_text_heuristic() {
        assert_eq!(sniff(&vec![b'a'; 4096]), FileType::Txt);
        assert_eq!(sniff(&[0, 1, 2, 3]), FileType::Bin);
        assert_eq!(sniff(&[]), FileType::Bin);
    }

    #[test]
    fn test_text_tolerates_a_few_binary_bytes() {
        let mut data = vec![b'x'; 100];
        data[0] = 0x00;
        data[1] = 0xff;
        assert_eq!(sniff(&data), FileType::Txt);
    }

    #[test]
    fn test_preview_rules() {
        assert_eq!(preview(b"hello\n"), Some("hello\n".to_string()));
        assert_eq!(preview(&vec![b'a'; 600]).map(|p| p.len()), Some(PREVIEW_CHARS));
        assert_eq!(preview(&vec![b'a'; PREVIEW_MAX_BYTES]), None);
        assert_eq!(preview(b"bad\x00byte"), None);
    }

    #[test]
    fn test_labels() {
        assert_eq!(FileType::Jpg.to_string(), "jpg");
        assert_eq!(FileType::Bin.mime_type(), "application/octet-stream");
    }
}
