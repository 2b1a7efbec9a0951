use infer::MatcherType;

use crate::errors::AppError;

pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const DOCUMENT_EXTENSIONS: [&str; 4] = ["pdf", "doc", "docx", "txt"];
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];
const DANGEROUS_EXTENSIONS: [&str; 11] = ["exe", "php", "asp", "jsp", "py", "js", "html", "htm", "bat", "cmd", "sh"];
const DANGEROUS_NAME_PATTERNS: [&str; 9] =
    ["<script", "javascript:", "vbscript:", "<?php", "<%", "exec(", "eval(", "../", "..\\"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Document,
    Image,
}

impl UploadKind {
    pub fn max_bytes(&self) -> usize {
        match self {
            UploadKind::Document => MAX_DOCUMENT_BYTES,
            UploadKind::Image => MAX_IMAGE_BYTES,
        }
    }

    pub fn for_extension(extension: &str) -> Option<Self> {
        if DOCUMENT_EXTENSIONS.contains(&extension) {
            Some(UploadKind::Document)
        } else if IMAGE_EXTENSIONS.contains(&extension) {
            Some(UploadKind::Image)
        } else {
            None
        }
    }
}

pub fn extension_of(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Checks an upload against the allow-list, size caps, file-name patterns and sniffed content.
/// `accept` restricts which kinds the endpoint takes.
pub fn validate_upload(file_name: &str, bytes: &[u8], accept: &[UploadKind]) -> Result<UploadKind, AppError> {
    let lowered = file_name.to_lowercase();

    if let Some(pattern) = DANGEROUS_NAME_PATTERNS.iter().find(|p| lowered.contains(*p)) {
        tracing::warn!("Suspicious file name rejected ({}): {}", pattern, file_name);
        return Err(AppError::field("file", "File name contains potentially dangerous content"));
    }

    let extension = extension_of(&lowered).unwrap_or_default();
    if DANGEROUS_EXTENSIONS.contains(&extension.as_str()) {
        tracing::warn!("Dangerous file upload attempt: {}", file_name);
        return Err(AppError::field(
            "file",
            &format!("File type .{extension} is not allowed for security reasons"),
        ));
    }

    let kind = UploadKind::for_extension(&extension)
        .filter(|kind| accept.contains(kind))
        .ok_or_else(|| {
            AppError::field("file", &format!("File type .{extension} is not supported. Allowed types: {}", allowed_list(accept)))
        })?;

    if bytes.is_empty() {
        return Err(AppError::field("file", "File is empty"));
    }
    if bytes.len() > kind.max_bytes() {
        return Err(AppError::PayloadTooLarge(format!(
            "File size {} exceeds maximum allowed size of {} bytes",
            bytes.len(),
            kind.max_bytes()
        )));
    }

    check_content(&extension, kind, bytes)?;
    Ok(kind)
}

fn check_content(extension: &str, kind: UploadKind, bytes: &[u8]) -> Result<(), AppError> {
    let sniffed = infer::get(bytes);

    if let Some(t) = &sniffed {
        if t.matcher_type() == MatcherType::App {
            tracing::warn!("Executable content uploaded as .{}: {}", extension, t.mime_type());
            return Err(AppError::field("file", "File content is not allowed"));
        }
    }

    let matches = match (kind, extension, &sniffed) {
        (UploadKind::Image, _, Some(t)) => t.matcher_type() == MatcherType::Image,
        (UploadKind::Image, _, None) => false,
        (UploadKind::Document, "pdf", Some(t)) => t.mime_type() == "application/pdf",
        (UploadKind::Document, "pdf", None) => false,
        (UploadKind::Document, "doc" | "docx", Some(t)) => {
            t.matcher_type() == MatcherType::Doc || t.matcher_type() == MatcherType::Archive
        }
        (UploadKind::Document, "txt", sniffed) => {
            sniffed.is_none() && !bytes.contains(&0) && std::str::from_utf8(bytes).is_ok()
        }
        (UploadKind::Document, _, _) => false,
    };

    if matches {
        Ok(())
    } else {
        Err(AppError::field("file", "File content does not match its extension"))
    }
}

fn allowed_list(accept: &[UploadKind]) -> String {
    accept
        .iter()
        .flat_map(|kind| match kind {
            UploadKind::Document => DOCUMENT_EXTENSIONS.as_slice(),
            UploadKind::Image => IMAGE_EXTENSIONS.as_slice(),
        })
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PDF: &[u8] = b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n";
    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, 0x49, 0x48, 0x44, 0x52];
    const ALL: [UploadKind; 2] = [UploadKind::Document, UploadKind::Image];

    #[test]
    fn accepts_matching_content() {
        assert_eq!(validate_upload("writeup.PDF", PDF, &ALL).unwrap(), UploadKind::Document);
        assert_eq!(validate_upload("shot.png", PNG, &[UploadKind::Image]).unwrap(), UploadKind::Image);
        assert_eq!(validate_upload("notes.txt", b"plain notes", &ALL).unwrap(), UploadKind::Document);
    }

    #[test]
    fn rejects_dangerous_names_and_extensions() {
        assert!(validate_upload("shell.php", b"<?php", &ALL).is_err());
        assert!(validate_upload("<script>.pdf", PDF, &ALL).is_err());
        assert!(validate_upload("../../cv.pdf", PDF, &ALL).is_err());
        assert!(validate_upload("archive.zip", b"PK", &ALL).is_err());
    }

    #[test]
    fn rejects_kinds_the_endpoint_does_not_take() {
        assert!(validate_upload("shot.png", PNG, &[UploadKind::Document]).is_err());
    }

    #[test]
    fn rejects_spoofed_content() {
        assert!(validate_upload("cv.pdf", PNG, &ALL).is_err());
        assert!(validate_upload("photo.jpg", PDF, &ALL).is_err());
        let mut elf = vec![0x7F, b'E', b'L', b'F', 2, 1, 1, 0];
        elf.resize(64, 0);
        assert!(validate_upload("notes.txt", &elf, &ALL).is_err());
    }

    #[test]
    fn text_with_nul_bytes_is_not_text() {
        let mut short_elf = vec![0x7F, b'E', b'L', b'F', 2, 1, 1, 0];
        short_elf.resize(40, 0);
        assert!(validate_upload("notes.txt", &short_elf, &ALL).is_err());
        assert!(validate_upload("notes.txt", b"line one\0line two", &ALL).is_err());
    }

    #[test]
    fn enforces_size_caps_per_kind() {
        let mut big_png = PNG.to_vec();
        big_png.resize(MAX_IMAGE_BYTES + 1, 0);
        assert!(matches!(
            validate_upload("big.png", &big_png, &ALL),
            Err(AppError::PayloadTooLarge(_))
        ));

        let mut pdf = PDF.to_vec();
        pdf.resize(MAX_IMAGE_BYTES + 1, b' ');
        assert!(validate_upload("big.pdf", &pdf, &ALL).is_ok());
    }
}
