//! # Stored File Names
//!
//! Uploaded files are stored as `<prefix>_<original>` where the prefix is a
//! short random token. Two uploads of the same file name never collide in
//! the stamped directory, and the original extension stays visible.

use uuid::Uuid;

/// Length of the random hex prefix.
const PREFIX_LEN: usize = 8;

/// Fallback name when sanitization leaves nothing.
const FALLBACK_NAME: &str = "document";

/// Strip path separators and control characters from a client-supplied name.
///
/// Keeps only the final path component, so `../../etc/passwd` becomes
/// `passwd` and `C:\docs\a.pdf` becomes `a.pdf`.
pub fn sanitize_file_name(original: &str) -> String {
    let last = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = last
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .trim_start_matches('.')
        .to_string();
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned
    }
}

/// Build the stored name for an upload: random prefix, underscore, sanitized name.
pub fn disambiguated_name(original: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("{}_{}", &token[..PREFIX_LEN], sanitize_file_name(original))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_plain_names() {
        assert_eq!(sanitize_file_name("contract.pdf"), "contract.pdf");
    }

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\a.pdf"), "a.pdf");
    }

    #[test]
    fn sanitize_strips_leading_dots_and_controls() {
        assert_eq!(sanitize_file_name("..hidden\n"), "hidden");
    }

    #[test]
    fn sanitize_falls_back_when_empty() {
        assert_eq!(sanitize_file_name(""), "document");
        assert_eq!(sanitize_file_name("dir/"), "document");
        assert_eq!(sanitize_file_name(".."), "document");
    }

    #[test]
    fn disambiguated_name_keeps_extension() {
        let name = disambiguated_name("report.pdf");
        assert!(name.ends_with("_report.pdf"), "got {name}");
        assert_eq!(name.len(), PREFIX_LEN + 1 + "report.pdf".len());
    }

    #[test]
    fn disambiguated_names_differ() {
        assert_ne!(disambiguated_name("a.txt"), disambiguated_name("a.txt"));
    }
}
