use anyhow::{bail, Result};
use percent_encoding::percent_decode_str;
use std::path::PathBuf;
use url::Url;

/// Directory names probed under the home directory, in order.
const DOWNLOAD_DIR_NAMES: &[&str] = &["Downloads", "downloads", "download", "Pobrane"];

/// Accepts absolute `http`/`https` URLs with a host.
pub fn parse_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw)?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("unsupported scheme '{}', expected http or https", url.scheme());
    }
    if url.host_str().map_or(true, str::is_empty) {
        bail!("URL has no host");
    }
    Ok(url.to_string())
}

/// Picks the first existing download directory under the home directory,
/// falling back to the home directory itself, then the working directory.
pub fn default_download_dir() -> PathBuf {
    let Some(home) = dirs::home_dir() else {
        return PathBuf::from(".");
    };

    DOWNLOAD_DIR_NAMES
        .iter()
        .map(|name| home.join(name))
        .find(|dir| dir.is_dir())
        .unwrap_or(home)
}

pub fn sanitize_filename(filename: &str) -> String {
    filename.replace(
        |c: char| c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'),
        "_",
    )
}

/// Splits `name.ext` at the last dot. Names without a dot (or with a leading
/// dot only) have no extension.
pub fn split_last_dot(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Extracts the file name from a `Content-Disposition` header value.
///
/// `filename*=` (RFC 5987, percent-encoded) wins over a plain `filename=`.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    let mut filename_star = None;
    let mut filename = None;

    for part in value.split(';') {
        let Some((key, raw)) = part.trim().split_once('=') else {
            continue;
        };
        let raw = raw.trim().trim_matches('"');
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = raw.split_once("''").map_or(raw, |(_, rest)| rest);
                let decoded = percent_decode_str(encoded).decode_utf8_lossy().to_string();
                if !decoded.is_empty() {
                    filename_star = Some(decoded);
                }
            }
            "filename" if !raw.is_empty() => filename = Some(raw.to_string()),
            _ => {}
        }
    }

    // A name made only of dots would resolve to the output directory or its parent.
    let usable = |name: String| Some(sanitize_filename(&name)).filter(|name| !name.trim_matches('.').is_empty());
    filename_star.and_then(usable).or_else(|| filename.and_then(usable))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url() {
        assert!(parse_url("https://example.com/file.zip").is_ok());
        assert!(parse_url("http://127.0.0.1:8080/").is_ok());
        assert!(parse_url("ftp://example.com/file").is_err());
        assert!(parse_url("example.com/file").is_err());
        assert!(parse_url("not a url").is_err());
    }

    #[test]
    fn test_split_last_dot() {
        assert_eq!(split_last_dot("archive.tar.gz"), ("archive.tar", Some("gz")));
        assert_eq!(split_last_dot("README"), ("README", None));
        assert_eq!(split_last_dot(".bashrc"), (".bashrc", None));
        assert_eq!(split_last_dot("trailing."), ("trailing.", None));
    }

    #[test]
    fn test_content_disposition_quoted() {
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="report.final.pdf""#),
            Some("report.final.pdf".to_string())
        );
    }

    #[test]
    fn test_content_disposition_bare_and_encoded() {
        assert_eq!(
            filename_from_content_disposition("attachment; filename=data.csv"),
            Some("data.csv".to_string())
        );
        assert_eq!(
            filename_from_content_disposition(
                r#"attachment; filename="fallback.txt"; filename*=UTF-8''na%C3%AFve%20file.txt"#
            ),
            Some("naïve file.txt".to_string())
        );
    }

    #[test]
    fn test_content_disposition_without_filename() {
        assert_eq!(filename_from_content_disposition("inline"), None);
        assert_eq!(filename_from_content_disposition(r#"attachment; filename="""#), None);
    }

    #[test]
    fn test_dot_only_filename_is_ignored() {
        assert_eq!(filename_from_content_disposition(r#"attachment; filename=".""#), None);
        assert_eq!(filename_from_content_disposition(r#"attachment; filename="..""#), None);
        assert_eq!(filename_from_content_disposition("attachment; filename*=UTF-8''%2E%2E"), None);
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="real.txt"; filename*=UTF-8''%2E"#),
            Some("real.txt".to_string())
        );
    }

    #[test]
    fn test_path_separators_are_replaced() {
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="../../etc/passwd""#),
            Some(".._.._etc_passwd".to_string())
        );
    }
}
