//! Capture metadata helpers.

use url::Url;

use framegrab_ipc::CaptureMetadata;

use crate::error::StoreError;
use crate::StoreResult;

const IMDB_HOSTS: [&str; 2] = ["imdb.com", "www.imdb.com"];

/// Returns true if `link` is an `http(s)://(www.)imdb.com/title/tt<digits>` page.
///
/// The link is parsed as a URL, so the scheme and host match case-insensitively
/// (`HTTPS://WWW.IMDB.COM/title/tt1` is accepted) and surrounding whitespace is
/// ignored. The `tt` path prefix is case-sensitive.
pub fn is_reference_link(link: &str) -> bool {
    let Ok(url) = Url::parse(link.trim()) else {
        return false;
    };

    let scheme_ok = matches!(url.scheme(), "http" | "https");
    let host_ok = url
        .host_str()
        .is_some_and(|host| IMDB_HOSTS.contains(&host));
    let plain_authority =
        url.port().is_none() && url.username().is_empty() && url.password().is_none();
    let title_ok = url
        .path()
        .strip_prefix("/title/tt")
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()));

    scheme_ok && host_ok && plain_authority && title_ok
}

/// Check metadata entered for a new capture.
pub fn validate_capture_metadata(metadata: &CaptureMetadata) -> StoreResult<()> {
    if metadata.movie_name.trim().is_empty() {
        return Err(StoreError::MissingMovieName);
    }
    if !is_reference_link(&metadata.reference_link) {
        return Err(StoreError::InvalidReferenceLink(
            metadata.reference_link.trim().to_string(),
        ));
    }
    Ok(())
}

/// Guess a movie title from a video file name.
///
/// `the_big_lebowski.mkv` becomes `The Big Lebowski`.
pub fn suggest_movie_name(file_name: &str) -> String {
    let stem = match file_name.rfind('.') {
        Some(dot) if dot + 1 < file_name.len() && !file_name[dot + 1..].contains('/') => {
            &file_name[..dot]
        }
        _ => file_name,
    };

    let mut name = String::with_capacity(stem.len());
    let mut in_word = false;
    for c in stem.chars() {
        let c = if matches!(c, '.' | '_' | '-') { ' ' } else { c };
        let is_word = c.is_ascii_alphanumeric() || c == '_';
        if is_word && !in_word {
            name.push(c.to_ascii_uppercase());
        } else {
            name.push(c);
        }
        in_word = is_word;
    }
    name
}

/// Split comma-separated tags, trimming each and dropping empties.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Make an uploaded file name safe for use in an object path.
///
/// Non-ASCII characters are removed, whitespace runs become `_` and anything
/// outside `[A-Za-z0-9._-]` is dropped. May return an empty string.
pub fn sanitize_file_name(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.chars().filter(char::is_ascii) {
        if c.is_ascii_whitespace() {
            if !in_space {
                sanitized.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            sanitized.push(c);
        }
    }
    sanitized
}
