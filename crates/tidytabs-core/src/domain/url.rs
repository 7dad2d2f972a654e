//! URL sanitizer.
//!
//! Tab URLs leave the machine when they go to the AI endpoint, so only
//! `origin + "/" + first path segment` is kept. Query, fragment, credentials
//! and deeper path segments never pass through.

use url::{Origin, Url};

/// Raw inputs that fail to parse are cut to this many characters.
pub const MAX_UNPARSED_LEN: usize = 100;

/// Reduce a tab URL to `origin/first-segment`. Never panics.
pub fn sanitize_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => {
            let first_segment = url
                .path_segments()
                .and_then(|mut segments| segments.next())
                .unwrap_or("");
            format!("{}/{}", origin_of(&url), first_segment)
        }
        Err(_) => raw.chars().take(MAX_UNPARSED_LEN).collect(),
    }
}

fn origin_of(url: &Url) -> String {
    match url.origin() {
        origin @ Origin::Tuple(..) => origin.ascii_serialization(),
        // chrome://, file://, about: and friends serialize as "null"; keep the
        // scheme and host so the AI still has something to go on.
        Origin::Opaque(_) => match url.host_str() {
            Some(host) if !host.is_empty() => format!("{}://{}", url.scheme(), host),
            _ => format!("{}:", url.scheme()),
        },
    }
}
