use url::Url;

/// Extract the display hostname from a story URL.
///
/// Returns the host with any leading `www.` stripped, lowercased by the `url`
/// parser. Unparseable URLs (the server accepts fairly loose strings) yield
/// `None` rather than an error; hostname display and search just skip them.
pub fn story_hostname(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_www_prefix() {
        assert_eq!(
            story_hostname("https://www.example.com/post/1"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn plain_host_passes_through() {
        assert_eq!(
            story_hostname("https://blog.example.org/a?b=c"),
            Some("blog.example.org".to_string())
        );
    }

    #[test]
    fn hostname_is_lowercased() {
        assert_eq!(
            story_hostname("https://Example.COM/x"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn unparseable_url_yields_none() {
        assert_eq!(story_hostname("not a url"), None);
        assert_eq!(story_hostname(""), None);
    }

    #[test]
    fn scheme_relative_like_strings_yield_none() {
        // `Url::parse` requires an absolute URL with a scheme.
        assert_eq!(story_hostname("example.com/page"), None);
    }
}
