use crate::UrlError;
use url::Url;

/// Tracking query parameters dropped during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Normalizes a listing URL
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or relative
/// 2. Require an http(s) scheme and a host
/// 3. Remove the fragment
/// 4. Remove tracking query parameters, keeping the order of the rest
/// 5. Remove an empty query string
///
/// The host is lowercased by parsing; the path keeps its case. Listing
/// identity is exact string equality of the result.
pub fn normalize_listing_url(raw: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost(raw.to_string()));
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok(url)
}

/// Builds an absolute URL from a marketplace base and a site-relative path
///
/// # Examples
///
/// ```
/// use offer_tracker::url::absolutize;
/// use url::Url;
///
/// let base = Url::parse("https://www.olx.pl").unwrap();
/// let url = absolutize(&base, "/d/oferta/flat-ID1.html").unwrap();
/// assert_eq!(url.as_str(), "https://www.olx.pl/d/oferta/flat-ID1.html");
/// ```
pub fn absolutize(base: &Url, path: &str) -> Result<Url, UrlError> {
    base.join(path)
        .map_err(|e| UrlError::Parse(format!("{} relative to {}: {}", path, base, e)))
}

/// Strips a trailing suffix (such as `.html`) from a URL string
///
/// The suffix is only removed from the end of the path; query strings and
/// fragments are cut off first and re-attached afterwards.
pub fn strip_suffix(raw: &str, suffix: &str) -> String {
    let split_at = raw.find(['?', '#']).unwrap_or(raw.len());
    let (path, rest) = raw.split_at(split_at);
    match path.strip_suffix(suffix) {
        Some(stripped) => format!("{}{}", stripped, rest),
        None => raw.to_string(),
    }
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
