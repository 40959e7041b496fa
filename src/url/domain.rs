use url::Url;

/// Extracts the politeness key for a URL
///
/// The key is the lowercase host, with the port appended when one is
/// explicitly present, so two servers on one host are throttled separately.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use catalog_ripper::url::extract_domain;
///
/// let url = Url::parse("https://WWW.Example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}
