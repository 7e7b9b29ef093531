use std::collections::HashMap;
use url::Url;

/// Parameters the identity provider appends when redirecting back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl RedirectParams {
    /// Collect response parameters from both the query string and the fragment
    pub fn from_url(url: &Url) -> Self {
        let mut pairs: HashMap<String, String> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if let Some(fragment) = url.fragment() {
            for (k, v) in url::form_urlencoded::parse(fragment.as_bytes()) {
                pairs.entry(k.into_owned()).or_insert_with(|| v.into_owned());
            }
        }

        Self {
            code: pairs.remove("code"),
            state: pairs.remove("state"),
            error: pairs.remove("error"),
            error_description: pairs.remove("error_description"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.error.is_none()
    }
}

/// Whether the page URL looks like a pending identity-provider response
pub fn has_response_artifacts(url: &Url) -> bool {
    let query = url.query().unwrap_or("");
    let fragment = url.fragment().unwrap_or("");
    query.contains("code=")
        || query.contains("error=")
        || fragment.contains("id_token")
        || fragment.contains("access_token")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_params_from_query() {
        let params = RedirectParams::from_url(&url("http://localhost:5173/?code=abc%2F1&state=s1"));
        assert_eq!(params.code.as_deref(), Some("abc/1"));
        assert_eq!(params.state.as_deref(), Some("s1"));
        assert!(!params.is_empty());
    }

    #[test]
    fn test_params_from_fragment() {
        let params = RedirectParams::from_url(&url(
            "http://localhost:5173/#error=access_denied&error_description=User+cancelled&state=s2",
        ));
        assert_eq!(params.error.as_deref(), Some("access_denied"));
        assert_eq!(params.error_description.as_deref(), Some("User cancelled"));
        assert_eq!(params.state.as_deref(), Some("s2"));
    }

    #[test]
    fn test_plain_url_has_no_params() {
        let plain = url("http://localhost:5173/search?q=house");
        assert!(RedirectParams::from_url(&plain).is_empty());
        assert!(!has_response_artifacts(&plain));
    }

    #[test]
    fn test_response_artifacts() {
        assert!(has_response_artifacts(&url("http://localhost/?code=1")));
        assert!(has_response_artifacts(&url("http://localhost/?error=x")));
        assert!(has_response_artifacts(&url("http://localhost/#id_token=x")));
        assert!(has_response_artifacts(&url("http://localhost/#access_token=x")));
        assert!(!has_response_artifacts(&url("http://localhost/#section")));
    }
}
