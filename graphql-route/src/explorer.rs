//! The GraphiQL explorer page served to browsers.

use async_graphql::http::GraphiQLSource;
use bytes::Bytes;
use http::HeaderMap;
use http::Method;
use mediatype::MediaType;
use mediatype::MediaTypeList;
use mediatype::names::APPLICATION;
use mediatype::names::HTML;
use mediatype::names::JSON;
use mediatype::names::Q;
use mediatype::names::TEXT;
use mediatype::names::_STAR;

use crate::request::IncomingRequest;

/// A rendered explorer page, or nothing when the explorer is disabled.
#[derive(Clone, Debug, Default)]
pub(crate) struct ExplorerPage {
    page: Option<Bytes>,
}

impl ExplorerPage {
    pub(crate) fn new(configuration: &crate::configuration::Explorer, endpoint: &str) -> Self {
        let page = configuration
            .enabled
            .then(|| Bytes::from(explorer_page_content(endpoint, &configuration.title)));
        Self { page }
    }

    /// The page, if this request is a browser navigation rather than an API call.
    pub(crate) fn for_request(&self, request: &IncomingRequest) -> Option<Bytes> {
        let page = self.page.as_ref()?;
        (request.method() == Method::GET
            && !request.query().contains_key("query")
            && prefers_html(request.headers()))
        .then(|| page.clone())
    }
}

/// Whether the `Accept` header ranks `text/html` above `application/json`.
///
/// Ranges are compared by quality, then specificity, then position in the
/// header. Ties go to JSON.
pub(crate) fn prefers_html(headers: &HeaderMap) -> bool {
    let ranges: Vec<MediaType<'_>> = headers
        .get_all(&http::header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(MediaTypeList::new)
        .filter_map(Result::ok)
        .collect();

    let Some(html) = acceptance(&ranges, &MediaType::new(TEXT, HTML)) else {
        return false;
    };
    match acceptance(&ranges, &MediaType::new(APPLICATION, JSON)) {
        Some(json) => html.outranks(&json),
        None => true,
    }
}

/// How well one media type is accepted by a list of ranges.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Acceptance {
    quality: f32,
    specificity: u8,
    position: usize,
}

impl Acceptance {
    fn outranks(&self, other: &Acceptance) -> bool {
        if self.quality != other.quality {
            return self.quality > other.quality;
        }
        if self.specificity != other.specificity {
            return self.specificity > other.specificity;
        }
        self.position < other.position
    }
}

/// The most specific range matching `media_type`, or `None` when no range
/// matches or the match has a zero quality.
fn acceptance(ranges: &[MediaType<'_>], media_type: &MediaType<'_>) -> Option<Acceptance> {
    let mut best: Option<Acceptance> = None;
    for (position, range) in ranges.iter().enumerate() {
        let specificity = if range.ty == _STAR && range.subty == _STAR {
            0
        } else if range.ty == media_type.ty && range.subty == _STAR {
            1
        } else if range.ty == media_type.ty && range.subty == media_type.subty {
            2
        } else {
            continue;
        };
        let candidate = Acceptance {
            quality: quality(range),
            specificity,
            position,
        };
        let better = match &best {
            None => true,
            Some(best) if candidate.specificity != best.specificity => {
                candidate.specificity > best.specificity
            }
            Some(best) => candidate.quality > best.quality,
        };
        if better {
            best = Some(candidate);
        }
    }
    best.filter(|acceptance| acceptance.quality > 0.0)
}

/// The `q` parameter of a range, 1 when absent or unreadable.
fn quality(range: &MediaType<'_>) -> f32 {
    range
        .params
        .iter()
        .find(|(name, _)| *name == Q)
        .and_then(|(_, value)| value.unquoted_str().trim().parse::<f32>().ok())
        .filter(|quality| (0.0..=1.0).contains(quality))
        .unwrap_or(1.0)
}

pub(crate) fn explorer_page_content(endpoint: &str, title: &str) -> String {
    GraphiQLSource::build().endpoint(endpoint).title(title).finish()
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;
    use http::Uri;
    use http::header::ACCEPT;

    use super::*;
    use crate::configuration::Explorer;

    fn request(method: Method, uri: &'static str, accept: &'static str) -> IncomingRequest {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        IncomingRequest::builder()
            .method(method)
            .uri(Uri::from_static(uri))
            .headers(headers)
            .build()
    }

    #[test]
    fn browsers_get_the_page() {
        let explorer = ExplorerPage::new(&Explorer::default(), "/graphql");
        let page = explorer
            .for_request(&request(
                Method::GET,
                "/graphql",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ))
            .unwrap();
        assert!(String::from_utf8_lossy(&page).contains("/graphql"));
    }

    #[test]
    fn api_calls_do_not() {
        let explorer = ExplorerPage::new(&Explorer::default(), "/graphql");
        assert!(
            explorer
                .for_request(&request(Method::GET, "/graphql", "application/json"))
                .is_none()
        );
        assert!(
            explorer
                .for_request(&request(Method::GET, "/graphql?query=%7Bping%7D", "text/html"))
                .is_none()
        );
        assert!(
            explorer
                .for_request(&request(Method::POST, "/graphql", "text/html"))
                .is_none()
        );
    }

    fn accept(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn html_must_outrank_json() {
        assert!(prefers_html(&accept("text/html")));
        assert!(prefers_html(&accept("text/html, application/json")));
        assert!(prefers_html(&accept("application/json;q=0.5, text/html")));
        assert!(prefers_html(&accept("text/*, */*;q=0.8")));
        assert!(!prefers_html(&accept("application/json, text/html")));
        assert!(!prefers_html(&accept("text/html;q=0.5, application/json")));
        assert!(!prefers_html(&accept("*/*")));
        assert!(!prefers_html(&accept("text/html;q=0")));
        assert!(!prefers_html(&HeaderMap::new()));
    }

    #[test]
    fn json_first_accept_gets_no_page() {
        let explorer = ExplorerPage::new(&Explorer::default(), "/graphql");
        assert!(
            explorer
                .for_request(&request(Method::GET, "/graphql", "application/json, text/html"))
                .is_none()
        );
    }

    #[test]
    fn disabled_explorer_never_matches() {
        let explorer = ExplorerPage::new(
            &Explorer {
                enabled: false,
                ..Default::default()
            },
            "/graphql",
        );
        assert!(
            explorer
                .for_request(&request(Method::GET, "/graphql", "text/html"))
                .is_none()
        );
    }
}
