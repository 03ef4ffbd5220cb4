use crate::lyrics::clean::LyricsQuery;
use crate::lyrics::providers::{CatalogEntry, LyricsCatalog};
use crate::lyrics::types::{LyricsError, http_client};
use reqwest::StatusCode;

pub const DEFAULT_LRCLIB_URL: &str = "https://lrclib.net/api";

/// lrclib.net catalog client.
#[derive(Debug, Clone)]
pub struct LrclibClient {
    base_url: String,
}

impl LrclibClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }
}

impl Default for LrclibClient {
    fn default() -> Self {
        Self::new(DEFAULT_LRCLIB_URL)
    }
}

impl LyricsCatalog for LrclibClient {
    async fn get(&self, query: &LyricsQuery) -> Result<Option<CatalogEntry>, LyricsError> {
        let url = build_get_url(&self.base_url, query);
        let resp = http_client().get(&url).send().await?;

        if is_miss(resp.status()) {
            tracing::debug!(status = %resp.status(), "lrclib get: no match");
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(LyricsError::Api(format!("lrclib get: HTTP {}", resp.status())));
        }
        let body = resp.text().await?;
        Ok(Some(serde_json::from_str(&body)?))
    }

    async fn search(&self, q: &str) -> Result<Vec<CatalogEntry>, LyricsError> {
        let url = format!("{}/search?q={}", self.base_url, urlencoding::encode(q));
        let resp = http_client().get(&url).send().await?;

        if is_miss(resp.status()) {
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            return Err(LyricsError::Api(format!("lrclib search: HTTP {}", resp.status())));
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// 404 is a plain miss. 400 means lrclib would not take the query (e.g. an
/// empty artist), which the later search stages can still answer.
fn is_miss(status: StatusCode) -> bool {
    matches!(status, StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST)
}

/// Build the exact-match URL. Duration is sent in whole seconds and omitted
/// when unknown.
fn build_get_url(base: &str, query: &LyricsQuery) -> String {
    let mut params = vec![
        format!("artist_name={}", urlencoding::encode(&query.artist)),
        format!("track_name={}", urlencoding::encode(&query.title)),
    ];
    if let Some(d) = query.duration {
        params.push(format!("duration={}", d.round() as i64));
    }
    format!("{}/get?{}", base, params.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_url_encodes_and_rounds() {
        let q = LyricsQuery {
            artist: "AC/DC".into(),
            title: "Back in Black".into(),
            duration: Some(255.6),
        };
        assert_eq!(
            build_get_url(DEFAULT_LRCLIB_URL, &q),
            "https://lrclib.net/api/get?artist_name=AC%2FDC&track_name=Back%20in%20Black&duration=256"
        );
    }

    #[test]
    fn get_url_without_duration() {
        let q = LyricsQuery { artist: "A".into(), title: "B".into(), duration: None };
        assert_eq!(build_get_url("http://x/api", &q), "http://x/api/get?artist_name=A&track_name=B");
    }

    #[test]
    fn rejected_queries_fall_through() {
        assert!(is_miss(StatusCode::NOT_FOUND));
        assert!(is_miss(StatusCode::BAD_REQUEST));
        assert!(!is_miss(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_miss(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        assert_eq!(LrclibClient::new("http://x/api/").base_url, "http://x/api");
    }
}
