//! Video caption retrieval.
//!
//! The watch page embeds its caption-track list in an inline config blob;
//! the client extracts it, ranks the tracks against the configured
//! language, and issues one follow-up request for the chosen transcript.

use crate::models::LanguageCode;
use crate::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, Mutex};

/// Language rank assigned to tracks outside the preferred list.
const UNRANKED: usize = 9999;

/// One caption track advertised by the watch page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// `"asr"` marks auto-generated tracks.
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    fn is_auto_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Rank a track against the preferred-language list: earlier languages
/// first, auto-generated after manual at equal language rank.
fn track_rank(track: &CaptionTrack, preferred: &[&str]) -> usize {
    let language_rank = preferred
        .iter()
        .position(|language| *language == track.language_code)
        .unwrap_or(UNRANKED);
    language_rank * 2 + track.is_auto_generated() as usize
}

/// Best track for the preferred languages; the first minimal-rank track
/// wins on ties.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], preferred: &[&str]) -> Option<&'a CaptionTrack> {
    tracks.iter().fold(None, |best: Option<&CaptionTrack>, track| match best {
        Some(current) if track_rank(track, preferred) >= track_rank(current, preferred) => best,
        _ => Some(track),
    })
}

/// Caption transport collaborator.
#[async_trait]
pub trait CaptionService: Send + Sync {
    /// Plain-text transcript for the video at `url`, or an empty string
    /// when no usable caption track exists.
    async fn transcript(&self, url: &str, language: LanguageCode) -> Result<String>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionsConfig {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct TranscriptPayload {
    #[serde(default)]
    events: Vec<TranscriptEvent>,
}

#[derive(Debug, Deserialize)]
struct TranscriptEvent {
    #[serde(default)]
    segs: Option<Vec<TranscriptSegment>>,
}

#[derive(Debug, Deserialize)]
struct TranscriptSegment {
    #[serde(default)]
    utf8: String,
}

/// HTTP caption client over the public watch-page + timedtext endpoints.
pub struct HttpCaptionClient {
    client: reqwest::Client,
}

impl HttpCaptionClient {
    pub fn new() -> Self {
        Self::new_with_client(reqwest::Client::new())
    }

    pub fn new_with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn extract_tracks(page_body: &str) -> Option<Vec<CaptionTrack>> {
        let pattern = Regex::new(r#"(?s)"captions":(.*?),"videoDetails":"#)
            .expect("static caption pattern compiles");
        let config_json = pattern.captures(page_body)?.get(1)?.as_str();

        let config: CaptionsConfig = match serde_json::from_str(config_json) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to parse caption config: {}", e);
                return None;
            }
        };

        config
            .player_captions_tracklist_renderer
            .and_then(|renderer| renderer.caption_tracks)
    }

    fn join_segments(payload: TranscriptPayload) -> String {
        payload
            .events
            .into_iter()
            .flat_map(|event| event.segs.into_iter().flatten())
            .map(|segment| segment.utf8)
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for HttpCaptionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptionService for HttpCaptionClient {
    async fn transcript(&self, url: &str, language: LanguageCode) -> Result<String> {
        let page_body = self.client.get(url).send().await?.text().await?;

        let Some(tracks) = Self::extract_tracks(&page_body) else {
            tracing::debug!("No caption tracks found for {}", url);
            return Ok(String::new());
        };

        let preferred = [language.caption_tag(), "en"];
        let Some(track) = select_track(&tracks, &preferred) else {
            return Ok(String::new());
        };
        tracing::debug!(
            "Selected caption track: language={} kind={:?}",
            track.language_code,
            track.kind
        );

        let transcript_url = if track.base_url.contains("fmt=") {
            track.base_url.clone()
        } else {
            format!("{}&fmt=json3", track.base_url)
        };

        let payload: TranscriptPayload = self
            .client
            .get(&transcript_url)
            .send()
            .await?
            .json()
            .await?;

        Ok(Self::join_segments(payload))
    }
}

/// Scripted caption service for tests: queued transcripts cycled per call.
#[derive(Clone, Default)]
pub struct MockCaptionService {
    transcripts: Arc<Mutex<Vec<String>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockCaptionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transcript(self, transcript: impl Into<String>) -> Self {
        self.transcripts.lock().unwrap().push(transcript.into());
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl CaptionService for MockCaptionService {
    async fn transcript(&self, _url: &str, _language: LanguageCode) -> Result<String> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        let transcripts = self.transcripts.lock().unwrap();
        if transcripts.is_empty() {
            Ok(String::new())
        } else {
            Ok(transcripts[(*count - 1) % transcripts.len()].clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn track(language: &str, kind: Option<&str>) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://captions.test/{}", language),
            language_code: language.to_string(),
            kind: kind.map(str::to_string),
        }
    }

    #[test]
    fn test_select_track_prefers_configured_language() {
        let tracks = vec![track("en", None), track("de", None), track("fr", None)];
        let chosen = select_track(&tracks, &["de", "en"]).unwrap();
        assert_eq!(chosen.language_code, "de");
    }

    #[test]
    fn test_select_track_prefers_manual_over_auto_at_equal_language() {
        let tracks = vec![track("de", Some("asr")), track("de", None)];
        let chosen = select_track(&tracks, &["de", "en"]).unwrap();
        assert!(!chosen.is_auto_generated());
    }

    #[test]
    fn test_select_track_auto_of_preferred_beats_manual_english() {
        let tracks = vec![track("en", None), track("de", Some("asr"))];
        let chosen = select_track(&tracks, &["de", "en"]).unwrap();
        assert_eq!(chosen.language_code, "de");
    }

    #[test]
    fn test_select_track_falls_back_to_english() {
        let tracks = vec![track("fr", None), track("en", Some("asr")), track("en", None)];
        let chosen = select_track(&tracks, &["de", "en"]).unwrap();
        assert_eq!(chosen.language_code, "en");
        assert!(!chosen.is_auto_generated());
    }

    #[test]
    fn test_select_track_first_wins_among_unranked() {
        let tracks = vec![track("fr", None), track("it", None)];
        let chosen = select_track(&tracks, &["de", "en"]).unwrap();
        assert_eq!(chosen.language_code, "fr");
    }

    #[test]
    fn test_extract_tracks_from_page_body() {
        let body = r#"var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://captions.test/en","languageCode":"en","kind":"asr"}]}},"videoDetails":{"videoId":"abc"}}"#;
        let tracks = HttpCaptionClient::extract_tracks(body).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].language_code, "en");
        assert!(tracks[0].is_auto_generated());
    }

    #[test]
    fn test_extract_tracks_missing_config_is_none() {
        assert!(HttpCaptionClient::extract_tracks("<html>no captions here</html>").is_none());
    }

    #[tokio::test]
    async fn test_transcript_fetches_selected_track() {
        let server = MockServer::start().await;

        let page_body = format!(
            r#"{{"captions":{{"playerCaptionsTracklistRenderer":{{"captionTracks":[{{"baseUrl":"{}/api/timedtext?lang=en","languageCode":"en"}}]}}}},"videoDetails":{{}}}}"#,
            server.uri()
        );

        Mock::given(method("GET"))
            .and(path("/watch"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_body))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/timedtext"))
            .and(query_param("fmt", "json3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "events": [
                    { "segs": [{ "utf8": "Hello" }, { "utf8": "\n" }] },
                    { "segs": [{ "utf8": "world" }] },
                    {}
                ]
            })))
            .mount(&server)
            .await;

        let client = HttpCaptionClient::new();
        let transcript = client
            .transcript(&format!("{}/watch?v=abc", server.uri()), LanguageCode::En)
            .await
            .unwrap();

        assert_eq!(transcript, "Hello world");
    }

    #[tokio::test]
    async fn test_transcript_without_tracks_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let client = HttpCaptionClient::new();
        let transcript = client
            .transcript(&format!("{}/watch?v=abc", server.uri()), LanguageCode::De)
            .await
            .unwrap();

        assert_eq!(transcript, "");
    }
}
