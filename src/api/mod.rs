// Flashcard backend API client
use crate::auth::Session;
use crate::error::{CardsError, Result};
use crate::models::{
    clean_word, Difficulty, ForvoSearchResult, MinimalPairCreated, MinimalPairsEntity, Phrase,
    PhraseBaseForm, Pronunciation, ShadowingCreated, ShadowingEntity, Table, WordData,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RowCount {
    row_count: u64,
}

#[derive(Debug, Deserialize)]
struct StressResponse {
    #[serde(default)]
    stressed: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SynthesizeResponse {
    #[serde(default)]
    url: Option<String>,
}

/// Every request carries a bearer token from the session
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<dyn Session>,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Arc<dyn Session>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn bearer(&self) -> Result<String> {
        self.session.acquire_token().await.into_result()
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder, path: &str) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::error!("API error: {} {}", status.as_u16(), path);
            return Err(CardsError::Api {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.json::<T>().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let token = self.bearer().await?;
        tracing::debug!("GET {}", path);
        let request = self.http.get(self.url(path)).bearer_auth(token);
        self.send(request, path).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let token = self.bearer().await?;
        tracing::debug!("POST {}", path);
        let request = self.http.post(self.url(path)).bearer_auth(token).json(body);
        self.send(request, path).await
    }

    pub async fn phrase_by_id(&self, card_id: &str) -> Result<Phrase> {
        self.get_json(&format!("/api/entity/Examples/{}", urlencoding::encode(card_id)))
            .await
    }

    pub async fn count(&self, table: Table) -> Result<u64> {
        let count: RowCount = self
            .get_json(&format!("/api/table/{}/count", table.as_str()))
            .await?;
        Ok(count.row_count)
    }

    pub async fn search_examples(&self, query: &str) -> Result<Vec<Phrase>> {
        self.get_json(&format!("/api/search/Examples?q={}", urlencoding::encode(query)))
            .await
    }

    /// Analyze a word within its sentence. A failure of either the analysis
    /// or the stress lookup degrades to placeholder data; a pending sign-in
    /// is still reported.
    pub async fn word_data(&self, word: &str, sentence: &str, with_stress: bool) -> Result<WordData> {
        let body = json!({ "sentence": sentence, "word": clean_word(word) });
        let mut data: WordData = match self.post_json("/api/russian/analyze-word", &body).await {
            Ok(data) => data,
            Err(e @ (CardsError::Redirecting | CardsError::Identity(_))) => return Err(e),
            Err(e) => {
                tracing::error!("Failed to fetch word data: {}", e);
                return Ok(WordData::fallback(word));
            }
        };

        data.base_form_stress = if with_stress {
            match self.stressed(&data.base_form).await {
                Ok(Some(stressed)) => stressed,
                Ok(None) => data.base_form.clone(),
                Err(e @ (CardsError::Redirecting | CardsError::Identity(_))) => return Err(e),
                Err(e) => {
                    tracing::error!("Stress lookup failed for {}: {}", data.base_form, e);
                    return Ok(WordData::fallback(word));
                }
            }
        } else {
            data.base_form.clone()
        };

        Ok(data)
    }

    pub async fn word_variations(&self, word: &str) -> Result<Vec<String>> {
        self.get_json(&format!("/api/russian/variations?word={}", urlencoding::encode(word)))
            .await
    }

    /// URL of synthesized audio for a sentence
    pub async fn synthesize(&self, sentence: &str) -> Result<Option<String>> {
        let response: SynthesizeResponse = self
            .post_json("/api/russian/synthesize", &json!({ "sentence": sentence }))
            .await?;
        Ok(response.url.filter(|u| !u.is_empty()))
    }

    /// Text with stress marks; works for single words as well as sentences
    pub async fn stressed(&self, text: &str) -> Result<Option<String>> {
        let response: StressResponse = self
            .post_json("/api/russian/stress", &json!({ "sentence": text }))
            .await?;
        Ok(response.stressed.filter(|s| !s.is_empty()))
    }

    pub async fn phrase_base_form(&self, sentence: &str, words: &str) -> Result<PhraseBaseForm> {
        self.post_json(
            "/api/russian/phrase-base-form",
            &json!({ "sentence": sentence, "words": words }),
        )
        .await
    }

    pub async fn forvo_search(&self, phrase: &str) -> Result<Vec<ForvoSearchResult>> {
        self.get_json(&format!("/api/forvo/search/{}", urlencoding::encode(phrase)))
            .await
    }

    pub async fn forvo_pronunciations(&self, word: &str) -> Result<Vec<Pronunciation>> {
        self.get_json(&format!("/api/forvo/pronunciations/{}", urlencoding::encode(word)))
            .await
    }

    pub async fn shadowing_by_id(&self, row_key: &str) -> Result<ShadowingEntity> {
        self.get_json(&format!("/api/shadowing/{}", urlencoding::encode(row_key)))
            .await
    }

    pub async fn add_shadowing(&self, sentence: &str, difficulty: Difficulty) -> Result<ShadowingCreated> {
        self.post_json(
            "/api/shadowing/add",
            &json!({ "sentence": sentence, "difficulty": difficulty }),
        )
        .await
    }

    pub async fn minimal_pair_by_id(&self, row_key: &str) -> Result<MinimalPairsEntity> {
        self.get_json(&format!("/api/minimalpairs/{}", urlencoding::encode(row_key)))
            .await
    }

    pub async fn add_minimal_pair(&self, pair: &str, difficulty: Difficulty) -> Result<MinimalPairCreated> {
        self.post_json(
            "/api/minimalpairs/add",
            &json!({ "pair": pair, "difficulty": difficulty }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{BypassSession, SessionPhase, TokenOutcome};
    use crate::models::Account;
    use async_trait::async_trait;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&format!("{}/", server.uri()), Arc::new(BypassSession::new()))
    }

    /// Session that is always waiting on a sign-in redirect
    struct RedirectingSession;

    #[async_trait]
    impl Session for RedirectingSession {
        fn is_authenticated(&self) -> bool {
            false
        }
        fn account(&self) -> Option<Account> {
            None
        }
        fn phase(&self) -> SessionPhase {
            SessionPhase::Redirecting
        }
        async fn start(&self) -> SessionPhase {
            SessionPhase::Redirecting
        }
        async fn login(&self) {}
        async fn logout(&self) {}
        async fn acquire_token(&self) -> TokenOutcome {
            TokenOutcome::Redirecting
        }
    }

    #[tokio::test]
    async fn test_phrase_by_id_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/entity/Examples/17"))
            .and(header("authorization", "Bearer dev-access-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "CardId": "17",
                "Phrase": "Где библиотека?",
                "PhraseStress": "Где библиоте́ка?",
                "Audio": "https://audio.example/17.mp3",
                "Translation": "Where is the library?"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let phrase = client(&server).phrase_by_id("17").await.unwrap();
        assert_eq!(phrase.translation, "Where is the library?");
    }

    #[tokio::test]
    async fn test_count_reads_row_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/table/minimalpairs/count"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rowCount": 42 })))
            .mount(&server)
            .await;

        assert_eq!(client(&server).count(Table::MinimalPairs).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_search_encodes_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search/Examples"))
            .and(query_param("q", "добрый день"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client(&server).search_examples("добрый день").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_word_data_cleans_word_and_adds_stress() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/russian/analyze-word"))
            .and(body_json(json!({ "sentence": "Я вижу дом.", "word": "дом" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "baseForm": "дом",
                "englishTranslation": "house",
                "russianMeaning": "здание"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/russian/stress"))
            .and(body_json(json!({ "sentence": "дом" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "stressed": "до́м" })))
            .mount(&server)
            .await;

        let data = client(&server).word_data("дом.", "Я вижу дом.", true).await.unwrap();
        assert_eq!(data.base_form, "дом");
        assert_eq!(data.base_form_stress, "до́м");
        assert_eq!(data.english_translation, "house");
    }

    #[tokio::test]
    async fn test_word_data_falls_back_on_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/russian/analyze-word"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let data = client(&server).word_data("кошка,", "Это кошка, да.", true).await.unwrap();
        assert_eq!(data, WordData::fallback("кошка,"));
    }

    #[tokio::test]
    async fn test_word_data_falls_back_when_stress_lookup_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/russian/analyze-word"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "baseForm": "дом",
                "englishTranslation": "house",
                "russianMeaning": "здание"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/russian/stress"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let data = client(&server).word_data("дом", "Я вижу дом.", true).await.unwrap();
        assert_eq!(data, WordData::fallback("дом"));
    }

    #[tokio::test]
    async fn test_http_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/shadowing/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server).shadowing_by_id("missing").await.unwrap_err();
        assert!(matches!(err, CardsError::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_add_shadowing_sends_difficulty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/shadowing/add"))
            .and(body_json(json!({ "sentence": "Всё хорошо.", "difficulty": "easy" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "partitionKey": "shadowing",
                "rowKey": "r1",
                "sentence": "Всё хорошо."
            })))
            .mount(&server)
            .await;

        let created = client(&server)
            .add_shadowing("Всё хорошо.", Difficulty::Easy)
            .await
            .unwrap();
        assert_eq!(created.row_key, "r1");
    }

    #[tokio::test]
    async fn test_pending_sign_in_defers_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri(), Arc::new(RedirectingSession));
        let err = api.word_data("дом", "дом", true).await.unwrap_err();
        assert!(matches!(err, CardsError::Redirecting));
    }
}
