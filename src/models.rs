use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A signed-in user as known to the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    /// Stable identifier across tenants (`{oid}.{tid}`)
    pub home_account_id: String,
    pub local_account_id: String,
    pub environment: String,
    pub tenant_id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Account {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.username)
    }
}

/// Scopes requested for the backend API audience
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenRequest {
    pub scopes: Vec<String>,
}

impl TokenRequest {
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }

    /// Scope parameter sent to the provider; OIDC scopes are always included
    pub fn scope_param(&self) -> String {
        let mut scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        for extra in ["openid", "profile", "offline_access"] {
            if !scopes.contains(&extra) {
                scopes.push(extra);
            }
        }
        scopes.join(" ")
    }

    pub fn is_covered_by(&self, granted: &[String]) -> bool {
        self.scopes.iter().all(|s| granted.contains(s))
    }
}

/// Result of a completed token acquisition
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub account: Account,
    pub scopes: Vec<String>,
}

/// Example sentence card
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Phrase {
    pub card_id: String,
    pub phrase: String,
    #[serde(default)]
    pub phrase_stress: String,
    #[serde(default)]
    pub audio: String,
    #[serde(default)]
    pub translation: String,
}

/// Linguistic enrichment for one word of a sentence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WordData {
    pub base_form: String,
    #[serde(default)]
    pub base_form_stress: String,
    pub english_translation: String,
    pub russian_meaning: String,
}

impl WordData {
    /// Shown when the analysis service cannot answer
    pub fn fallback(word: &str) -> Self {
        Self {
            base_form: word.to_string(),
            base_form_stress: word.to_string(),
            english_translation: "Translation not found".to_string(),
            russian_meaning: "Meaning not found".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForvoSearchResult {
    pub phrase: String,
    pub audio: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pronunciation {
    pub audio_mp3: String,
    pub sex: String,
    pub username: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShadowingSentence {
    #[serde(rename = "Sentence")]
    pub sentence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShadowingEntity {
    pub entity: ShadowingSentence,
    #[serde(default)]
    pub pronunciations: Vec<Pronunciation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShadowingCreated {
    pub partition_key: String,
    pub row_key: String,
    pub sentence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MinimalPair {
    #[serde(rename = "Pair")]
    pub pair: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MinimalPairsEntity {
    pub entity: MinimalPair,
    #[serde(default)]
    pub pronunciations1: Vec<Pronunciation>,
    #[serde(default)]
    pub pronunciations2: Vec<Pronunciation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MinimalPairCreated {
    pub partition_key: String,
    pub row_key: String,
    pub pair: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhraseBaseForm {
    pub phrase_answer: String,
    pub bracketed_sentence: String,
    pub base_form: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Backend tables that expose a row count
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Table {
    Examples,
    Shadowing,
    MinimalPairs,
}

impl Table {
    pub fn as_str(&self) -> &str {
        match self {
            Table::Examples => "Examples",
            Table::Shadowing => "shadowing",
            Table::MinimalPairs => "minimalpairs",
        }
    }
}

/// Order pronunciations Russia first, then male speakers first
pub fn sort_pronunciations(pronunciations: &[Pronunciation]) -> Vec<Pronunciation> {
    let mut sorted = pronunciations.to_vec();
    sorted.sort_by_key(|p| (p.country != "Russia", p.sex != "m"));
    sorted
}

/// Strip trailing punctuation picked up when a word is selected from a sentence
pub fn clean_word(word: &str) -> &str {
    word.trim_end_matches([',', '.', '!', '?', ';', ':', '—', '–', '-'])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pron(user: &str, country: &str, sex: &str) -> Pronunciation {
        Pronunciation {
            audio_mp3: format!("https://audio.example/{}.mp3", user),
            sex: sex.to_string(),
            username: user.to_string(),
            country: country.to_string(),
        }
    }

    #[test]
    fn test_sort_pronunciations_russia_then_male() {
        let input = vec![
            pron("a", "Ukraine", "m"),
            pron("b", "Russia", "f"),
            pron("c", "Germany", "f"),
            pron("d", "Russia", "m"),
        ];
        let sorted = sort_pronunciations(&input);
        let users: Vec<&str> = sorted.iter().map(|p| p.username.as_str()).collect();
        assert_eq!(users, vec!["d", "b", "a", "c"]);
        // input untouched
        assert_eq!(input[0].username, "a");
    }

    #[test]
    fn test_clean_word() {
        assert_eq!(clean_word("привет,"), "привет");
        assert_eq!(clean_word("дом!?"), "дом");
        assert_eq!(clean_word("так —"), "так ");
        assert_eq!(clean_word("кто-то"), "кто-то");
        assert_eq!(clean_word("..."), "");
    }

    #[test]
    fn test_scope_param_adds_oidc_scopes_once() {
        let request = TokenRequest::new(["api://abc/access_as_user", "openid"]);
        assert_eq!(
            request.scope_param(),
            "api://abc/access_as_user openid profile offline_access"
        );
    }

    #[test]
    fn test_request_covered_by_granted_scopes() {
        let request = TokenRequest::new(["api://abc/access_as_user"]);
        assert!(request.is_covered_by(&[
            "openid".to_string(),
            "api://abc/access_as_user".to_string()
        ]));
        assert!(!request.is_covered_by(&["openid".to_string()]));
    }

    #[test]
    fn test_account_display_name() {
        let mut account = Account {
            home_account_id: "oid.tid".to_string(),
            local_account_id: "oid".to_string(),
            environment: "login.microsoftonline.com".to_string(),
            tenant_id: "tid".to_string(),
            username: "anna@example.com".to_string(),
            name: None,
        };
        assert_eq!(account.display_name(), "anna@example.com");
        account.name = Some("Anna".to_string());
        assert_eq!(account.display_name(), "Anna");
    }

    #[test]
    fn test_phrase_wire_format() {
        let json = r#"{"CardId":"42","Phrase":"Я дома.","PhraseStress":"Я до́ма.","Audio":"","Translation":"I am home."}"#;
        let phrase: Phrase = serde_json::from_str(json).unwrap();
        assert_eq!(phrase.card_id, "42");
        assert_eq!(phrase.phrase_stress, "Я до́ма.");
    }

    #[test]
    fn test_difficulty_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Difficulty::Medium).unwrap(), "\"medium\"");
        assert_eq!(Table::MinimalPairs.as_str(), "minimalpairs");
    }
}
