//! Commit message generation.
//!
//! [`OpenRouterGenerator`] asks an OpenAI-compatible chat completions
//! endpoint for a one-line subject. Every failure (missing credential,
//! transport, non-2xx status, unexpected JSON) yields `None`; the caller
//! falls back to a numbered message.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use nixup_core::config::{CredentialSource, GeneratorConfig};

pub trait MessageGenerator {
    /// Suggest a commit message for the staged `diff_stat`.
    fn generate(&self, diff_stat: &str) -> Option<String>;
}

/// Never produces a message.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledGenerator;

impl MessageGenerator for DisabledGenerator {
    fn generate(&self, _diff_stat: &str) -> Option<String> {
        None
    }
}

/// Prompt sent with the diff statistic.
pub fn prompt(diff_stat: &str) -> String {
    format!(
        "Write a git commit message (max 72 chars, imperative mood, no quotes) for a NixOS config repo. \
         Be brief. Changes:\n\n{diff_stat}\n\nRespond with ONLY the commit message, no explanations."
    )
}

// ---- wire format ----

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// `choices[0].message.content` of a chat completions response body.
pub fn parse_response(body: &str) -> Option<String> {
    let response: ChatResponse = serde_json::from_str(body).ok()?;
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
}

// ---- credentials ----

/// Resolve the API key; blank values count as absent.
pub fn resolve_credential(source: &CredentialSource) -> Option<String> {
    let raw = match source {
        CredentialSource::File { path } => read_key_file(path)?,
        CredentialSource::Env { var } => std::env::var(var).ok()?,
        CredentialSource::None => return None,
    };
    let key = raw.trim();
    (!key.is_empty()).then(|| key.to_owned())
}

fn read_key_file(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Some(contents),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "API key not readable, using fallback message");
            None
        }
    }
}

// ---- OpenRouter ----

pub struct OpenRouterGenerator {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    max_tokens: u32,
    credential: CredentialSource,
}

impl OpenRouterGenerator {
    pub fn new(config: &GeneratorConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            agent,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            credential: config.credential.clone(),
        }
    }

    fn request(&self, key: &str, diff_stat: &str) -> Result<String, ureq::Error> {
        let body = ChatRequest {
            model: &self.model,
            stream: false,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user".into(),
                content: prompt(diff_stat),
            }],
        };
        let response = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &format!("Bearer {key}"))
            .send_json(&body)?;
        Ok(response.into_string()?)
    }
}

impl MessageGenerator for OpenRouterGenerator {
    fn generate(&self, diff_stat: &str) -> Option<String> {
        let key = resolve_credential(&self.credential)?;
        match self.request(&key, diff_stat) {
            Ok(body) => {
                let content = parse_response(&body);
                if content.is_none() {
                    tracing::warn!("unexpected response from message generator");
                }
                content
            }
            Err(ureq::Error::Status(code, _)) => {
                tracing::warn!(status = code, "message generator returned an error status");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "message generator unreachable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Bump kernel"}}]}"#;
        assert_eq!(parse_response(body).as_deref(), Some("Bump kernel"));
    }

    #[test]
    fn malformed_or_empty_responses_are_none() {
        assert_eq!(parse_response("not json"), None);
        assert_eq!(parse_response(r#"{"choices":[]}"#), None);
        assert_eq!(parse_response(r#"{"error":{"message":"quota"}}"#), None);
    }

    #[test]
    fn prompt_embeds_diff_stat() {
        let p = prompt(" flake.lock | 4 ++--");
        assert!(p.contains("Changes:\n\n flake.lock | 4 ++--\n\n"));
        assert!(p.ends_with("no explanations."));
    }

    #[test]
    fn credential_file_is_trimmed() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("key");
        std::fs::write(&path, "sk-test\n").unwrap();
        assert_eq!(
            resolve_credential(&CredentialSource::File { path }).as_deref(),
            Some("sk-test")
        );
    }

    #[test]
    fn missing_or_blank_credentials_are_none() {
        let dir = TempDir::new().expect("tempdir");
        let blank = dir.path().join("blank");
        std::fs::write(&blank, "  \n").unwrap();
        assert!(resolve_credential(&CredentialSource::File { path: blank }).is_none());
        assert!(resolve_credential(&CredentialSource::File {
            path: dir.path().join("absent")
        })
        .is_none());
        assert!(resolve_credential(&CredentialSource::None).is_none());
    }

    #[test]
    fn no_credential_means_no_request() {
        let cfg = GeneratorConfig {
            endpoint: "http://127.0.0.1:9/unreachable".into(),
            ..GeneratorConfig::default()
        };
        assert!(OpenRouterGenerator::new(&cfg).generate("x").is_none());
    }
}
