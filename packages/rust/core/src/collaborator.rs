//! Collaborator implementations backed by a chat-completions model.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument};

use jobplanner_llm::{ChatClient, parse_score_reply};
use jobplanner_shared::{Result, ScheduledInterview};

use crate::analysts::{ScoringCollaborator, ScoringReply, ScoringRequest};
use crate::narrative::{NarrativeRequest, NarrativeService};

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// System prompt establishing the analyst persona.
pub fn scoring_system_prompt(request: &ScoringRequest<'_>) -> String {
    let p = request.perspective;
    format!(
        "You are a {}, evaluating job opportunities for a candidate. \
         Focus on: {}. Answer with a single JSON object and nothing else.",
        p.display_name, p.focus_description
    )
}

/// User prompt listing the candidates and the required reply format.
pub fn scoring_user_prompt(request: &ScoringRequest<'_>) -> String {
    let listing: Vec<_> = request
        .candidates
        .iter()
        .map(|c| {
            json!({
                "candidate_index": c.index,
                "company": c.label,
                "title": c.title,
                "skills": c.skills,
                "details": c.metadata,
            })
        })
        .collect();
    let listing = serde_json::to_string_pretty(&listing).unwrap_or_else(|_| "[]".into());

    format!(
        "Score each opportunity from 0 to 100 from your perspective.\n\n\
         Opportunities:\n{listing}\n\n\
         Weigh skill match (40%), career prospects (25%), compensation (20%) \
         and company reputation and culture (15%).\n\n\
         Reply exactly in this format:\n\
         {{\"scores\": [{{\"candidate_index\": 0, \"score\": 85, \"rationale\": \"one sentence\"}}]}}\n\
         Include every candidate_index listed above exactly once."
    )
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Scores candidates by prompting a model per perspective.
///
/// Perspectives may pin their own model; otherwise `default_model` is used.
pub struct LlmScorer {
    client: ChatClient,
    default_model: String,
}

impl LlmScorer {
    pub fn new(client: ChatClient, default_model: impl Into<String>) -> Self {
        Self {
            client,
            default_model: default_model.into(),
        }
    }
}

#[async_trait]
impl ScoringCollaborator for LlmScorer {
    #[instrument(skip_all, fields(perspective = %request.perspective.id))]
    async fn request_scores(&self, request: &ScoringRequest<'_>) -> ScoringReply {
        let model = request
            .perspective
            .model
            .as_deref()
            .unwrap_or(self.default_model.as_str());

        let reply = self
            .client
            .complete(
                model,
                &scoring_system_prompt(request),
                &scoring_user_prompt(request),
            )
            .await;

        match reply {
            Ok(text) => match parse_score_reply(&text) {
                Ok(entries) => {
                    debug!(entries = entries.len(), "analyst reply decoded");
                    ScoringReply::Parsed(entries)
                }
                Err(_) => ScoringReply::Unparsable(text),
            },
            Err(e) => ScoringReply::Failed(e.to_string()),
        }
    }
}

/// Scorer for offline runs. Every perspective falls back.
pub struct OfflineScorer;

#[async_trait]
impl ScoringCollaborator for OfflineScorer {
    async fn request_scores(&self, _request: &ScoringRequest<'_>) -> ScoringReply {
        ScoringReply::Failed("offline mode".into())
    }
}

// ---------------------------------------------------------------------------
// Narrative
// ---------------------------------------------------------------------------

fn interview_line(i: &ScheduledInterview) -> String {
    let flag = if i.overflow { " (overflow)" } else { "" };
    format!(
        "- {}: #{} {} at {} (score {}){flag}",
        i.slot, i.priority_rank, i.title, i.label, i.final_score
    )
}

/// Prompt asking the model to summarise the ranking and schedule.
pub fn narrative_prompt(request: &NarrativeRequest<'_>) -> String {
    let ranking: Vec<String> = request
        .ranking
        .iter()
        .map(|r| {
            format!(
                "{}. {} at {}: score {} ({} consensus)",
                r.rank,
                r.title,
                r.label,
                r.final_score,
                r.consensus_level.as_str()
            )
        })
        .collect();
    let interviews: Vec<String> = request
        .schedule
        .iter()
        .flat_map(|d| d.interviews.iter())
        .map(interview_line)
        .collect();

    format!(
        "Ranking:\n{}\n\nInterview schedule:\n{}\n\n\
         Write a concise summary of at most 200 words: the key recommendation, \
         how the interview plan is laid out, and practical preparation advice.",
        ranking.join("\n"),
        if interviews.is_empty() {
            "(none)".to_string()
        } else {
            interviews.join("\n")
        }
    )
}

/// Narrative writer backed by a chat-completions model.
pub struct LlmNarrator {
    client: ChatClient,
    model: String,
}

impl LlmNarrator {
    pub fn new(client: ChatClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl NarrativeService for LlmNarrator {
    async fn narrate(&self, request: &NarrativeRequest<'_>) -> Result<String> {
        self.client
            .complete(
                &self.model,
                "You are a career advisor summarising a job search plan.",
                &narrative_prompt(request),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use jobplanner_shared::{Candidate, LlmConfig, Perspective, default_perspectives};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ChatClient {
        let config = LlmConfig {
            api_base: server.uri(),
            ..LlmConfig::default()
        };
        ChatClient::new(&config, "test-key", Duration::from_secs(5)).unwrap()
    }

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate::new(0, "Acme", "Backend Engineer").with_skills(["Rust"]),
            Candidate::new(1, "Globex", "Data Engineer"),
        ]
    }

    fn technical() -> Perspective {
        default_perspectives().remove(0)
    }

    fn chat_body(content: &str) -> serde_json::Value {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
    }

    #[test]
    fn user_prompt_lists_every_candidate() {
        let cands = candidates();
        let p = technical();
        let prompt = scoring_user_prompt(&ScoringRequest {
            perspective: &p,
            candidates: &cands,
        });
        assert!(prompt.contains("\"candidate_index\": 0"));
        assert!(prompt.contains("\"candidate_index\": 1"));
        assert!(prompt.contains("Globex"));
        assert!(prompt.contains("\"scores\""));
    }

    #[tokio::test]
    async fn scorer_decodes_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("gpt-3.5-turbo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
                "```json\n{\"scores\":[{\"candidate_index\":0,\"score\":91,\"rationale\":\"Rust\"}]}\n```",
            )))
            .mount(&server)
            .await;

        let scorer = LlmScorer::new(client_for(&server), "gpt-3.5-turbo");
        let cands = candidates();
        let p = technical();
        let reply = scorer
            .request_scores(&ScoringRequest {
                perspective: &p,
                candidates: &cands,
            })
            .await;

        match reply {
            ScoringReply::Parsed(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].score, 91.0);
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn scorer_keeps_valid_entries_of_mixed_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
                "{\"scores\":[{\"candidate_index\":0,\"score\":88},{\"candidate_index\":1,\"score\":\"N/A\"}]}\nCaveat: {salary unknown}",
            )))
            .mount(&server)
            .await;

        let scorer = LlmScorer::new(client_for(&server), "gpt-3.5-turbo");
        let cands = candidates();
        let p = technical();
        let reply = scorer
            .request_scores(&ScoringRequest {
                perspective: &p,
                candidates: &cands,
            })
            .await;

        match reply {
            ScoringReply::Parsed(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].candidate_index, 0);
                assert_eq!(entries[0].score, 88.0);
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn scorer_uses_perspective_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("analyst-large"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("{\"scores\":[]}")))
            .expect(1)
            .mount(&server)
            .await;

        let scorer = LlmScorer::new(client_for(&server), "gpt-3.5-turbo");
        let cands = candidates();
        let mut p = technical();
        p.model = Some("analyst-large".into());
        let reply = scorer
            .request_scores(&ScoringRequest {
                perspective: &p,
                candidates: &cands,
            })
            .await;
        assert_eq!(reply, ScoringReply::Parsed(vec![]));
    }

    #[tokio::test]
    async fn scorer_reports_unparsable_and_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("They all look fine.")))
            .mount(&server)
            .await;

        let cands = candidates();
        let p = technical();
        let request = ScoringRequest {
            perspective: &p,
            candidates: &cands,
        };

        let scorer = LlmScorer::new(client_for(&server), "gpt-3.5-turbo");
        assert!(matches!(
            scorer.request_scores(&request).await,
            ScoringReply::Unparsable(_)
        ));

        assert!(matches!(
            OfflineScorer.request_scores(&request).await,
            ScoringReply::Failed(_)
        ));
    }

    #[tokio::test]
    async fn narrator_returns_model_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("Focus on Acme first.")))
            .mount(&server)
            .await;

        let narrator = LlmNarrator::new(client_for(&server), "gpt-3.5-turbo");
        let summary = jobplanner_shared::ScheduleSummary::default();
        let text = narrator
            .narrate(&NarrativeRequest {
                perspectives: &[],
                ranking: &[],
                schedule: &[],
                summary: &summary,
            })
            .await
            .unwrap();
        assert_eq!(text, "Focus on Acme first.");
    }
}
