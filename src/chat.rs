//! Multi-turn chat against a project's LLM.
//!
//! The server owns the conversation; the client only threads each new
//! question onto the id returned for the previous one. A session accepts one
//! question at a time: [`ChatSession::submit`] appends a pending turn and
//! closes the gate before any I/O, and reopens it once the request settles
//! either way.
//!
//! ```text
//!   submit("q1")  ──▶ [q1: pending]           gate closed
//!   response id=a ──▶ [q1: answer, id=a]      gate open
//!   submit("q2")  ──▶ [.., q2: pending, id=a] request carries id=a
//! ```

use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::client::{ChatRequest, RagApi};
use crate::error::{ErrorLog, ErrorRecord};
use crate::info::ProjectInfoCache;
use crate::models::{ConversationTurn, ProjectMetadata, CHAT_FAILURE_ANSWER};
use crate::privacy::PrivacyClass;

/// Retrieval `k` used when the project does not declare one.
pub const DEFAULT_K: u32 = 4;
/// Score threshold used when the project does not declare one.
pub const DEFAULT_SCORE: f64 = 0.3;

/// Retrieval knobs sent with every question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalParams {
    pub k: u32,
    pub score: f64,
}

impl RetrievalParams {
    /// The project's own `k`/`score`, falling back to the backend defaults.
    pub fn from_project(project: Option<&ProjectMetadata>) -> Self {
        Self {
            k: project.and_then(|p| p.k).unwrap_or(DEFAULT_K),
            score: project.and_then(|p| p.score).unwrap_or(DEFAULT_SCORE),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.k < 1 {
            anyhow::bail!("k must be >= 1");
        }
        if !(0.0..=1.0).contains(&self.score) {
            anyhow::bail!("score must be in [0.0, 1.0]");
        }
        Ok(())
    }
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self::from_project(None)
    }
}

/// Why a submission was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyQuestion,
    /// Another question is still waiting for its answer.
    InFlight,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Answered(ConversationTurn),
    /// The request failed; the turn carries [`CHAT_FAILURE_ANSWER`].
    Failed(ConversationTurn),
    Rejected(Rejection),
}

struct ChatState {
    turns: Vec<ConversationTurn>,
    submittable: bool,
    project: Option<ProjectMetadata>,
    errors: ErrorLog,
}

pub struct ChatSession {
    api: Arc<dyn RagApi>,
    info: Arc<ProjectInfoCache>,
    project_name: String,
    state: parking_lot::Mutex<ChatState>,
}

impl ChatSession {
    pub fn new(api: Arc<dyn RagApi>, info: Arc<ProjectInfoCache>, project_name: &str) -> Self {
        Self {
            api,
            info,
            project_name: project_name.to_string(),
            state: parking_lot::Mutex::new(ChatState {
                turns: Vec::new(),
                submittable: true,
                project: None,
                errors: ErrorLog::new(),
            }),
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Fetch the project snapshot and the global catalog.
    pub async fn mount(&self) {
        let (project, catalog) = tokio::join!(
            self.api.project(&self.project_name),
            self.info.fetch(self.api.as_ref())
        );

        let mut state = self.state.lock();
        match project {
            Ok(p) => state.project = Some(p),
            Err(e) => state.errors.record("fetch_project", &e),
        }
        if let Err(e) = catalog {
            state.errors.record("fetch_info", &e);
        }
    }

    /// Ask `question`, threaded onto the previous turn.
    pub async fn submit(&self, question: &str, params: RetrievalParams) -> SubmitOutcome {
        let thread_id = {
            let mut state = self.state.lock();
            if question.is_empty() {
                return SubmitOutcome::Rejected(Rejection::EmptyQuestion);
            }
            if !state.submittable {
                return SubmitOutcome::Rejected(Rejection::InFlight);
            }
            let thread_id = state
                .turns
                .last()
                .map(|t| t.thread_id.clone())
                .unwrap_or_default();
            state
                .turns
                .push(ConversationTurn::pending(thread_id.clone(), question.to_string()));
            state.submittable = false;
            thread_id
        };

        let request = ChatRequest {
            question: question.to_string(),
            id: (!thread_id.is_empty()).then(|| thread_id.clone()),
            k: params.k,
            score: params.score,
        };
        tracing::debug!(project = %self.project_name, thread = %thread_id, "chat turn");
        let result = self.api.chat(&self.project_name, &request).await;

        let mut state = self.state.lock();
        let (turn, failed) = match result {
            Ok(response) => (
                ConversationTurn {
                    thread_id: response.id,
                    question: response.question,
                    answer: Some(response.answer),
                    sources: response.sources,
                },
                false,
            ),
            Err(e) => {
                state.errors.record("chat", &e);
                (
                    ConversationTurn {
                        thread_id,
                        question: question.to_string(),
                        answer: Some(CHAT_FAILURE_ANSWER.to_string()),
                        sources: Vec::new(),
                    },
                    true,
                )
            }
        };
        // Only one turn can be in flight, so the pending turn is always last.
        if let Some(last) = state.turns.last_mut() {
            *last = turn.clone();
        }
        state.submittable = true;

        if failed {
            SubmitOutcome::Failed(turn)
        } else {
            SubmitOutcome::Answered(turn)
        }
    }

    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.state.lock().turns.clone()
    }

    pub fn is_submittable(&self) -> bool {
        self.state.lock().submittable
    }

    pub fn project(&self) -> Option<ProjectMetadata> {
        self.state.lock().project.clone()
    }

    /// Retrieval defaults taken from the mounted project.
    pub fn default_params(&self) -> RetrievalParams {
        RetrievalParams::from_project(self.state.lock().project.as_ref())
    }

    /// Privacy classification of the mounted project, if any.
    pub fn privacy(&self) -> Option<PrivacyClass> {
        let catalog = self.info.get();
        self.state
            .lock()
            .project
            .as_ref()
            .map(|p| PrivacyClass::of(p, &catalog))
    }

    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.state.lock().errors.entries().to_vec()
    }
}

/// Render one source citation as a single line.
pub fn describe_source(source: &Value) -> String {
    match source {
        Value::String(s) => s.clone(),
        Value::Object(map) => {
            let name = map
                .get("source")
                .and_then(Value::as_str)
                .unwrap_or("(unknown source)");
            match map.get("score").and_then(Value::as_f64) {
                Some(score) => format!("{} (score {:.3})", name, score),
                None => name.to_string(),
            }
        }
        other => other.to_string(),
    }
}

fn print_turn(turn: &ConversationTurn) {
    println!("MESSAGE:  {}", turn.question);
    println!("RESPONSE: {}", turn.answer.as_deref().unwrap_or("..."));
    for source in &turn.sources {
        println!("  - {}", describe_source(source));
    }
    println!();
}

/// CLI entry point for `ragc chat`.
///
/// Asks each of `messages` in order; with no messages, reads questions from
/// stdin one line at a time until EOF.
pub async fn run_chat(
    session: &ChatSession,
    messages: Vec<String>,
    k: Option<u32>,
    score: Option<f64>,
) -> Result<()> {
    session.mount().await;

    let defaults = session.default_params();
    let params = RetrievalParams {
        k: k.unwrap_or(defaults.k),
        score: score.unwrap_or(defaults.score),
    };
    params.validate()?;

    if let Some(class) = session.privacy() {
        eprintln!("Chat {} ({})", session.project_name(), class.label());
    }

    if !messages.is_empty() {
        for message in messages {
            ask(session, &message, params).await;
        }
        return Ok(());
    }

    let interactive = atty::is(atty::Stream::Stdin);
    let prompt = || {
        if interactive {
            eprint!("> ");
        }
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if !question.is_empty() {
            ask(session, question, params).await;
        }
        prompt();
    }
    if interactive {
        eprintln!();
    }

    Ok(())
}

async fn ask(session: &ChatSession, question: &str, params: RetrievalParams) {
    match session.submit(question, params).await {
        SubmitOutcome::Answered(turn) | SubmitOutcome::Failed(turn) => print_turn(&turn),
        SubmitOutcome::Rejected(reason) => {
            tracing::debug!(?reason, "question not submitted");
        }
    }
}
