use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assembler::AnswerAssembler;
use crate::memory::{ConversationMemory, ExtractionKeywords};

/// Shown in place of a reply when any part of the turn fails
pub const APOLOGY: &str = "⚠️ Something went wrong while generating the response.";

pub const WELCOME_MESSAGE: &str = "\
👋 Welcome!

I'm your AI Tech Support Assistant, designed for real-world troubleshooting.

What I can do:
- Diagnose hardware & software issues
- Remember context across messages
- Avoid repeating steps
- Guide you clearly, step by step

Start by describing your issue 👇";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Counters shown alongside the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub issues_tracked: usize,
    pub steps_given: usize,
    pub context_fields: usize,
}

/// Everything one conversation carries between turns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    memory: ConversationMemory,
    history: Vec<ChatMessage>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Drops memory and history together.
    pub fn reset(&mut self) {
        *self = Session::default();
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            issues_tracked: usize::from(self.memory.issue.is_some()),
            steps_given: self.memory.steps_given.len(),
            context_fields: self.memory.filled_slots(),
        }
    }

    fn push(&mut self, role: ChatRole, content: &str) {
        self.history.push(ChatMessage {
            role,
            content: content.to_string(),
        });
    }
}

/// Runs conversation turns against the answer pipeline.
pub struct Assistant {
    assembler: AnswerAssembler,
    keywords: ExtractionKeywords,
}

impl Assistant {
    pub fn new(assembler: AnswerAssembler, keywords: ExtractionKeywords) -> Self {
        Assistant {
            assembler,
            keywords,
        }
    }

    /// Handles one user message and returns the reply shown to the user.
    ///
    /// Memory is updated before the query is built. The reply, or the apology
    /// if the pipeline failed, is appended to the history and to
    /// `steps_given`.
    pub async fn handle_turn(&self, session: &mut Session, message: &str) -> String {
        session.push(ChatRole::User, message);

        if let Some(slot) = session.memory.observe(message, &self.keywords) {
            info!("Captured {:?} from user message", slot);
        }

        let query = session.memory.compose_query(message);
        let reply = match self.assembler.ask_question(&query).await {
            Ok(answer) => answer.answer,
            Err(e) => {
                warn!(kind = ?e.kind(), "Turn failed: {}", e);
                APOLOGY.to_string()
            }
        };

        session.memory.record_step(reply.clone());
        session.push(ChatRole::Assistant, &reply);
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{Embedder, HashingEmbedder};
    use crate::error::{AssistantError, Result};
    use crate::llm::LanguageModel;
    use crate::retriever::Retriever;
    use crate::vector_db::{IndexStore, VectorDB};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::tempdir;

    struct ScriptedModel {
        replies: Mutex<Vec<Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(mut replies: Vec<Result<String>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().push(prompt.to_string());
            self.replies
                .lock()
                .pop()
                .unwrap_or_else(|| Ok("Let's keep troubleshooting.".to_string()))
        }
    }

    fn assistant(index_dir: &Path, model: Arc<ScriptedModel>) -> Assistant {
        let retriever = Retriever::new(
            Arc::new(IndexStore::new(index_dir)),
            Arc::new(HashingEmbedder::default()),
            4,
        );
        Assistant::new(
            AnswerAssembler::new(retriever, model),
            ExtractionKeywords::default(),
        )
    }

    #[tokio::test]
    async fn test_steps_match_turns() {
        let dir = tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new(vec![]));
        let assistant = assistant(dir.path(), model);
        let mut session = Session::new();

        for (n, message) in ["Laptop is slow", "It's an HP", "always after startup", "ok"]
            .iter()
            .enumerate()
        {
            assistant.handle_turn(&mut session, message).await;
            assert_eq!(session.memory().steps_given.len(), n + 1);
            assert_eq!(session.history().len(), 2 * (n + 1));
        }

        let memory = session.memory();
        assert_eq!(memory.issue.as_deref(), Some("Laptop is slow"));
        assert_eq!(memory.model.as_deref(), Some("It's an HP"));
        assert_eq!(memory.usage.as_deref(), Some("always after startup"));
    }

    #[tokio::test]
    async fn test_model_failure_records_apology() {
        let dir = tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new(vec![
            Ok("Try a hard reset.".to_string()),
            Err(AssistantError::Model("API returned 500".to_string())),
        ]));
        let assistant = assistant(dir.path(), model);
        let mut session = Session::new();

        assistant.handle_turn(&mut session, "Laptop won't turn on").await;
        let reply = assistant.handle_turn(&mut session, "Still dead").await;

        assert_eq!(reply, APOLOGY);
        assert_eq!(session.memory().steps_given, vec!["Try a hard reset.", APOLOGY]);
        assert_eq!(
            session.history().last(),
            Some(&ChatMessage {
                role: ChatRole::Assistant,
                content: APOLOGY.to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_retrieval_failure_records_apology() {
        let dir = tempdir().unwrap();
        // Index built by a different embedding model
        let other = HashingEmbedder::new(32).unwrap();
        let mut db = VectorDB::new(other.model_id(), other.dimension());
        db.add_document("x".into(), BTreeMap::new(), other.embed("x").unwrap())
            .unwrap();
        db.save(dir.path()).unwrap();

        let model = Arc::new(ScriptedModel::new(vec![]));
        let assistant = assistant(dir.path(), model.clone());
        let mut session = Session::new();

        let reply = assistant.handle_turn(&mut session, "Fan noise").await;
        assert_eq!(reply, APOLOGY);
        assert!(model.prompts.lock().is_empty());
        assert_eq!(session.memory().steps_given.len(), 1);
    }

    #[tokio::test]
    async fn test_query_carries_memory_and_prior_steps() {
        let dir = tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new(vec![Ok("Check the charger.".to_string())]));
        let assistant = assistant(dir.path(), model.clone());
        let mut session = Session::new();

        assistant.handle_turn(&mut session, "Battery not charging").await;
        assistant.handle_turn(&mut session, "My Dell is 3 years old").await;

        let prompts = model.prompts.lock();
        assert!(prompts[1].contains("Issue: Battery not charging"));
        assert!(prompts[1].contains("Laptop Model: My Dell is 3 years old"));
        assert!(prompts[1].contains("- Check the charger."));
        assert!(prompts[1].contains("User says:\nMy Dell is 3 years old"));
    }

    #[tokio::test]
    async fn test_issue_is_stable() {
        let dir = tempdir().unwrap();
        let assistant = assistant(dir.path(), Arc::new(ScriptedModel::new(vec![])));
        let mut session = Session::new();

        assistant.handle_turn(&mut session, "Overheating").await;
        for message in ["new issue: screen", "lenovo", "every day", "something else"] {
            assistant.handle_turn(&mut session, message).await;
        }
        assert_eq!(session.memory().issue.as_deref(), Some("Overheating"));
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let dir = tempdir().unwrap();
        let assistant = assistant(dir.path(), Arc::new(ScriptedModel::new(vec![])));
        let mut session = Session::new();

        assistant.handle_turn(&mut session, "No sound").await;
        assistant.handle_turn(&mut session, "HP Pavilion").await;
        assert_eq!(session.stats().context_fields, 2);

        session.reset();
        assert_eq!(session, Session::new());
        assert_eq!(
            session.stats(),
            SessionStats {
                issues_tracked: 0,
                steps_given: 0,
                context_fields: 0,
            }
        );

        // The next message starts a fresh issue
        assistant.handle_turn(&mut session, "Wifi drops").await;
        assert_eq!(session.memory().issue.as_deref(), Some("Wifi drops"));
    }

    #[tokio::test]
    async fn test_end_to_end_retrieves_power_button_chunk() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        let corpus = [
            ("power.txt", "Restart your laptop by holding the power button for 10 seconds."),
            ("printer.txt", "Clear printer jams from the rear tray."),
            ("wifi.txt", "Forget the wireless network and rejoin it."),
            ("bluetooth.txt", "Reconnect headphones from the bluetooth menu."),
            ("monitor.txt", "Reseat the display cable when screens flicker."),
            ("keyboard.txt", "Sticky keys usually need compressed air."),
        ];
        for (name, text) in corpus {
            std::fs::write(data.join(name), text).unwrap();
        }

        let index_dir = dir.path().join("vector_db");
        let embedder = Arc::new(HashingEmbedder::default());
        let store = Arc::new(IndexStore::new(&index_dir));
        let builder = crate::ingest::DocumentStoreBuilder::new(
            embedder.clone(),
            store.clone(),
            crate::splitter::TextSplitter::new(800, 100).unwrap(),
        );
        let docs = crate::loader::load_directory(&data).unwrap();
        let report = builder.build(&docs, false).unwrap();
        assert_eq!(report.chunks, corpus.len());

        let retriever = Retriever::new(store, embedder, 4);
        let model: Arc<dyn LanguageModel> = Arc::new(ScriptedModel::new(vec![]));
        let answer = AnswerAssembler::new(retriever, model)
            .ask_question("my laptop won't turn on")
            .await
            .unwrap();

        // Six chunks indexed, only the top four come back
        assert_eq!(answer.docs_used.len(), 4);
        let power = answer
            .docs_used
            .iter()
            .find(|c| c.content.contains("power button"))
            .expect("power button chunk retrieved");
        assert!(power.metadata["source"].ends_with("power.txt"));
        assert!(answer.docs_used.iter().all(|c| power.score >= c.score));
    }
}
