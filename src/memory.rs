use serde::{Deserialize, Serialize};

/// Keyword sets that gate the `model` and `usage` slots.
///
/// Matching is a plain substring test against the lower-cased message, so
/// "hp" also fires on words that merely contain it.
#[derive(Debug, Clone)]
pub struct ExtractionKeywords {
    pub brands: Vec<String>,
    pub usage: Vec<String>,
}

impl Default for ExtractionKeywords {
    fn default() -> Self {
        Self {
            brands: ["hp", "dell", "lenovo"].iter().map(|s| s.to_string()).collect(),
            usage: ["startup", "every", "always", "heavy", "sometimes"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ExtractionKeywords {
    fn matches(words: &[String], lowered: &str) -> bool {
        words.iter().any(|w| lowered.contains(w.as_str()))
    }
}

/// The slot a message was captured into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemorySlot {
    Issue,
    Model,
    Usage,
}

/// What the assistant has learned about the user's problem so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationMemory {
    pub issue: Option<String>,
    pub model: Option<String>,
    pub usage: Option<String>,
    pub steps_given: Vec<String>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one step of the issue → model → usage slot filler.
    ///
    /// Slots are tried in that order and at most one is filled per message.
    /// A filled slot is never written again. While `issue` is empty every
    /// message lands there, whatever keywords it carries.
    pub fn observe(&mut self, message: &str, keywords: &ExtractionKeywords) -> Option<MemorySlot> {
        let lowered = message.to_lowercase();

        if self.issue.is_none() {
            self.issue = Some(message.to_string());
            return Some(MemorySlot::Issue);
        }
        if self.model.is_none() && ExtractionKeywords::matches(&keywords.brands, &lowered) {
            self.model = Some(message.to_string());
            return Some(MemorySlot::Model);
        }
        if self.usage.is_none() && ExtractionKeywords::matches(&keywords.usage, &lowered) {
            self.usage = Some(message.to_string());
            return Some(MemorySlot::Usage);
        }
        None
    }

    pub fn record_step(&mut self, reply: impl Into<String>) {
        self.steps_given.push(reply.into());
    }

    /// Number of issue/model/usage slots that hold a value
    pub fn filled_slots(&self) -> usize {
        [&self.issue, &self.model, &self.usage]
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    /// Renders memory plus the current message as the retrieval/answer query.
    pub fn compose_query(&self, message: &str) -> String {
        let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "unknown".to_string());

        let steps = if self.steps_given.is_empty() {
            "none".to_string()
        } else {
            let listed: Vec<String> = self
                .steps_given
                .iter()
                .map(|step| format!("- {}", step))
                .collect();
            format!("\n{}", listed.join("\n"))
        };

        format!(
            "Conversation Memory:\n\
             Issue: {}\n\
             Laptop Model: {}\n\
             Usage Pattern: {}\n\
             Previous Steps: {}\n\
             \n\
             User says:\n\
             {}\n\
             \n\
             Decide whether to ask a diagnostic question or provide troubleshooting steps.\n\
             Do not repeat questions already answered.\n",
            field(&self.issue),
            field(&self.model),
            field(&self.usage),
            steps,
            message,
        )
    }
}
