//! Prompt templates for the five research nodes.
//!
//! A template is a system message, optionally the conversation log, and a
//! human message with `{name}` placeholders filled from [`PromptVars`].

use std::collections::BTreeMap;

use crate::message::Message;

/// Values substituted into a template's `{name}` placeholders.
#[derive(Debug, Clone, Default)]
pub struct PromptVars(BTreeMap<&'static str, String>);

impl PromptVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.0.insert(name, value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// A chat prompt: system text, optional log, human text.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    /// Node the prompt belongs to; used in logs and error messages.
    pub name: &'static str,
    pub system: &'static str,
    /// Whether the conversation log goes between the system and human messages.
    pub include_log: bool,
    pub human: &'static str,
}

impl PromptTemplate {
    /// Builds the message list sent to the model.
    pub fn render(&self, vars: &PromptVars, log: &[Message]) -> Vec<Message> {
        let mut out = Vec::with_capacity(log.len() + 2);
        out.push(Message::system(self.system));
        if self.include_log {
            out.extend_from_slice(log);
        }
        out.push(Message::user(fill(self.human, vars)));
        out
    }
}

/// Single pass over `template`: `{name}` with a known name is replaced, anything
/// else is copied through. Substituted values are never re-scanned.
fn fill(template: &str, vars: &PromptVars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match vars.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        tracing::warn!(placeholder = name, "prompt placeholder has no value");
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

pub const PLANNER: PromptTemplate = PromptTemplate {
    name: "planner",
    system: "You are a research planner. Given the original query and any prior notes, \
generate 3-5 non-overlapping sub-questions that cover distinct facets of the query. \
Favor questions that need multi-hop reasoning. \
Output only the questions, one per line, with no numbering or commentary.",
    include_log: true,
    human: "{original_query}\nPrior notes:{notes}",
};

pub const PICKER: PromptTemplate = PromptTemplate {
    name: "picker",
    system: "You are a task director. From the numbered list of unanswered sub-questions, \
select the one most pertinent to the original query given what is already known. \
Answer with the number of the selected question only.",
    include_log: false,
    human: "Original: {original_query}\nUnanswered:\n{sub_questions}\nPrior notes: {notes}",
};

pub const RESEARCHER: PromptTemplate = PromptTemplate {
    name: "researcher",
    system: "You are a factual researcher. Answer the current question succinctly using the \
provided context. If the context is empty or insufficient, call the web_search tool. \
Note any unknowns or gaps. Be rigorous and do not invent facts.",
    include_log: true,
    human: "Current question: {current_question}\nContext: {context}",
};

pub const ANALYSER: PromptTemplate = PromptTemplate {
    name: "analyser",
    system: "You are a research manager. Review the notes and the iteration count and decide \
whether research has converged (enough depth, no major gaps). \
Output exactly one word: CONVERGE or CONTINUE.",
    include_log: true,
    human: "Iteration: {iteration}\nNotes: {notes}",
};

pub const COMPILER: PromptTemplate = PromptTemplate {
    name: "compiler",
    system: "You are a report compiler. Synthesize all notes and bookmarks into a comprehensive, \
cited answer to the original query. Structure: Introduction, Key Findings, Conclusion. \
Cite sources inline using the bookmarks.",
    include_log: false,
    human: "Original: {original_query}\nAll notes: {notes}\nBookmarks: {bookmarks}",
};
