//! Research state threaded through every node.
//!
//! Each node takes the state by value and returns the updated state. The
//! append-only fields (`messages`, `notes`, `bookmarks`) and the fixed fields
//! (`original_query`, `max_iterations`) are private so the only way to change
//! them is through the methods below.

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// The single record passed through the research loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchState {
    messages: Vec<Message>,
    original_query: String,
    sub_questions: Vec<String>,
    /// Question the researcher works on this cycle; empty before the first pick.
    pub current_question: String,
    notes: Vec<String>,
    bookmarks: Vec<String>,
    iteration: u32,
    max_iterations: u32,
    /// Set by the analyser; never reset.
    pub converged: bool,
    /// Final document, written by the compiler.
    pub report: Option<String>,
}

impl ResearchState {
    /// Creates the state for one query. The query becomes the first user message.
    ///
    /// `max_iterations` of 0 is clamped to 1.
    pub fn new(query: impl Into<String>, max_iterations: u32) -> Self {
        let original_query = query.into();
        Self {
            messages: vec![Message::user(original_query.clone())],
            original_query,
            sub_questions: Vec::new(),
            current_question: String::new(),
            notes: Vec::new(),
            bookmarks: Vec::new(),
            iteration: 0,
            max_iterations: max_iterations.max(1),
            converged: false,
            report: None,
        }
    }

    pub fn original_query(&self) -> &str {
        &self.original_query
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn sub_questions(&self) -> &[String] {
        &self.sub_questions
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn bookmarks(&self) -> &[String] {
        &self.bookmarks
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// True once the iteration counter has reached the cap.
    pub fn iteration_cap_reached(&self) -> bool {
        self.iteration >= self.max_iterations
    }

    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn push_bookmark(&mut self, bookmark: impl Into<String>) {
        self.bookmarks.push(bookmark.into());
    }

    /// Appends sub-questions, skipping blanks and ones already present.
    /// Returns how many were added.
    pub fn add_sub_questions<I, Q>(&mut self, questions: I) -> usize
    where
        I: IntoIterator<Item = Q>,
        Q: Into<String>,
    {
        let before = self.sub_questions.len();
        for q in questions {
            let q = q.into();
            let q = q.trim();
            if q.is_empty() || self.sub_questions.iter().any(|existing| existing == q) {
                continue;
            }
            self.sub_questions.push(q.to_string());
        }
        self.sub_questions.len() - before
    }

    /// Removes the sub-question at `index`. Out-of-range returns `None` and
    /// leaves the list untouched.
    pub fn take_sub_question(&mut self, index: usize) -> Option<String> {
        if index < self.sub_questions.len() {
            Some(self.sub_questions.remove(index))
        } else {
            None
        }
    }

    /// Increments the iteration counter by one and returns the new value.
    pub fn advance_iteration(&mut self) -> u32 {
        self.iteration = self.iteration.saturating_add(1);
        self.iteration
    }
}
