//! The conversation with the analyst, seeded with the result of an analysis.

use crate::census::completion::{
    CompletionClient, CompletionRequest, InlineImage, ANALYST_SYSTEM_PROMPT,
};
use crate::census::*;

pub const GREETING: &str = "Hello! I'm BioBot. Ask me a question about biodiversity, upload an image for identification, or discuss your calculated indices!";

const SEPARATOR: &str = "\n---------------------------------\n";

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Role {
    User,
    Model,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    pub has_image: bool,
}

/// The messages exchanged so far, and the message being written.
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    draft: String,
}

impl Default for Transcript {
    fn default() -> Self {
        Transcript::new()
    }
}

impl Transcript {
    /// A new conversation opens with the greeting of the analyst.
    pub fn new() -> Transcript {
        Transcript {
            messages: vec![ChatMessage {
                role: Role::Model,
                text: GREETING.to_string(),
                has_image: false,
            }],
            draft: String::new(),
        }
    }

    /// Replaces the message being written. The user can still edit it before sending.
    pub fn preload(&mut self, text: &str) {
        self.draft = text.to_string();
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Adds the draft to the conversation as a message of the user.
    ///
    /// Nothing is sent when the draft is blank and there is no image.
    pub fn submit(&mut self, has_image: bool) -> Option<&ChatMessage> {
        let text = self.draft.trim().to_string();
        if text.is_empty() && !has_image {
            return None;
        }
        self.draft.clear();
        self.messages.push(ChatMessage {
            role: Role::User,
            text,
            has_image,
        });
        self.messages.last()
    }

    pub fn push_reply(&mut self, text: &str) {
        self.messages.push(ChatMessage {
            role: Role::Model,
            text: text.to_string(),
            has_image: false,
        });
    }

    /// Failures are reported in the conversation itself.
    pub fn push_error(&mut self, error: &CompletionError) {
        warn!("push_error: {:?}", error);
        self.push_reply(&format!("Sorry, I encountered an error: {}", error));
    }

    /// Submits the draft and adds the answer of the analyst.
    ///
    /// Returns false if there was nothing to send.
    pub fn send(&mut self, client: &dyn CompletionClient, image: Option<InlineImage>) -> bool {
        let prompt = match self.submit(image.is_some()) {
            Some(msg) => msg.text.clone(),
            None => return false,
        };
        let request = CompletionRequest {
            system_instruction: ANALYST_SYSTEM_PROMPT.to_string(),
            prompt,
            image,
        };
        match client.complete(&request) {
            Ok(reply) => self.push_reply(&reply),
            Err(e) => self.push_error(&e),
        }
        true
    }

    /// The conversation as plain text, for download.
    pub fn render_log(&self) -> String {
        self.messages
            .iter()
            .map(|msg| {
                let header = match msg.role {
                    Role::User => "User",
                    Role::Model => "BioBot",
                };
                let image = if msg.has_image {
                    "(Image Attached)\n"
                } else {
                    ""
                };
                format!("[{}]\n{}\n{}", header, msg.text, image)
            })
            .collect::<Vec<String>>()
            .join(SEPARATOR)
    }
}
