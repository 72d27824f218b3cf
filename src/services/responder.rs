//! Response generation: persona + recent history → chat completion.

use reqwest::Client;

use crate::conversation::Turn;
use crate::services::llm::{self, ChatCallOptions, ChatMessage, GenerationError};

/// System persona prepended to every prompt.
pub const PERSONA: &str = "Eres AVA, la primer agente virtual de la Secretaría de Agricultura y \
Desarrollo Rural especializado en la agroindustria y el desarrollo rural del estado de Puebla. \
Tu misión es responder de manera clara, confiable y oportuna las preguntas de las y los usuarios \
que buscan información sobre producción agrícola, pecuaria y pesquera, así como sobre \
indicadores económicos, sociales y geográficos del estado de Puebla.";

/// Persona turn followed by the windowed history, oldest first.
pub fn build_prompt(window: &[Turn]) -> Vec<ChatMessage> {
    let persona = Turn::system(PERSONA);
    std::iter::once(&persona)
        .chain(window.iter())
        .map(ChatMessage::from)
        .collect()
}

pub struct Responder<'a> {
    pub client: &'a Client,
    pub base_url: &'a str,
    pub api_key: &'a str,
    pub model: &'a str,
}

impl Responder<'_> {
    /// Generate a reply for the given history window.
    pub async fn generate(&self, window: &[Turn]) -> Result<String, GenerationError> {
        let messages = build_prompt(window);
        tracing::debug!(turns = messages.len(), "Sending prompt to chat completion");

        let opts = ChatCallOptions {
            base_url: self.base_url.to_string(),
            api_key: self.api_key.to_string(),
            model: self.model.to_string(),
            messages,
        };
        let reply = llm::complete_chat(self.client, &opts).await?;
        tracing::debug!("Chat completion reply: {}", reply);
        Ok(reply)
    }
}
