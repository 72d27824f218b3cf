pub mod llm;
pub mod responder;
pub mod tts;
