pub mod openai;
pub mod scripted;

pub use openai::OpenAIMock;
pub use scripted::{ScriptedProvider, Step};
