pub mod flexible;
pub mod mock;
pub mod openai;

pub use flexible::*;
pub use mock::*;
pub use openai::{OpenAIClient, OpenAIConfig};
