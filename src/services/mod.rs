pub mod agent;
pub mod llm_service;
pub mod prompt;

pub use agent::{BrowserAgent, LlmBrowserAgent};
pub use llm_service::{parse_structured_answer, CompletionModel, LlmService};
pub use prompt::PromptTemplate;
