pub mod provider;
pub mod gemini;
pub mod prompts;
pub mod parser;
pub mod extractor;

pub use provider::LLMProvider;
pub use gemini::GeminiProvider;
pub use extractor::{prioritize_files, TechnologyExtractor};
pub use parser::parse_technology_response;
