mod llm_translator;

pub use llm_translator::LlmTranslator;
