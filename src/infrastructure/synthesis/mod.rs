mod speech_api_synthesizer;

pub use speech_api_synthesizer::SpeechApiSynthesizer;
