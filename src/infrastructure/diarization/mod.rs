mod http_diarizer;

pub use http_diarizer::HttpDiarizer;
