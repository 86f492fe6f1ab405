pub mod assembler;
pub mod classifier;
pub mod fallback_parser;
pub mod form_parser;
pub mod generation;
pub mod image_service;
pub mod normalizer;
pub mod storage_service;
