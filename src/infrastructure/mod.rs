pub mod fetcher;
pub mod image_processing;
pub mod placeholders;
