pub mod checker;
pub mod dedup;
pub mod diff;
pub mod extractor;
pub mod fetcher;
pub mod guard;
pub mod normalizer;
pub mod scheduler;
