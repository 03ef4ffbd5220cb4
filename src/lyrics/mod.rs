// lyrics/mod.rs - lyric acquisition, parsing and time lookup
pub mod cascade;
pub mod clean;
pub mod parse;
pub mod providers;
pub mod similarity;
pub mod types;

pub use cascade::LyricsFetcher;
pub use clean::LyricsQuery;
pub use providers::{LrclibClient, LyricsCatalog};
pub use types::{LyricsDocument, LyricsResult, MatchStage};
