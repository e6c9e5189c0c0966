//! User preferences
//!
//! Consolidation of free-text preferences and the fragment section they are
//! written into.

mod consolidate;
mod section;

pub use consolidate::{
    Consolidation, Consolidator, DEFAULT_MAX_SECTION_SIZE, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_SOFT_LIMIT, Duplicate,
    consolidate, find_duplicate, jaccard_similarity, over_soft_limit, split_prompts,
};
pub use section::{
    EMPTY_MARKER, SECTION_HEADER, parse_preferences, read_preferences, render_section, section_size, splice_section,
    write_preferences,
};
