//! Parsers for note text: frontmatter, hashtags, wikilinks, code blocks.

pub mod code_block;
pub mod frontmatter;
pub mod tag;
pub mod wikilink;

pub use code_block::{fenced_lines, mask_inline_code};
pub use frontmatter::{parse_frontmatter_tags, split_frontmatter};
pub use tag::{normalize_tag, parse_hashtags, validate_tag};
pub use wikilink::{parse_all_links, parse_wikilink_tags};
