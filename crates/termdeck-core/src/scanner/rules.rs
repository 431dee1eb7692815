use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ScannerSettings;

/// Glyphs used by the assistant for banners and borders
pub(crate) const BORDER_GLYPHS: [char; 4] = ['╭', '╰', '│', '─'];

/// Top-left rounded corner that opens the assistant's banner box
pub(crate) const BANNER_CORNER: char = '\u{256D}';

/// Prompt-like chunk ending: a newline, then a line ending in `$`, `#` or `>`
const PROMPT_PATTERN: &str = r"\n[^\n]*[\$#>]\s*$";

/// Dollar amount with at least two decimal digits
const COST_PATTERN: &str = r"\$([0-9]+\.[0-9]{2,})";

static DEFAULT_RULES: Lazy<ScanRules> = Lazy::new(|| {
    ScanRules::new(&ScannerSettings::default()).expect("default scan rules are valid")
});

/// Compiled detection patterns plus buffer sizing.
///
/// Word and digit classes are ASCII-only so that matches agree with the
/// heuristics the status UI was built against.
#[derive(Debug, Clone)]
pub struct ScanRules {
    /// `<Product>\s+(Code|<version>)`
    pub(crate) banner: Regex,
    /// `<product>-<segments><digit><segments>`
    pub(crate) model: Regex,
    /// Dollar amounts, last occurrence wins
    pub(crate) cost: Regex,
    /// Shell prompt at the end of a chunk
    pub(crate) prompt: Regex,
    /// Bare product-name mention
    pub(crate) product: Regex,
    /// Rolling buffer cap in characters
    pub buffer_cap: usize,
    /// Tail checked for border glyphs before declaring exit
    pub exit_tail_chars: usize,
    /// Inner tail that must not mention the product
    pub exit_name_tail_chars: usize,
}

impl ScanRules {
    /// Compile the rule set for the configured product name
    pub fn new(settings: &ScannerSettings) -> Result<Self, regex::Error> {
        let name = regex::escape(settings.product_name.trim());
        Ok(Self {
            banner: Regex::new(&format!(r"(?i){name}\s+(Code|[0-9.]+)"))?,
            model: Regex::new(&format!(
                r"((?i:{name})-[A-Za-z0-9_-]+[0-9][A-Za-z0-9_-]*)"
            ))?,
            cost: Regex::new(COST_PATTERN)?,
            prompt: Regex::new(PROMPT_PATTERN)?,
            product: Regex::new(&format!("(?i){name}"))?,
            buffer_cap: settings.buffer_cap,
            exit_tail_chars: settings.exit_tail_chars,
            exit_name_tail_chars: settings.exit_name_tail_chars,
        })
    }

    /// Rules for the default product with reference sizing
    pub fn default_rules() -> &'static ScanRules {
        &DEFAULT_RULES
    }

    /// Banner heuristic: product banner in the buffer, or the banner corner
    /// in this chunk with the product mentioned anywhere in the buffer
    pub(crate) fn detects_banner(&self, buffer: &str, chunk: &str) -> bool {
        self.banner.is_match(buffer)
            || (chunk.contains(BANNER_CORNER) && self.product.is_match(buffer))
    }

    /// First model identifier in the buffer
    pub(crate) fn find_model<'a>(&self, buffer: &'a str) -> Option<&'a str> {
        self.model
            .captures(buffer)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str())
    }

    /// Right-most cost figure in the buffer, including the dollar sign
    pub(crate) fn find_latest_cost<'a>(&self, buffer: &'a str) -> Option<&'a str> {
        self.cost.find_iter(buffer).last().map(|m| m.as_str())
    }

    /// Chunk ends at a shell prompt and does not itself mention the product
    pub(crate) fn looks_like_prompt(&self, chunk: &str) -> bool {
        self.prompt.is_match(chunk) && !self.product.is_match(chunk)
    }
}
