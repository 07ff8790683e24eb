use crate::label::Label;

/// Human-facing symbol for a label: a textual alias and the glyph itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiSymbol {
    pub alias: String,
    pub glyph: String,
}

/// Translates labels into display symbols. Only used for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiMap {
    symbols: Vec<EmojiSymbol>,
}

impl Default for EmojiMap {
    /// The five categories of the reference data set.
    fn default() -> Self {
        Self::from_pairs([
            (":heart:", "\u{2764}\u{fe0f}"),
            (":baseball:", "\u{26be}"),
            (":smile:", "\u{1f604}"),
            (":disappointed:", "\u{1f61e}"),
            (":fork_and_knife:", "\u{1f374}"),
        ])
    }
}

impl EmojiMap {
    /// Builds a map where the i-th pair describes label `i`.
    pub fn from_pairs<I, A, G>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, G)>,
        A: Into<String>,
        G: Into<String>,
    {
        Self {
            symbols: pairs
                .into_iter()
                .map(|(alias, glyph)| EmojiSymbol {
                    alias: alias.into(),
                    glyph: glyph.into(),
                })
                .collect(),
        }
    }

    pub fn symbol(&self, label: Label) -> Option<&EmojiSymbol> {
        self.symbols.get(label.index())
    }

    pub fn glyph(&self, label: Label) -> Option<&str> {
        self.symbol(label).map(|s| s.glyph.as_str())
    }

    pub fn alias(&self, label: Label) -> Option<&str> {
        self.symbol(label).map(|s| s.alias.as_str())
    }

    /// Glyph for `label`, falling back to the numeric label when unmapped.
    pub fn display(&self, label: Label) -> String {
        self.glyph(label)
            .map(str::to_string)
            .unwrap_or_else(|| format!("[{}]", label))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
