use serde::{Deserialize, Serialize};
use std::fmt;

/// An atomic linguistic unit being clustered: a wordform from one language
/// together with the definition or gloss it was attested with.
///
/// Elements are immutable identities. The derived lexicographic ordering
/// (language, then form, then gloss) is relied on for deterministic
/// tie-breaking throughout the engine.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Element {
    pub language: String,
    pub form: String,
    pub gloss: String,
}

impl Element {
    pub fn new(
        language: impl Into<String>,
        form: impl Into<String>,
        gloss: impl Into<String>,
    ) -> Self {
        Element {
            language: language.into(),
            form: form.into(),
            gloss: gloss.into(),
        }
    }

    /// Renders the element as a tab-separated line, the format used by both
    /// the input readers and the cluster report.
    pub fn as_line(&self) -> String {
        format!("{}\t{}\t{}", self.language, self.form, self.gloss)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.language, self.form, self.gloss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_lexicographic() {
        let a = Element::new("C", "akohp", "a star");
        let b = Element::new("C", "akohp", "star");
        let c = Element::new("M", "ahkop", "a star");
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn line_rendering_is_tab_separated() {
        let e = Element::new("F", "ahkopiwin", "covering");
        assert_eq!(e.as_line(), "F\tahkopiwin\tcovering");
    }
}
