/// How aggressively team names are canonicalised before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMode {
    /// Lower-case, `ё` → `е`, trimmed.
    Plain,
    /// `Plain`, then every non-word character (spaces and punctuation included) removed.
    Strict,
}

impl NameMode {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            NameMode::Strict
        } else {
            NameMode::Plain
        }
    }

    pub fn apply(self, name: &str) -> String {
        match self {
            NameMode::Plain => normalize(name),
            NameMode::Strict => normalize_strict(name),
        }
    }
}

pub fn normalize(name: &str) -> String {
    name.to_lowercase().replace('ё', "е").trim().to_string()
}

pub fn normalize_strict(name: &str) -> String {
    normalize(name)
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}
