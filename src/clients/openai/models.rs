#[derive(Debug, Clone, PartialEq, Default)]
pub enum OpenAIModel {
    Gpt4o,
    Gpt4oMini,
    Gpt41,
    #[default]
    Gpt41Mini,
    Override(String),
}

impl OpenAIModel {
    pub fn id(&self) -> &str {
        match self {
            Self::Gpt4o => "gpt-4o",
            Self::Gpt4oMini => "gpt-4o-mini",
            Self::Gpt41 => "gpt-4.1",
            Self::Gpt41Mini => "gpt-4.1-mini",
            Self::Override(s) => s.as_str(),
        }
    }

    /// Map a model id back to a known variant, keeping unknown ids verbatim.
    pub fn from_id(id: &str) -> Self {
        match id {
            "gpt-4o" => Self::Gpt4o,
            "gpt-4o-mini" => Self::Gpt4oMini,
            "gpt-4.1" => Self::Gpt41,
            "gpt-4.1-mini" => Self::Gpt41Mini,
            other => Self::Override(other.to_string()),
        }
    }
}
