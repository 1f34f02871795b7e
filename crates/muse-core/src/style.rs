//! Commit message styles ("vibes").
//!
//! The instruction is what steers generation; the example is shown to users
//! and never sent to a backend.

pub const DEFAULT_STYLE_ID: &str = "conventional";
pub const CUSTOM_STYLE_ID: &str = "custom";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleDef {
    pub id: &'static str,
    pub display_name: &'static str,
    pub instruction: &'static str,
    pub example: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Style {
    Builtin(&'static StyleDef),
    /// Instruction supplied by configuration at the call boundary.
    Custom { instruction: String },
}

impl Style {
    pub fn id(&self) -> &str {
        match self {
            Style::Builtin(def) => def.id,
            Style::Custom { .. } => CUSTOM_STYLE_ID,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Style::Builtin(def) => def.display_name,
            Style::Custom { .. } => "Custom",
        }
    }

    pub fn instruction(&self) -> &str {
        match self {
            Style::Builtin(def) => def.instruction,
            Style::Custom { instruction } => instruction,
        }
    }

    pub fn example(&self) -> Option<&str> {
        match self {
            Style::Builtin(def) => Some(def.example),
            Style::Custom { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StyleCatalog {
    styles: &'static [StyleDef],
}

impl Default for StyleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StyleCatalog {
    pub fn builtin() -> Self {
        Self {
            styles: &BUILTIN_STYLES,
        }
    }

    pub fn styles(&self) -> &'static [StyleDef] {
        self.styles
    }

    pub fn get(&self, style_id: &str) -> Option<&'static StyleDef> {
        self.styles.iter().find(|def| def.id == style_id)
    }

    /// Total: unknown ids and an empty custom instruction fall back to
    /// `conventional`.
    pub fn resolve(&self, style_id: &str, custom_instruction: Option<&str>) -> Style {
        if style_id == CUSTOM_STYLE_ID {
            if let Some(instruction) = custom_instruction.map(str::trim) {
                if !instruction.is_empty() {
                    return Style::Custom {
                        instruction: instruction.to_string(),
                    };
                }
            }
            return Style::Builtin(self.conventional());
        }

        match self.get(style_id) {
            Some(def) => Style::Builtin(def),
            None => Style::Builtin(self.conventional()),
        }
    }

    fn conventional(&self) -> &'static StyleDef {
        self.get(DEFAULT_STYLE_ID).unwrap_or(&BUILTIN_STYLES[0])
    }
}

static BUILTIN_STYLES: [StyleDef; 6] = [
    StyleDef {
        id: "conventional",
        display_name: "Conventional Commits",
        instruction: "Generate a conventional commit message following the format: type(scope): description. \
Types include: feat, fix, docs, style, refactor, test, chore. Be concise and descriptive.",
        example: "feat(auth): add user authentication with JWT tokens",
    },
    StyleDef {
        id: "emoji",
        display_name: "Emoji Style",
        instruction: "Generate a commit message with relevant emojis. Use emojis that match the type of change.",
        example: "\u{2728} Add user authentication with JWT tokens",
    },
    StyleDef {
        id: "corporate",
        display_name: "Corporate Professional",
        instruction: "Generate a professional, formal commit message suitable for corporate environments. \
Focus on business impact and technical accuracy.",
        example: "Implement user authentication functionality using JWT tokens",
    },
    StyleDef {
        id: "casual",
        display_name: "Casual & Friendly",
        instruction: "Generate a casual, friendly commit message that explains what was done in simple terms.",
        example: "Added login functionality so users can sign in securely",
    },
    StyleDef {
        id: "genz",
        display_name: "Gen Z Vibes",
        instruction: "Generate a fun, Gen Z style commit message with modern slang and energy. \
Keep it professional but with personality.",
        example: "no cap added fire auth system that actually slaps \u{1F525}",
    },
    StyleDef {
        id: "tldr",
        display_name: "TLDR Dev",
        instruction: "Generate a concise, developer-friendly commit message that quickly explains what changed. \
Use casual but clear language. Start with action verbs like \"add\", \"fix\", \"update\", \"remove\".",
        example: "add jwt login flow",
    },
];
