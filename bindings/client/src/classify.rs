use gateway_tunnel_core::prelude::HarnessError;

/// Reported first when the assembled answer is empty or whitespace.
pub const BLANK_RESPONSE: &str = "blank response";

enum Pattern {
    /// Any of the phrases, anywhere in the lowercase text.
    Phrase(&'static [&'static str]),
    /// A JSON key carrying a value other than `null`, `false` or `""`.
    Field(&'static str),
}

struct Signature {
    name: &'static str,
    pattern: Pattern,
}

const SIGNATURES: &[Signature] = &[
    Signature {
        name: "reasoning stage error",
        pattern: Pattern::Phrase(&["reasoning_error", "reasoning error"]),
    },
    Signature {
        name: "fulfillment stage error",
        pattern: Pattern::Phrase(&["fulfillment_error", "fulfillment error"]),
    },
    Signature {
        name: "error flag",
        pattern: Pattern::Field("error"),
    },
    Signature {
        name: "error code",
        pattern: Pattern::Field("error_code"),
    },
    Signature {
        name: "internal server error",
        pattern: Pattern::Phrase(&["internal server error", "internal_server_error"]),
    },
    Signature {
        name: "execution failed",
        pattern: Pattern::Phrase(&["execution failed", "failed to execute"]),
    },
    Signature {
        name: "tool execution failed",
        pattern: Pattern::Phrase(&["tool execution failed", "plugin execution failed"]),
    },
];

/// The verdict on the content of a finished stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    signatures: Vec<String>,
}

impl Classification {
    pub fn is_failure(&self) -> bool {
        !self.signatures.is_empty()
    }

    /// Detected signature names in their fixed order.
    pub fn signatures(&self) -> &[String] {
        &self.signatures
    }

    pub fn into_error(self) -> Option<HarnessError> {
        self.is_failure().then_some(HarnessError::Content {
            signatures: self.signatures,
        })
    }
}

/// Judge a finished stream from its raw transcript and its assembled answer.
pub fn classify(full_text: &str, final_answer: &str) -> Classification {
    let mut signatures = Vec::new();
    if final_answer.trim().is_empty() {
        signatures.push(BLANK_RESPONSE.to_string());
    }

    let texts = [full_text, final_answer].map(|text| Texts::new(text));
    signatures.extend(
        SIGNATURES
            .iter()
            .filter(|signature| texts.iter().any(|text| text.matches(&signature.pattern)))
            .map(|signature| signature.name.to_string()),
    );

    Classification { signatures }
}

struct Texts {
    lower: String,
    compact: String,
}

impl Texts {
    fn new(text: &str) -> Self {
        let lower = text.to_lowercase();
        let compact = lower.chars().filter(|c| !c.is_whitespace()).collect();
        Self { lower, compact }
    }

    fn matches(&self, pattern: &Pattern) -> bool {
        match pattern {
            Pattern::Phrase(phrases) => phrases.iter().any(|phrase| self.lower.contains(phrase)),
            Pattern::Field(key) => has_set_field(&self.compact, key),
        }
    }
}

fn has_set_field(compact: &str, key: &str) -> bool {
    let needle = format!("\"{key}\":");
    compact.match_indices(&needle).any(|(at, _)| {
        let value = &compact[at + needle.len()..];
        !(value.is_empty()
            || value.starts_with("null")
            || value.starts_with("false")
            || value.starts_with("\"\""))
    })
}
