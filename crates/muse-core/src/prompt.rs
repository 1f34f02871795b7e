use crate::style::Style;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    CommitMessage,
    PrSummary,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::CommitMessage => "commit_message",
            RequestKind::PrSummary => "pr_summary",
        }
    }
}

/// One generation call's payload. Borrowed from the caller, never stored.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub kind: RequestKind,
    pub instruction: &'a str,
    pub diff: &'a str,
}

impl<'a> GenerationRequest<'a> {
    pub fn system_prompt(&self) -> &'static str {
        match self.kind {
            RequestKind::CommitMessage => COMMIT_SYSTEM_PROMPT,
            RequestKind::PrSummary => SUMMARY_SYSTEM_PROMPT,
        }
    }

    pub fn user_prompt(&self) -> String {
        let restatement = match self.kind {
            RequestKind::CommitMessage => COMMIT_RESTATEMENT,
            RequestKind::PrSummary => SUMMARY_RESTATEMENT,
        };
        let mut prompt = format!("{}\n\n{}", self.instruction.trim(), restatement);
        if !self.diff.trim().is_empty() {
            prompt.push_str("\n\nHere's the git diff:\n");
            prompt.push_str(self.diff);
        }
        prompt
    }
}

pub fn build<'a>(style: &'a Style, diff: &'a str) -> GenerationRequest<'a> {
    GenerationRequest {
        kind: RequestKind::CommitMessage,
        instruction: style.instruction(),
        diff,
    }
}

pub fn build_summary(diff: &str) -> GenerationRequest<'_> {
    GenerationRequest {
        kind: RequestKind::PrSummary,
        instruction: SUMMARY_INSTRUCTION,
        diff,
    }
}

pub const SUMMARY_INSTRUCTION: &str = "Summarize this pull request in 2-3 sentences. \
Explain what the changes do and their impact. Be clear and concise. \
Provide a summary that would be useful for code reviewers.";

const COMMIT_RESTATEMENT: &str =
    "Respond with ONLY the commit message, no explanations or additional text.";

const SUMMARY_RESTATEMENT: &str =
    "Respond with ONLY the summary, no explanations or additional text.";

const COMMIT_SYSTEM_PROMPT: &str = "You are a helpful assistant that generates git commit messages. \
Always respond with just the commit message, no explanations.";

const SUMMARY_SYSTEM_PROMPT: &str = "You are a helpful assistant that summarizes pull requests for code reviewers. \
Always respond with just the summary, no explanations.";
