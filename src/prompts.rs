//! Prompt templates for every editor action.

use crate::actions::ActionKind;

/// Prompt templates used by the built-in actions
pub struct PromptLibrary;

impl PromptLibrary {
    /// Build the prompt for `kind` around `input` (selected code, or an
    /// error message for fixes). Blank input yields no prompt.
    pub fn for_action(kind: ActionKind, input: &str) -> Option<String> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        let prompt = match kind {
            ActionKind::Comment => Self::comment(input),
            ActionKind::Review => Self::review(input),
            ActionKind::Refactor => Self::refactor(input),
            ActionKind::Optimize => Self::optimize(input),
            ActionKind::Explain => Self::explain(input),
            ActionKind::Fix => Self::fix(input),
            ActionKind::InterviewMe => Self::interview_me(input),
            ActionKind::UnitTest => Self::unit_test(input),
            ActionKind::Chart => Self::chart(input),
        };
        Some(prompt)
    }

    fn comment(code: &str) -> String {
        format!(
            "You are an expert software engineer. Add clear, concise comments to the code below. \
            Describe what a developer would need to know to write this code from scratch, \
            without restating what is already obvious from the code itself. \
            Return the complete commented code only.\n\n\
            Code:\n{code}"
        )
    }

    fn review(code: &str) -> String {
        format!(
            "You are a senior engineer doing a code review. Review the code below for \
            correctness, readability, security, performance and maintainability. \
            For each issue, name the line or construct, explain the problem and suggest a fix. \
            Finish with a short overall assessment.\n\n\
            Code:\n{code}"
        )
    }

    fn refactor(code: &str) -> String {
        format!(
            "Refactor the code below to improve its structure and readability without changing \
            its behavior. Apply well-known design principles where they help. \
            Return the refactored code followed by a brief list of the changes you made.\n\n\
            Code:\n{code}"
        )
    }

    fn optimize(code: &str) -> String {
        format!(
            "Optimize the code below for time and memory efficiency while keeping it readable \
            and behaviorally identical. Explain each optimization and its expected impact, \
            then return the optimized code.\n\n\
            Code:\n{code}"
        )
    }

    fn explain(code: &str) -> String {
        format!(
            "Explain the code below in plain language for a developer who is new to it. \
            Cover its purpose, how it works step by step, and any non-obvious behavior \
            or edge cases.\n\n\
            Code:\n{code}"
        )
    }

    fn fix(error: &str) -> String {
        format!(
            "A developer hit the error below. Identify the most likely root cause, \
            explain it briefly, and provide a concrete fix with corrected code.\n\n\
            Error:\n{error}"
        )
    }

    fn interview_me(code: &str) -> String {
        format!(
            "Act as a technical interviewer. Based on the code below, write interview questions \
            that test a candidate's understanding of the concepts, trade-offs and pitfalls it \
            involves. Include a short model answer for each question.\n\n\
            Code:\n{code}"
        )
    }

    fn unit_test(code: &str) -> String {
        format!(
            "Write thorough unit tests for the code below using the testing framework that is \
            idiomatic for its language. Cover normal behavior, edge cases and error paths. \
            Return the test code only.\n\n\
            Code:\n{code}"
        )
    }

    fn chart(code: &str) -> String {
        format!(
            "Produce a Mermaid flowchart that shows the control flow of the code below. \
            Use plain `A --> B` and `A -->|label| B` edges. \
            Return only the Mermaid source without surrounding explanation.\n\n\
            Code:\n{code}"
        )
    }
}
