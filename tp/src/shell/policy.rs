//! InteractionPolicy - prompt patterns recognized during privileged execution

use regex::Regex;
use tracing::debug;

use crate::config::PrivilegedConfig;

/// What to do when a prompt pattern matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAction {
    /// Write the credential followed by a newline (at most once)
    SupplyCredential,
    /// Write the affirmative response followed by a newline
    Affirm,
    /// Stop interacting and close the session
    Complete,
}

/// A compiled prompt pattern and its action
#[derive(Debug, Clone)]
pub struct PromptRule {
    pub pattern: Regex,
    pub action: PromptAction,
}

/// Password prompt variants, matched case-sensitively
pub const DEFAULT_PASSWORD_PROMPTS: &[&str] = &[r"\[sudo\] password for.*:", r"Password:", r"password:"];

/// Yes/no confirmation variants
pub const DEFAULT_CONFIRMATION_PROMPTS: &[&str] = &[
    r"Proceed with installation\? \[Y/n\]",
    r"\[Y/n\]",
    r"\(y/N\)",
    r"Continue\? \[Y/n\]",
    r"Do you want to continue\? \[Y/n\]",
];

/// Output that means no further interaction can help
pub const DEFAULT_COMPLETION_PROMPTS: &[&str] = &[r"Sorry, try again\.", r"sudo: \d+ incorrect password attempts?"];

/// Prompt patterns grouped by the phase that watches for them
#[derive(Debug, Clone)]
pub struct InteractionPolicy {
    password: Vec<PromptRule>,
    confirmation: Vec<PromptRule>,
    affirmative: String,
}

impl InteractionPolicy {
    /// Build a policy from raw patterns
    pub fn new(password: &[String], confirmation: &[String], completion: &[String], affirmative: &str) -> Result<Self, regex::Error> {
        debug!(
            password = password.len(),
            confirmation = confirmation.len(),
            completion = completion.len(),
            "InteractionPolicy::new: called"
        );
        let password = compile(password, PromptAction::SupplyCredential)?;

        // Completion markers are watched alongside confirmations and win ties
        let mut confirmation_rules = compile(completion, PromptAction::Complete)?;
        confirmation_rules.extend(compile(confirmation, PromptAction::Affirm)?);

        Ok(Self {
            password,
            confirmation: confirmation_rules,
            affirmative: affirmative.to_string(),
        })
    }

    pub fn from_config(config: &PrivilegedConfig) -> Result<Self, regex::Error> {
        Self::new(
            &config.password_prompts,
            &config.confirmation_prompts,
            &config.completion_prompts,
            &config.affirmative_response,
        )
    }

    /// Rules watched while waiting for the password prompt
    pub fn password_rules(&self) -> &[PromptRule] {
        &self.password
    }

    /// Rules watched in the confirmation loop
    pub fn confirmation_rules(&self) -> &[PromptRule] {
        &self.confirmation
    }

    pub fn affirmative(&self) -> &str {
        &self.affirmative
    }
}

impl Default for InteractionPolicy {
    fn default() -> Self {
        Self::from_config(&PrivilegedConfig::default()).expect("default prompt patterns compile")
    }
}

fn compile(patterns: &[String], action: PromptAction) -> Result<Vec<PromptRule>, regex::Error> {
    patterns
        .iter()
        .map(|p| {
            Ok(PromptRule {
                pattern: Regex::new(p)?,
                action,
            })
        })
        .collect()
}

/// Find the earliest rule match in `haystack`
///
/// Returns the rule index and the byte offset just past the match. When two
/// rules match at the same offset the one listed first wins.
pub fn find_earliest(rules: &[PromptRule], haystack: &str) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, usize)> = None;
    for (idx, rule) in rules.iter().enumerate() {
        if let Some(m) = rule.pattern.find(haystack) {
            let better = match best {
                Some((_, start, _)) => m.start() < start,
                None => true,
            };
            if better {
                best = Some((idx, m.start(), m.end()));
            }
        }
    }
    best.map(|(idx, _, end)| (idx, end))
}
