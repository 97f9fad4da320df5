use serde::{Deserialize, Serialize};

/// The wizard's two rendered steps. Finalization is not a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Step {
    /// Pick an entry and (optionally) a container page.
    #[serde(rename = "0")]
    One,
    /// Fill in the selected entry's form.
    #[serde(rename = "1")]
    Two,
}

impl Step {
    pub const ALL: [Step; 2] = [Step::One, Step::Two];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::One => "0",
            Step::Two => "1",
        }
    }

    pub fn parse(raw: &str) -> Option<Step> {
        match raw.trim() {
            "0" => Some(Step::One),
            "1" => Some(Step::Two),
            _ => None,
        }
    }

    pub fn first() -> Step {
        Step::One
    }

    pub fn last() -> Step {
        Step::Two
    }

    pub fn next(&self) -> Option<Step> {
        match self {
            Step::One => Some(Step::Two),
            Step::Two => None,
        }
    }

    pub fn prev(&self) -> Option<Step> {
        match self {
            Step::One => None,
            Step::Two => Some(Step::One),
        }
    }

    /// One-based position, for display.
    pub fn number(&self) -> usize {
        match self {
            Step::One => 1,
            Step::Two => 2,
        }
    }

    /// Submitted field name for `field` on this step, e.g. `0-page`.
    pub fn field_key(&self, field: &str) -> String {
        format!("{}-{}", self.as_str(), field)
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
