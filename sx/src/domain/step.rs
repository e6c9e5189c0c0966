//! Step definitions and the step/phase table
//!
//! The six steps form a closed, ordered set. Every step has exactly one phase
//! except Brainstorming, which has two (brainstorm, then task list).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SessionError, SessionResult};

/// One of the six workflow steps, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Step {
    #[serde(rename = "1")]
    Understanding,
    #[serde(rename = "2")]
    Assessment,
    #[serde(rename = "3")]
    Brainstorming,
    #[serde(rename = "4")]
    Implementation,
    #[serde(rename = "5")]
    Testing,
    #[serde(rename = "6")]
    Insights,
}

impl Step {
    /// All steps in workflow order
    pub const ALL: [Step; 6] = [
        Step::Understanding,
        Step::Assessment,
        Step::Brainstorming,
        Step::Implementation,
        Step::Testing,
        Step::Insights,
    ];

    /// The first step of every session
    pub const FIRST: Step = Step::Understanding;

    /// The final step; exhausting its phases completes the session
    pub const LAST: Step = Step::Insights;

    /// Step number (1-6)
    pub fn number(&self) -> u32 {
        match self {
            Self::Understanding => 1,
            Self::Assessment => 2,
            Self::Brainstorming => 3,
            Self::Implementation => 4,
            Self::Testing => 5,
            Self::Insights => 6,
        }
    }

    /// Look up a step by its number
    pub fn from_number(number: u32) -> Option<Self> {
        debug!(%number, "Step::from_number: called");
        Self::ALL.into_iter().find(|step| step.number() == number)
    }

    /// Display name used in prompts and the status mirror
    pub fn name(&self) -> &'static str {
        match self {
            Self::Understanding => "Understanding Problem Statement",
            Self::Assessment => "Current Situation Assessment",
            Self::Brainstorming => "Brainstorming Session",
            Self::Implementation => "Implementation",
            Self::Testing => "Testing & Optimization",
            Self::Insights => "Insights Extraction",
        }
    }

    /// Number of phases declared for this step
    pub fn phase_count(&self) -> u32 {
        match self {
            Self::Brainstorming => 2,
            _ => 1,
        }
    }

    /// Check that a phase number is declared for this step
    pub fn has_phase(&self, phase: u32) -> bool {
        (1..=self.phase_count()).contains(&phase)
    }

    /// The step after this one, or None for the last step
    pub fn next(&self) -> Option<Self> {
        debug!(?self, "Step::next: called");
        Self::ALL.into_iter().find(|step| step.number() == self.number() + 1)
    }

    /// The step before this one, or None for the first step
    pub fn previous(&self) -> Option<Self> {
        debug!(?self, "Step::previous: called");
        Self::ALL.into_iter().find(|step| step.number() + 1 == self.number())
    }

    /// "N - Name" label used by the status mirror
    pub fn label(&self) -> String {
        format!("{} - {}", self.number(), self.name())
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl std::str::FromStr for Step {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "Step::from_str: called");
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::from_number)
            .ok_or_else(|| SessionError::InvalidStep { value: s.to_string() })
    }
}

/// A validated (step, phase) position in the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot {
    step: Step,
    phase: u32,
}

impl Slot {
    /// Build a slot, rejecting phases not declared for the step
    pub fn new(step: Step, phase: u32) -> SessionResult<Self> {
        debug!(?step, %phase, "Slot::new: called");
        if step.has_phase(phase) {
            Ok(Self { step, phase })
        } else {
            debug!("Slot::new: phase out of range");
            Err(SessionError::InvalidPhase {
                step: step.to_string(),
                phase,
            })
        }
    }

    /// The first slot of the workflow
    pub fn first() -> Self {
        Self {
            step: Step::FIRST,
            phase: 1,
        }
    }

    /// The first phase of the given step
    pub fn first_of(step: Step) -> Self {
        Self { step, phase: 1 }
    }

    /// The last phase of the given step
    pub fn last_of(step: Step) -> Self {
        Self {
            step,
            phase: step.phase_count(),
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn phase(&self) -> u32 {
        self.phase
    }

    /// Next slot in the workflow, or None when the last phase of the last step is done
    pub fn next(&self) -> Option<Self> {
        debug!(?self, "Slot::next: called");
        if self.phase < self.step.phase_count() {
            debug!("Slot::next: more phases in step");
            Some(Self {
                step: self.step,
                phase: self.phase + 1,
            })
        } else {
            debug!("Slot::next: phases exhausted, moving to next step");
            self.step.next().map(|step| Self { step, phase: 1 })
        }
    }

    /// Previous slot in the workflow, or None at the very beginning
    pub fn previous(&self) -> Option<Self> {
        debug!(?self, "Slot::previous: called");
        if self.phase > 1 {
            Some(Self {
                step: self.step,
                phase: self.phase - 1,
            })
        } else {
            self.step.previous().map(Self::last_of)
        }
    }

    /// Whether this slot is the final position of the workflow
    pub fn is_final(&self) -> bool {
        self.step == Step::LAST && self.phase == Step::LAST.phase_count()
    }

    /// "Phase N" label used by the status mirror
    pub fn phase_label(&self) -> String {
        format!("Phase {}", self.phase)
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Step {}, Phase {}", self.step, self.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order_and_numbers() {
        let numbers: Vec<u32> = Step::ALL.iter().map(|s| s.number()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(Step::from_number(3), Some(Step::Brainstorming));
        assert_eq!(Step::from_number(0), None);
        assert_eq!(Step::from_number(7), None);
    }

    #[test]
    fn test_phase_table() {
        for step in Step::ALL {
            let expected = if step == Step::Brainstorming { 2 } else { 1 };
            assert_eq!(step.phase_count(), expected, "step {}", step);
        }
        assert!(Step::Brainstorming.has_phase(2));
        assert!(!Step::Implementation.has_phase(2));
        assert!(!Step::Understanding.has_phase(0));
    }

    #[test]
    fn test_step_next_and_previous() {
        assert_eq!(Step::Understanding.next(), Some(Step::Assessment));
        assert_eq!(Step::Insights.next(), None);
        assert_eq!(Step::Understanding.previous(), None);
        assert_eq!(Step::Implementation.previous(), Some(Step::Brainstorming));
    }

    #[test]
    fn test_step_from_str() {
        assert_eq!("4".parse::<Step>().unwrap(), Step::Implementation);
        assert_eq!(" 6 ".parse::<Step>().unwrap(), Step::Insights);
        assert!(matches!(
            "7".parse::<Step>(),
            Err(SessionError::InvalidStep { value }) if value == "7"
        ));
        let err = "four".parse::<Step>().unwrap_err();
        assert_eq!(err.to_string(), "'four' is not a step number (1-6)");
    }

    #[test]
    fn test_step_serde_uses_numbers() {
        let json = serde_json::to_string(&Step::Brainstorming).unwrap();
        assert_eq!(json, "\"3\"");
        let step: Step = serde_json::from_str("\"5\"").unwrap();
        assert_eq!(step, Step::Testing);
    }

    #[test]
    fn test_slot_rejects_undeclared_phase() {
        assert!(Slot::new(Step::Brainstorming, 2).is_ok());
        assert!(matches!(
            Slot::new(Step::Assessment, 2),
            Err(SessionError::InvalidPhase { phase: 2, .. })
        ));
        assert!(Slot::new(Step::Assessment, 0).is_err());
    }

    #[test]
    fn test_slot_walk_covers_every_phase() {
        let mut slot = Slot::first();
        let mut visited = vec![slot];
        while let Some(next) = slot.next() {
            visited.push(next);
            slot = next;
        }
        let labels: Vec<String> = visited.iter().map(|s| s.to_string()).collect();
        assert_eq!(
            labels,
            vec![
                "Step 1, Phase 1",
                "Step 2, Phase 1",
                "Step 3, Phase 1",
                "Step 3, Phase 2",
                "Step 4, Phase 1",
                "Step 5, Phase 1",
                "Step 6, Phase 1",
            ]
        );
        assert!(slot.is_final());
    }

    #[test]
    fn test_slot_previous_inverts_next() {
        let mut slot = Slot::first();
        while let Some(next) = slot.next() {
            assert_eq!(next.previous(), Some(slot));
            slot = next;
        }
        assert_eq!(Slot::first().previous(), None);
    }
}
