//! Confirmation and dry-run gate in front of every mutating call.

use crate::error::Result;
use crate::plan::Action;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// Show the plan and ask before applying.
    Interactive,
    /// Apply without asking (scheduled runs).
    Automatic,
    /// Show the plan; never call a mutating endpoint.
    DryRun,
}

impl GateMode {
    pub fn from_flags(live: bool, cron: bool) -> Self {
        match (live, cron) {
            (false, _) => GateMode::DryRun,
            (true, true) => GateMode::Automatic,
            (true, false) => GateMode::Interactive,
        }
    }

    pub fn is_live(self) -> bool {
        self != GateMode::DryRun
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Planned,
    Confirmed,
    Rejected,
    Applied,
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// Source of operator answers.
pub trait Prompt {
    /// Ask a yes/no question; `default` is used on an empty answer.
    fn confirm(&mut self, question: &str, default: bool) -> bool;

    /// Ask for free text; `None` on an empty answer.
    fn ask(&mut self, question: &str) -> Option<String>;
}

/// Reads answers from stdin.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl StdinPrompt {
    fn read_line(question: &str) -> String {
        print!("{question} ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line).is_err() {
            return String::new();
        }
        line.trim().to_string()
    }
}

impl Prompt for StdinPrompt {
    fn confirm(&mut self, question: &str, default: bool) -> bool {
        let answer = Self::read_line(question).to_lowercase();
        match answer.as_str() {
            "" => default,
            "y" | "yes" => true,
            _ => false,
        }
    }

    fn ask(&mut self, question: &str) -> Option<String> {
        let answer = Self::read_line(question);
        (!answer.is_empty()).then_some(answer)
    }
}

/// Canned answers, consumed in order. Used by tests and non-tty callers.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    pub asked: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    fn next(&mut self, question: &str) -> String {
        self.asked.push(question.to_string());
        self.answers.pop_front().unwrap_or_default()
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&mut self, question: &str, default: bool) -> bool {
        match self.next(question).to_lowercase().as_str() {
            "" => default,
            "y" | "yes" => true,
            _ => false,
        }
    }

    fn ask(&mut self, question: &str) -> Option<String> {
        let answer = self.next(question);
        (!answer.is_empty()).then_some(answer)
    }
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Performs one action against the owning system.
pub trait Apply {
    fn apply(&mut self, action: &Action) -> Result<()>;

    /// Pause after a successful call of this kind.
    fn pause_for(&self, _action: &Action) -> Option<Duration> {
        None
    }
}

impl<F> Apply for F
where
    F: FnMut(&Action) -> Result<()>,
{
    fn apply(&mut self, action: &Action) -> Result<()> {
        self(action)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateOutcome {
    pub state: GateState,
    pub applied: Vec<Action>,
    pub failed: usize,
}

impl GateOutcome {
    fn new(state: GateState) -> Self {
        Self {
            state,
            applied: Vec::new(),
            failed: 0,
        }
    }
}

pub struct Gate<'p> {
    pub mode: GateMode,
    pause: Duration,
    prompt: &'p mut dyn Prompt,
}

impl<'p> Gate<'p> {
    pub fn new(mode: GateMode, pause: Duration, prompt: &'p mut dyn Prompt) -> Self {
        Self {
            mode,
            pause,
            prompt,
        }
    }

    pub fn prompt(&mut self) -> &mut (dyn Prompt + 'p) {
        &mut *self.prompt
    }

    /// Summarise `actions`, then apply them as a batch according to the mode.
    pub fn run(&mut self, actions: &[Action], applier: &mut dyn Apply) -> Result<GateOutcome> {
        if actions.is_empty() {
            tracing::info!("nothing to do");
            return Ok(GateOutcome::new(GateState::Planned));
        }
        for action in actions {
            println!("  {action}");
        }
        match self.mode {
            GateMode::DryRun => {
                tracing::info!("dry run: {} action(s) planned, none applied", actions.len());
                Ok(GateOutcome::new(GateState::Planned))
            }
            GateMode::Interactive => {
                if self.prompt.confirm("Action? [y/N]", false) {
                    self.apply_all(actions, applier)
                } else {
                    tracing::info!("not applying {} action(s)", actions.len());
                    Ok(GateOutcome::new(GateState::Rejected))
                }
            }
            GateMode::Automatic => self.apply_all(actions, applier),
        }
    }

    /// Ask for each action separately (interactive), or apply each
    /// (automatic). The outcome is `Applied` if at least one action went
    /// through.
    pub fn confirm_each(
        &mut self,
        actions: &[Action],
        applier: &mut dyn Apply,
    ) -> Result<GateOutcome> {
        let mut outcome = GateOutcome::new(GateState::Planned);
        for action in actions {
            match self.mode {
                GateMode::DryRun => {
                    println!("  {action}");
                }
                GateMode::Interactive => {
                    if !self.prompt.confirm(&format!("{action}? [Y/n]"), true) {
                        outcome.state = GateState::Rejected;
                        continue;
                    }
                    self.apply_one(action, applier, &mut outcome)?;
                }
                GateMode::Automatic => {
                    self.apply_one(action, applier, &mut outcome)?;
                }
            }
        }
        if !outcome.applied.is_empty() {
            outcome.state = GateState::Applied;
        }
        Ok(outcome)
    }

    /// Like `confirm_each`, but each answer defaults to no and unattended
    /// runs apply nothing. For actions someone has to look at one by one.
    pub fn review_each(
        &mut self,
        actions: &[Action],
        applier: &mut dyn Apply,
    ) -> Result<GateOutcome> {
        let mut outcome = GateOutcome::new(GateState::Planned);
        match self.mode {
            GateMode::DryRun => {
                for action in actions {
                    println!("  {action}");
                }
            }
            GateMode::Automatic => {
                if !actions.is_empty() {
                    tracing::info!("{} action(s) need review; skipped in unattended mode", actions.len());
                }
            }
            GateMode::Interactive => {
                for action in actions {
                    if self.prompt.confirm(&format!("{action}? [y/N]"), false) {
                        self.apply_one(action, applier, &mut outcome)?;
                    } else {
                        outcome.state = GateState::Rejected;
                    }
                }
            }
        }
        if !outcome.applied.is_empty() {
            outcome.state = GateState::Applied;
        }
        Ok(outcome)
    }

    fn apply_all(&mut self, actions: &[Action], applier: &mut dyn Apply) -> Result<GateOutcome> {
        let mut outcome = GateOutcome::new(GateState::Confirmed);
        for action in actions {
            self.apply_one(action, applier, &mut outcome)?;
        }
        outcome.state = GateState::Applied;
        Ok(outcome)
    }

    fn apply_one(
        &mut self,
        action: &Action,
        applier: &mut dyn Apply,
        outcome: &mut GateOutcome,
    ) -> Result<()> {
        match applier.apply(action) {
            Ok(()) => {
                tracing::info!("{action}");
                outcome.applied.push(action.clone());
                let pause = applier.pause_for(action).unwrap_or(self.pause);
                if !pause.is_zero() {
                    std::thread::sleep(pause);
                }
                Ok(())
            }
            Err(e) if !e.is_fatal() => {
                tracing::error!("{action} failed: {e}");
                outcome.failed += 1;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RosterError;

    fn invites(users: &[&str]) -> Vec<Action> {
        users
            .iter()
            .map(|u| Action::Invite {
                channel: "ops".into(),
                user: u.to_string(),
            })
            .collect()
    }

    fn recorder(log: &mut Vec<Action>) -> impl FnMut(&Action) -> Result<()> + '_ {
        move |a: &Action| {
            log.push(a.clone());
            Ok(())
        }
    }

    #[test]
    fn mode_from_flags() {
        assert_eq!(GateMode::from_flags(false, true), GateMode::DryRun);
        assert_eq!(GateMode::from_flags(true, true), GateMode::Automatic);
        assert_eq!(GateMode::from_flags(true, false), GateMode::Interactive);
    }

    #[test]
    fn dry_run_never_applies() {
        let mut prompt = ScriptedPrompt::new(["y"]);
        let mut log = Vec::new();
        let mut gate = Gate::new(GateMode::DryRun, Duration::ZERO, &mut prompt);
        let out = gate.run(&invites(&["A", "C"]), &mut recorder(&mut log)).unwrap();
        assert_eq!(out.state, GateState::Planned);
        assert!(log.is_empty());
        assert!(prompt.asked.is_empty());
    }

    #[test]
    fn interactive_yes_applies_in_order() {
        let mut prompt = ScriptedPrompt::new(["y"]);
        let mut log = Vec::new();
        let mut gate = Gate::new(GateMode::Interactive, Duration::ZERO, &mut prompt);
        let out = gate.run(&invites(&["A", "C"]), &mut recorder(&mut log)).unwrap();
        assert_eq!(out.state, GateState::Applied);
        assert_eq!(log, invites(&["A", "C"]));
        assert_eq!(prompt.asked, vec!["Action? [y/N]"]);
    }

    #[test]
    fn interactive_default_is_no() {
        let mut prompt = ScriptedPrompt::new([""]);
        let mut log = Vec::new();
        let mut gate = Gate::new(GateMode::Interactive, Duration::ZERO, &mut prompt);
        let out = gate.run(&invites(&["A"]), &mut recorder(&mut log)).unwrap();
        assert_eq!(out.state, GateState::Rejected);
        assert!(log.is_empty());
    }

    #[test]
    fn automatic_applies_without_asking() {
        let mut prompt = ScriptedPrompt::default();
        let mut log = Vec::new();
        let mut gate = Gate::new(GateMode::Automatic, Duration::ZERO, &mut prompt);
        let out = gate.run(&invites(&["A"]), &mut recorder(&mut log)).unwrap();
        assert_eq!(out.state, GateState::Applied);
        assert_eq!(log.len(), 1);
        assert!(prompt.asked.is_empty());
    }

    #[test]
    fn rejected_call_continues_fatal_aborts() {
        let mut prompt = ScriptedPrompt::default();
        let mut gate = Gate::new(GateMode::Automatic, Duration::ZERO, &mut prompt);

        let mut refuse_b = |a: &Action| match a {
            Action::Invite { user, .. } if user == "B" => {
                Err(RosterError::rejected("chat", "already_in_channel"))
            }
            _ => Ok(()),
        };
        let out = gate.run(&invites(&["A", "B", "C"]), &mut refuse_b).unwrap();
        assert_eq!(out.applied.len(), 2);
        assert_eq!(out.failed, 1);

        let mut down = |_: &Action| -> Result<()> { Err(RosterError::unreachable("chat", "timeout")) };
        assert!(gate.run(&invites(&["A"]), &mut down).is_err());
    }

    #[test]
    fn confirm_each_skips_declined_items() {
        let mut prompt = ScriptedPrompt::new(["n", ""]);
        let mut log = Vec::new();
        let mut gate = Gate::new(GateMode::Interactive, Duration::ZERO, &mut prompt);
        let out = gate
            .confirm_each(&invites(&["A", "B"]), &mut recorder(&mut log))
            .unwrap();
        assert_eq!(log, invites(&["B"]));
        assert_eq!(out.state, GateState::Applied);
        assert_eq!(prompt.asked.len(), 2);
    }

    #[test]
    fn review_defaults_to_no_and_skips_unattended() {
        let mut prompt = ScriptedPrompt::new(["", "y"]);
        let mut log = Vec::new();
        let mut gate = Gate::new(GateMode::Interactive, Duration::ZERO, &mut prompt);
        let out = gate
            .review_each(&invites(&["A", "B"]), &mut recorder(&mut log))
            .unwrap();
        assert_eq!(log, invites(&["B"]));
        assert_eq!(out.state, GateState::Applied);
        assert_eq!(prompt.asked[0], "invite A to #ops? [y/N]");

        let mut quiet = ScriptedPrompt::default();
        let mut log = Vec::new();
        let mut gate = Gate::new(GateMode::Automatic, Duration::ZERO, &mut quiet);
        let out = gate
            .review_each(&invites(&["A"]), &mut recorder(&mut log))
            .unwrap();
        assert!(log.is_empty());
        assert_eq!(out.state, GateState::Planned);
        assert!(quiet.asked.is_empty());
    }
}
