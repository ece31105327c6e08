//! Reply planning for matched triggers
//!
//! A matched rule turns into a [`ReplyPlan`]: the ordered messages to send,
//! each preceded by a short pause so Shibako looks like she is thinking. The
//! rude policy can replace the standard response with an optional prefix and
//! a templated message addressed to whoever triggered it.

use std::time::Duration;

use rand::Rng;

use crate::config::{RudePolicy, SENDER_PLACEHOLDER, TriggerRule};

/// Pause before every outgoing step.
pub const PACING_DELAY: Duration = Duration::from_secs(1);

/// Source of uniform draws in `[0, 1)` for the rude roll.
pub trait Draw {
    fn draw(&mut self) -> f64;
}

impl<R: Rng + ?Sized> Draw for R {
    fn draw(&mut self) -> f64 {
        self.random::<f64>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyStep {
    pub text: String,
    pub delay: Duration,
}

impl ReplyStep {
    pub fn paced(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            delay: PACING_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Standard,
    Rude,
}

/// Ordered steps for one trigger activation. Built per message and consumed
/// immediately by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPlan {
    pub kind: ReplyKind,
    pub steps: Vec<ReplyStep>,
}

impl ReplyPlan {
    pub fn standard(rule: &TriggerRule) -> Self {
        Self {
            kind: ReplyKind::Standard,
            steps: vec![ReplyStep::paced(rule.response.as_str())],
        }
    }

    pub fn is_rude(&self) -> bool {
        self.kind == ReplyKind::Rude
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Decide how to answer `rule`.
///
/// `mention` is the invoker already formatted for the chat platform. A draw is
/// only taken when the rule and policy are both eligible, and the rude branch
/// fires when the draw is strictly below `policy.chance`.
pub fn select<D: Draw + ?Sized>(
    rule: &TriggerRule,
    policy: &RudePolicy,
    mention: &str,
    rng: &mut D,
) -> ReplyPlan {
    if !rule.allow_rude || !policy.is_armed() {
        return ReplyPlan::standard(rule);
    }

    let roll = rng.draw();
    if roll >= policy.chance {
        return ReplyPlan::standard(rule);
    }

    let mut steps = Vec::with_capacity(2);
    if !policy.prefix.is_empty() {
        steps.push(ReplyStep::paced(policy.prefix.as_str()));
    }
    steps.push(ReplyStep::paced(
        policy.message.replace(SENDER_PLACEHOLDER, mention),
    ));

    ReplyPlan {
        kind: ReplyKind::Rude,
        steps,
    }
}
