//! The narrative sequencer.
//!
//! A script is an ordered list of messages, each with a delay and optional
//! side effects. The countdown to the next message runs only while the
//! previous one has been acknowledged, so an unread message holds the whole
//! script. Side effects are typed actions the session interprets; the
//! sequencer itself never touches the rest of the game.

use serde::{Deserialize, Serialize};
use sim_core::{EventBus, GameEvent, ScriptId, Speaker};
use tracing::debug;

/// Side effects a message can request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeAction {
    /// Unlock the trading controls.
    RevealTradingUi,
    /// Release the game clock from its pre-start gate.
    StartClock,
    /// Show the final scoreboard.
    RevealScoreboard,
    /// Load another script from the top.
    SwitchScript(ScriptId),
}

/// One line of script.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NarrativeMessage {
    /// Who says it.
    pub speaker: Speaker,
    /// The line itself.
    pub text: String,
    /// Seconds of acknowledged time before it shows; 0 chains it straight
    /// after the previous acknowledgment.
    pub delay_seconds: f64,
    /// Actions fired the moment the message shows.
    #[serde(default)]
    pub on_shown: Vec<NarrativeAction>,
    /// Actions fired when the player acknowledges it.
    #[serde(default)]
    pub on_acknowledged: Vec<NarrativeAction>,
}

impl NarrativeMessage {
    /// A plain line with no attached actions.
    pub fn line(speaker: Speaker, delay_seconds: f64, text: &str) -> Self {
        NarrativeMessage {
            speaker,
            text: text.to_string(),
            delay_seconds,
            on_shown: Vec::new(),
            on_acknowledged: Vec::new(),
        }
    }

    /// Attach actions fired when the message shows.
    pub fn with_on_shown(mut self, actions: Vec<NarrativeAction>) -> Self {
        self.on_shown = actions;
        self
    }

    /// Attach actions fired when the message is acknowledged.
    pub fn with_on_acknowledged(mut self, actions: Vec<NarrativeAction>) -> Self {
        self.on_acknowledged = actions;
        self
    }
}

/// Plays one script at a time: countdown, display, acknowledgment, repeat.
///
/// Past the last message the countdown is [`f64::INFINITY`], so the
/// sequencer idles until a script switch.
#[derive(Clone, Debug)]
pub struct NarrativeSequencer {
    script: ScriptId,
    messages: Vec<NarrativeMessage>,
    next_index: usize,
    countdown: f64,
    awaiting_acknowledgment: bool,
}

impl NarrativeSequencer {
    /// Sequencer armed at the top of `messages`.
    pub fn new(script: ScriptId, messages: Vec<NarrativeMessage>) -> Self {
        let countdown = messages
            .first()
            .map(|m| m.delay_seconds)
            .unwrap_or(f64::INFINITY);
        NarrativeSequencer {
            script,
            messages,
            next_index: 0,
            countdown,
            awaiting_acknowledgment: false,
        }
    }

    /// The loaded script.
    pub fn script(&self) -> ScriptId {
        self.script
    }

    /// The message currently on screen, with its index.
    pub fn current(&self) -> Option<(usize, &NarrativeMessage)> {
        if !self.awaiting_acknowledgment {
            return None;
        }
        let index = self.next_index.checked_sub(1)?;
        self.messages.get(index).map(|m| (index, m))
    }

    /// Whether every message has been shown and acknowledged.
    pub fn is_exhausted(&self) -> bool {
        self.next_index >= self.messages.len() && !self.awaiting_acknowledgment
    }

    /// Advance acknowledged time by `delta`. At most one message shows per
    /// call; its `on_shown` actions are returned for the caller to run.
    pub fn update(&mut self, delta: f64, events: &mut EventBus) -> Vec<NarrativeAction> {
        if self.awaiting_acknowledgment || !delta.is_finite() || delta < 0.0 {
            return Vec::new();
        }
        if self.next_index >= self.messages.len() {
            return Vec::new();
        }
        self.countdown -= delta;
        if self.countdown > 0.0 {
            return Vec::new();
        }
        let index = self.next_index;
        let (speaker, text, actions) = {
            let message = &self.messages[index];
            (
                message.speaker,
                message.text.clone(),
                message.on_shown.clone(),
            )
        };
        self.awaiting_acknowledgment = true;
        self.next_index += 1;
        self.countdown = self
            .messages
            .get(self.next_index)
            .map(|m| m.delay_seconds)
            .unwrap_or(f64::INFINITY);
        debug!(index, script = ?self.script, "narrative message shown");
        events.push(GameEvent::MessageShown {
            index,
            speaker,
            text,
        });
        actions
    }

    /// Dismiss the on-screen message, resuming the countdown. Returns its
    /// `on_acknowledged` actions; a stray acknowledgment is a no-op.
    pub fn acknowledge(&mut self, events: &mut EventBus) -> Vec<NarrativeAction> {
        if !self.awaiting_acknowledgment {
            return Vec::new();
        }
        self.awaiting_acknowledgment = false;
        let index = self.next_index.saturating_sub(1);
        debug!(index, script = ?self.script, "narrative message acknowledged");
        events.push(GameEvent::MessageAcknowledged { index });
        self.messages
            .get(index)
            .map(|m| m.on_acknowledged.clone())
            .unwrap_or_default()
    }

    /// Drop the current script and load `messages` from the top. The index
    /// rewinds to before the first message, its delay is armed, and the
    /// nonexistent previous message counts as acknowledged.
    pub fn switch_script(
        &mut self,
        script: ScriptId,
        messages: Vec<NarrativeMessage>,
        events: &mut EventBus,
    ) {
        debug!(?script, messages = messages.len(), "switching narrative script");
        self.script = script;
        self.countdown = messages
            .first()
            .map(|m| m.delay_seconds)
            .unwrap_or(f64::INFINITY);
        self.messages = messages;
        self.next_index = 0;
        self.awaiting_acknowledgment = false;
        events.push(GameEvent::ScriptStarted { script });
    }
}

/// Built-in scripts.
pub mod scripts {
    use super::{NarrativeAction, NarrativeMessage};
    use sim_core::{ActorId, Scoreboard, ScriptId, Speaker};

    /// The granny tutorial. Reveals the trading controls partway through
    /// and starts the clock once the last line is acknowledged.
    pub fn intro() -> Vec<NarrativeMessage> {
        vec![
            NarrativeMessage::line(
                Speaker::Granny,
                1.5,
                "Sit down, dear. Granny will teach you how the market works.",
            ),
            NarrativeMessage::line(
                Speaker::Granny,
                0.0,
                "Five things are for sale: apples, potatoes, fish, snowballs, \
                 and the whole wide world.",
            ),
            NarrativeMessage::line(
                Speaker::Granny,
                1.0,
                "Pick one, choose how much to spend, and press buy. \
                 Selling works the same way.",
            )
            .with_on_shown(vec![NarrativeAction::RevealTradingUi]),
            NarrativeMessage::line(
                Speaker::Granny,
                0.5,
                "A salary lands every few weeks. The monkey and the rock get one too.",
            ),
            NarrativeMessage::line(
                Speaker::Granny,
                0.0,
                "Finish richer than both of them by the time you are eighty. Off you go.",
            )
            .with_on_acknowledged(vec![NarrativeAction::StartClock]),
        ]
    }

    /// The wrap-up. Reveals the scoreboard and reads out the standings.
    pub fn ending(scores: &Scoreboard) -> Vec<NarrativeMessage> {
        let standings = format!(
            "You ended with ${:.0}. The monkey threw darts for ${:.0}. \
             The rock sat still for ${:.0}.",
            scores.player, scores.monkey, scores.rock
        );
        let closing = match scores.leader() {
            ActorId::Player => "Well done, dear. Granny always knew you had it in you.",
            ActorId::Monkey => "Beaten by a monkey. Granny suggests we keep that between us.",
            ActorId::Rock => "The rock wins by sitting still. Let that sink in, dear.",
        };
        vec![
            NarrativeMessage::line(
                Speaker::Granny,
                1.0,
                "Eighty years old already. Put the mouse down, dear.",
            )
            .with_on_shown(vec![NarrativeAction::RevealScoreboard]),
            NarrativeMessage::line(Speaker::Granny, 0.0, &standings),
            NarrativeMessage::line(Speaker::Monkey, 1.5, "Ook."),
            NarrativeMessage::line(Speaker::Granny, 0.0, closing),
        ]
    }

    /// Default messages for `id`, given the final scores.
    pub fn for_id(id: ScriptId, scores: &Scoreboard) -> Vec<NarrativeMessage> {
        match id {
            ScriptId::Intro => intro(),
            ScriptId::Ending => ending(scores),
        }
    }
}
