//! Spoken-response scripts returned to the voice provider

/// One instruction in a voice script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceStep {
    Say(String),
    /// Collect digits and post them to `action`
    Gather { action: String, num_digits: u8 },
    Hangup,
}

/// Ordered list of voice instructions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceScript {
    steps: Vec<VoiceStep>,
}

impl VoiceScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, text: impl Into<String>) -> Self {
        self.steps.push(VoiceStep::Say(text.into()));
        self
    }

    pub fn gather(mut self, action: impl Into<String>, num_digits: u8) -> Self {
        self.steps.push(VoiceStep::Gather {
            action: action.into(),
            num_digits,
        });
        self
    }

    pub fn hangup(mut self) -> Self {
        self.steps.push(VoiceStep::Hangup);
        self
    }

    /// Script used when a callback cannot be matched to a call
    pub fn apology() -> Self {
        Self::new().say("Sorry, something went wrong. Goodbye!").hangup()
    }

    pub fn steps(&self) -> &[VoiceStep] {
        &self.steps
    }

    /// Everything spoken, joined with spaces
    pub fn spoken_text(&self) -> String {
        self.steps
            .iter()
            .filter_map(|step| match step {
                VoiceStep::Say(text) => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn hangs_up(&self) -> bool {
        self.steps.iter().any(|s| matches!(s, VoiceStep::Hangup))
    }

    pub fn gathers(&self) -> bool {
        self.steps.iter().any(|s| matches!(s, VoiceStep::Gather { .. }))
    }
}
