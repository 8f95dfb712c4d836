//! Spoken commands and their vocabularies

use std::fmt;

/// A discrete move requested by voice (or keyboard)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceCommand {
    Run,
    Jump,
    Duck,
}

const RUN_WORDS: &[&str] = &["correr", "corre", "corra", "anda", "andar", "run", "walk"];
const JUMP_WORDS: &[&str] = &[
    "saltar", "salta", "pular", "pula", "salto", "pulo", "jump", "hop",
];
const DUCK_WORDS: &[&str] = &[
    "abaixar", "baixar", "abaixa", "agachar", "abaixo", "baixo", "duck", "crouch",
];

impl VoiceCommand {
    /// Commands in matching priority order
    pub const ALL: [Self; 3] = [Self::Run, Self::Jump, Self::Duck];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Jump => "jump",
            Self::Duck => "duck",
        }
    }

    /// Words that trigger this command
    #[must_use]
    pub const fn vocabulary(self) -> &'static [&'static str] {
        match self {
            Self::Run => RUN_WORDS,
            Self::Jump => JUMP_WORDS,
            Self::Duck => DUCK_WORDS,
        }
    }

    /// Resolve a transcript to a command
    ///
    /// Case-insensitive substring match; Run is checked before Jump, Jump
    /// before Duck.
    #[must_use]
    pub fn from_transcript(transcript: &str) -> Option<Self> {
        let text = transcript.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|command| command.vocabulary().iter().any(|word| text.contains(word)))
    }
}

impl fmt::Display for VoiceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_portuguese_and_english() {
        assert_eq!(VoiceCommand::from_transcript("Pula!"), Some(VoiceCommand::Jump));
        assert_eq!(VoiceCommand::from_transcript("corre"), Some(VoiceCommand::Run));
        assert_eq!(VoiceCommand::from_transcript("ABAIXA"), Some(VoiceCommand::Duck));
        assert_eq!(VoiceCommand::from_transcript("crouch now"), Some(VoiceCommand::Duck));
    }

    #[test]
    fn run_wins_over_later_commands() {
        assert_eq!(
            VoiceCommand::from_transcript("jump and run"),
            Some(VoiceCommand::Run)
        );
    }

    #[test]
    fn unmatched_transcript_is_none() {
        assert_eq!(VoiceCommand::from_transcript("olá mundo"), None);
        assert_eq!(VoiceCommand::from_transcript(""), None);
    }
}
