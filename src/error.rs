use thiserror::Error;

/// Failures the control core distinguishes. Out-of-range browsing is not an
/// error; it is clamped where it happens.
#[derive(Debug, Error)]
pub enum ControlError {
    /// A menu node was reached that has no children, no items and no action.
    #[error("menu node '{0}' has nothing to show or do")]
    Configuration(String),

    #[error("button on pin {pin} names partner pin {partner}, which is not configured")]
    MissingPartner { pin: u8, partner: u8 },

    #[error("unknown action label '{0}'")]
    UnknownAction(String),

    #[error("pedal '{pedal}' command '{command}': {reason}")]
    InvalidCommand {
        pedal: String,
        command: String,
        reason: String,
    },

    #[error("setlist '{0}' has no songs, or a song with no parts")]
    EmptySetlist(String),

    #[error("persistence failure: {0:#}")]
    Persistence(anyhow::Error),
}
