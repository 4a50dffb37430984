use thiserror::Error;

/// Failures surfaced by a [`crate::ports::SelectionHost`] implementation.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("selection ownership claim rejected by the display")]
    ClaimRejected,

    #[error("failed to send client event: {0}")]
    SendFailed(String),

    #[error("selection protocol error: {0}")]
    Protocol(String),
}

/// Outcome of a failed manager-selection acquisition.
///
/// `AlreadyManaged` and `LostRace` are expected races, not faults; only
/// `ClaimRejected` aborts startup of the clipboard subsystem.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("selection {0} already has an owner")]
    AlreadyManaged(String),

    #[error("unable to acquire selection {0}")]
    ClaimRejected(String),

    #[error("lost the acquisition race for selection {0}")]
    LostRace(String),
}

/// Failures surfaced by a [`crate::ports::KeyboardDevice`] implementation.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("keyboard extension unavailable")]
    ExtensionUnavailable,

    #[error("keyboard protocol error: {0}")]
    Protocol(String),
}
