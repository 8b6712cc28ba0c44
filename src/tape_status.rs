use serde::{Serialize, Serializer};

use crate::entities::tape;

/// Status shown for a tape, derived from its raw flags.
///
/// The first matching flag wins: streaming, then digitized. Everything else,
/// including tapes blocked from upload, falls into [`TapeStatus::NotOnStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TapeStatus {
    OnStream,
    Digitized,
    NotOnStream,
}

/// The three independent flags stored on a tape. `None` is a legacy null.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TapeFlags {
    pub uploaded_to_streaming: Option<bool>,
    pub blocked_from_upload: Option<bool>,
    pub digitized: Option<bool>,
}

impl TapeFlags {
    pub fn of(tape: &tape::Model) -> Self {
        Self {
            uploaded_to_streaming: tape.uploaded_to_streaming,
            blocked_from_upload: tape.blocked_from_upload,
            digitized: tape.digitized,
        }
    }
}

impl TapeStatus {
    pub fn from_flags(flags: TapeFlags) -> Self {
        if flags.uploaded_to_streaming == Some(true) {
            return Self::OnStream;
        }
        if flags.digitized == Some(true) {
            return Self::Digitized;
        }
        Self::NotOnStream
    }

    pub fn of(tape: &tape::Model) -> Self {
        Self::from_flags(TapeFlags::of(tape))
    }

    /// Wire label, also used for JSON serialization.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnStream => "on_stream",
            Self::Digitized => "digitalizada",
            Self::NotOnStream => "not_stream",
        }
    }
}

impl Serialize for TapeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
