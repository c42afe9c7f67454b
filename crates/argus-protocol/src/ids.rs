use std::fmt;

use serde::{Deserialize, Serialize};

/// Entity IDs are short opaque strings minted by whichever side creates the
/// record (the console for optimistic commands, the fleet side for everything
/// else). They are stable for the lifetime of the record.
macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifies a robot across its whole lifecycle.
    RobotId
);
string_id!(
    /// Identifies one outgoing or inbound command record.
    CommandId
);
string_id!(
    /// Identifies a mission.
    MissionId
);
string_id!(
    /// Identifies an AI or heuristic suggestion.
    SuggestionId
);
