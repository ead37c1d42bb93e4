use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

macro_rules! row_id {
    ($($(#[$meta:meta])* $name:ident;)+) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&$name> for Value {
            fn from(id: &$name) -> Self {
                Value::String(id.0.clone())
            }
        }
    )+};
}

row_id! {
    /// Identity row shared by every role.
    UserId;
    StudentId;
    LandlordId;
    PropertyId;
    BookingId;
    ReviewId;
    FavoriteId;
    UniversityId;
    AmenityId;
}
