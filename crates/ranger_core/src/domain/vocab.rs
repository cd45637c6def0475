use std::fmt;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A closed, ordered set of values (kinds, severities, statuses) with a stable wire name.
///
/// Declaration order is meaningful: severities run low to critical and statuses run in workflow
/// order, which is what `Ord` and `ALL` expose.
pub trait Vocabulary:
    Copy + Eq + Ord + Hash + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + 'static
{
    const ALL: &'static [Self];

    fn as_str(self) -> &'static str;

    /// Lenient lookup for console input: wire name, variant name (both case-insensitive) or the
    /// Spanish label used by the field forms.
    fn parse(raw: &str) -> Option<Self>;
}

/// Severity scales share the notion of "high" (the upper two levels) and "critical" (the top).
pub trait SeverityScale: Vocabulary {
    fn is_high(self) -> bool {
        let rank = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        rank + 2 >= Self::ALL.len()
    }

    fn is_critical(self) -> bool {
        Self::ALL.last() == Some(&self)
    }
}

macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $variant:ident = $wire:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub enum $name {
            $(
                #[serde(rename = $wire $(, alias = $alias)*)]
                $variant,
            )+
        }

        impl $crate::domain::vocab::Vocabulary for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            fn parse(raw: &str) -> Option<Self> {
                let raw = raw.trim();
                $(
                    if raw.eq_ignore_ascii_case($wire)
                        || raw.eq_ignore_ascii_case(stringify!($variant))
                        $(|| raw.to_lowercase() == $alias.to_lowercase())*
                    {
                        return Some($name::$variant);
                    }
                )+
                None
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::domain::vocab::Vocabulary::as_str(*self))
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$name as $crate::domain::vocab::Vocabulary>::parse(s).ok_or_else(|| {
                    $crate::error::AppError::new(
                        $crate::error::VALIDATION_FAILED,
                        concat!("Unknown ", stringify!($name)),
                    )
                    .with_details(format!("value={s}"))
                })
            }
        }
    };
}

pub(crate) use vocabulary;
