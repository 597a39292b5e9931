//! Delivery weekdays and tolerant parsing of day tokens.

use serde::{Deserialize, Serialize};

use crate::normalize::strip_diacritics;

/// Day of the week a household is served on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Weekday {
    Lunes,
    Martes,
    Miercoles,
    Jueves,
    Viernes,
    Sabado,
    Domingo,
}

impl Weekday {
    pub const ALL: &'static [Weekday] = &[
        Self::Lunes,
        Self::Martes,
        Self::Miercoles,
        Self::Jueves,
        Self::Viernes,
        Self::Sabado,
        Self::Domingo,
    ];

    /// Canonical stored spelling (uppercase, no accents).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lunes => "LUNES",
            Self::Martes => "MARTES",
            Self::Miercoles => "MIERCOLES",
            Self::Jueves => "JUEVES",
            Self::Viernes => "VIERNES",
            Self::Sabado => "SABADO",
            Self::Domingo => "DOMINGO",
        }
    }

    /// Parse a free-form day token.
    ///
    /// Case and accents are ignored. The full name is tried first, then the
    /// first three letters (`"mié"` -> `Miercoles`, `"Sab."` -> `Sabado`).
    /// The token must be a single word, so cells naming several days
    /// (`"MARTES Y JUEVES"`, `"Lunes-Miércoles"`) are rejected.
    pub fn parse(token: &str) -> Option<Self> {
        let folded = strip_diacritics(token.trim()).to_uppercase();
        let mut words = folded
            .split(|c: char| !c.is_alphabetic())
            .filter(|w| !w.is_empty());
        let letters = words.next()?;
        if words.next().is_some() {
            return None;
        }

        if let Some(day) = Self::ALL.iter().find(|d| d.as_str() == letters) {
            return Some(*day);
        }

        let prefix: String = letters.chars().take(3).collect();
        if prefix.chars().count() < 3 {
            return None;
        }
        Self::ALL
            .iter()
            .find(|d| d.as_str().starts_with(&prefix))
            .copied()
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
