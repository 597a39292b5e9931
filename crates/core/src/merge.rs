//! Household merger and assignment-conflict detection.
//!
//! A household is identified by its name. Repeated rows for the same
//! household either agree on (vehicle, day), in which case their liters are
//! added up, or disagree, in which case the disagreement is reported as an
//! [`AssignmentConflict`] and the [`ConflictPolicy`] picks the survivor.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::point::{Assignment, DeliveryPoint};

/// Which row survives when two rows for one household disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Keep the first row seen; later conflicting rows are discarded.
    #[default]
    FirstWins,
    /// A later conflicting row replaces the earlier one.
    LastWins,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstWins => "first_wins",
            Self::LastWins => "last_wins",
        }
    }

    /// Parse a policy name. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "first_wins" => Some(Self::FirstWins),
            "last_wins" => Some(Self::LastWins),
            _ => None,
        }
    }
}

/// Two rows for the same household with different (vehicle, day).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentConflict {
    pub household: String,
    pub previous: Assignment,
    pub incoming: Assignment,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// One point per household, in first-seen order.
    pub merged: Vec<DeliveryPoint>,
    pub conflicts: Vec<AssignmentConflict>,
    /// Rows folded into an existing household with the same assignment.
    pub combined: usize,
}

/// Key used to recognise the same household across rows.
///
/// Case and runs of whitespace are ignored: `"juan  perez"` and
/// `"Juan Perez"` are one household.
pub fn household_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Merge accepted points by household.
pub fn merge_households(points: Vec<DeliveryPoint>, policy: ConflictPolicy) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for point in points {
        let key = household_key(&point.name);
        let slot = match slots.get(&key).copied() {
            Some(slot) => slot,
            None => {
                slots.insert(key, outcome.merged.len());
                outcome.merged.push(point);
                continue;
            }
        };

        let representative = &mut outcome.merged[slot];
        if representative.vehicle == point.vehicle && representative.day == point.day {
            absorb(representative, point);
            outcome.combined += 1;
            continue;
        }

        let conflict = AssignmentConflict {
            household: representative.name.clone(),
            previous: representative.assignment(),
            incoming: point.assignment(),
        };
        tracing::warn!(
            household = %conflict.household,
            previous_vehicle = %conflict.previous.vehicle,
            previous_day = %conflict.previous.day,
            incoming_vehicle = %conflict.incoming.vehicle,
            incoming_day = %conflict.incoming.day,
            policy = policy.as_str(),
            "Conflicting assignment for household"
        );
        outcome.conflicts.push(conflict);

        if policy == ConflictPolicy::LastWins {
            *representative = point;
        }
    }

    outcome
}

/// Fold a same-assignment row into its household representative.
fn absorb(representative: &mut DeliveryPoint, point: DeliveryPoint) {
    representative.liters = match representative.liters.checked_add(point.liters) {
        Some(total) => total,
        None => {
            tracing::warn!(
                household = %representative.name,
                liters = representative.liters,
                incoming = point.liters,
                cap = i32::MAX,
                "Summed liters overflow; total capped"
            );
            i32::MAX
        }
    };
    if representative.phone.is_none() {
        representative.phone = point.phone;
    }
    if representative.latitude.is_none() && representative.longitude.is_none() {
        representative.latitude = point.latitude;
        representative.longitude = point.longitude;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weekday::Weekday;

    fn point(name: &str, vehicle: &str, day: Weekday, liters: i32) -> DeliveryPoint {
        DeliveryPoint {
            name: name.to_string(),
            vehicle: vehicle.to_string(),
            day,
            liters,
            phone: None,
            latitude: None,
            longitude: None,
        }
    }

    #[test]
    fn distinct_households_pass_through_in_order() {
        let out = merge_households(
            vec![
                point("Ana", "A1", Weekday::Lunes, 10),
                point("Beto", "A2", Weekday::Martes, 20),
            ],
            ConflictPolicy::FirstWins,
        );
        assert_eq!(out.merged.len(), 2);
        assert_eq!(out.merged[0].name, "Ana");
        assert_eq!(out.merged[1].name, "Beto");
        assert!(out.conflicts.is_empty());
        assert_eq!(out.combined, 0);
    }

    #[test]
    fn same_assignment_sums_liters_and_backfills() {
        let mut second = point("ana ", "A1", Weekday::Lunes, 15);
        second.phone = Some("555".to_string());
        second.latitude = Some(-33.0);
        second.longitude = Some(-71.0);

        let out = merge_households(
            vec![point("Ana", "A1", Weekday::Lunes, 10), second],
            ConflictPolicy::FirstWins,
        );
        assert_eq!(out.merged.len(), 1);
        assert_eq!(out.merged[0].name, "Ana");
        assert_eq!(out.merged[0].liters, 25);
        assert_eq!(out.merged[0].phone.as_deref(), Some("555"));
        assert_eq!(out.merged[0].latitude, Some(-33.0));
        assert_eq!(out.combined, 1);
    }

    #[test]
    fn overflowing_liters_are_capped() {
        let out = merge_households(
            vec![
                point("Ana", "A1", Weekday::Lunes, i32::MAX - 5),
                point("Ana", "A1", Weekday::Lunes, 10),
            ],
            ConflictPolicy::FirstWins,
        );
        assert_eq!(out.merged.len(), 1);
        assert_eq!(out.merged[0].liters, i32::MAX);
    }

    #[test]
    fn backfill_never_overwrites_present_fields() {
        let mut first = point("Ana", "A1", Weekday::Lunes, 10);
        first.phone = Some("111".to_string());
        let mut second = point("Ana", "A1", Weekday::Lunes, 5);
        second.phone = Some("222".to_string());

        let out = merge_households(vec![first, second], ConflictPolicy::FirstWins);
        assert_eq!(out.merged[0].phone.as_deref(), Some("111"));
    }

    #[test]
    fn conflicting_assignment_first_wins() {
        let out = merge_households(
            vec![
                point("Ana", "A1", Weekday::Lunes, 10),
                point("ANA", "A2", Weekday::Martes, 99),
            ],
            ConflictPolicy::FirstWins,
        );
        assert_eq!(out.conflicts.len(), 1);
        let conflict = &out.conflicts[0];
        assert_eq!(conflict.household, "Ana");
        assert_eq!(conflict.previous.vehicle, "A1");
        assert_eq!(conflict.previous.day, Weekday::Lunes);
        assert_eq!(conflict.incoming.vehicle, "A2");
        assert_eq!(conflict.incoming.day, Weekday::Martes);

        assert_eq!(out.merged.len(), 1);
        assert_eq!(out.merged[0].vehicle, "A1");
        assert_eq!(out.merged[0].liters, 10);
    }

    #[test]
    fn conflicting_assignment_last_wins() {
        let out = merge_households(
            vec![
                point("Ana", "A1", Weekday::Lunes, 10),
                point("Ana", "A2", Weekday::Martes, 99),
            ],
            ConflictPolicy::LastWins,
        );
        assert_eq!(out.conflicts.len(), 1);
        assert_eq!(out.merged.len(), 1);
        assert_eq!(out.merged[0].vehicle, "A2");
        assert_eq!(out.merged[0].day, Weekday::Martes);
        assert_eq!(out.merged[0].liters, 99);
    }

    #[test]
    fn same_vehicle_different_day_is_a_conflict() {
        let out = merge_households(
            vec![
                point("Ana", "A1", Weekday::Lunes, 10),
                point("Ana", "A1", Weekday::Jueves, 10),
            ],
            ConflictPolicy::FirstWins,
        );
        assert_eq!(out.conflicts.len(), 1);
        assert_eq!(out.combined, 0);
    }

    #[test]
    fn household_key_ignores_case_and_spacing() {
        assert_eq!(household_key("  juan   Pérez "), "JUAN PÉREZ");
        assert_eq!(household_key("Juan Pérez"), household_key("JUAN  PÉREZ"));
    }

    #[test]
    fn policy_names_round_trip() {
        assert_eq!(ConflictPolicy::from_str("LAST_WINS"), Some(ConflictPolicy::LastWins));
        assert_eq!(ConflictPolicy::from_str("first_wins"), Some(ConflictPolicy::FirstWins));
        assert_eq!(ConflictPolicy::from_str("random"), None);
        assert_eq!(ConflictPolicy::default(), ConflictPolicy::FirstWins);
    }
}
