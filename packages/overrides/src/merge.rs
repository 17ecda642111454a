//! Joins persisted overrides onto normalized records.

use std::collections::BTreeMap;

use damage_map_photo_models::{PhotoRecord, Priority, normalize_key};

use crate::StoredOverride;

/// Builds the override lookup from stored rows.
///
/// Keys are canonicalized with [`normalize_key`]. Rows whose priority is
/// not exactly `high`, `medium` or `low` are skipped with a warning. When
/// several rows share a key, the last one wins.
#[must_use]
pub fn collect_overrides(rows: &[StoredOverride]) -> BTreeMap<String, Priority> {
    let mut map = BTreeMap::new();

    for row in rows {
        match stored_priority(&row.priority) {
            Some(priority) => {
                map.insert(normalize_key(&row.photo_id), priority);
            }
            None => {
                log::warn!(
                    "Skipping override for photo {} with invalid priority {:?}",
                    row.photo_id,
                    row.priority
                );
            }
        }
    }

    map
}

fn stored_priority(text: &str) -> Option<Priority> {
    Priority::all()
        .iter()
        .copied()
        .find(|priority| priority.as_ref() == text)
}

/// Overwrites each record's priority where an override exists.
///
/// Overrides win unconditionally over the upstream priority. Applying the
/// same map twice is a no-op the second time. Returns the number of
/// records that received an override.
pub fn apply_overrides(
    records: &mut [PhotoRecord],
    overrides: &BTreeMap<String, Priority>,
) -> usize {
    if overrides.is_empty() {
        return 0;
    }

    let mut applied = 0;
    for record in records.iter_mut() {
        if let Some(priority) = overrides.get(&normalize_key(&record.id)) {
            record.priority = Some(*priority);
            applied += 1;
        }
    }

    log::debug!("Applied {applied} priority overrides");
    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, priority: Option<Priority>) -> PhotoRecord {
        PhotoRecord {
            id: id.to_string(),
            image_url: String::new(),
            latitude: 40.7,
            longitude: -74.0,
            altitude: None,
            direction: None,
            timestamp: "2024-10-01T12:00:00.000Z".to_string(),
            description: String::new(),
            submitter: String::new(),
            priority,
            tags: Vec::new(),
        }
    }

    fn row(photo_id: &str, priority: &str) -> StoredOverride {
        StoredOverride {
            photo_id: photo_id.to_string(),
            user_id: "u1".to_string(),
            priority: priority.to_string(),
        }
    }

    #[test]
    fn override_beats_upstream() {
        let mut records = vec![record("a", Some(Priority::High))];
        let overrides = collect_overrides(&[row("a", "low")]);

        assert_eq!(apply_overrides(&mut records, &overrides), 1);
        assert_eq!(records[0].priority, Some(Priority::Low));
    }

    #[test]
    fn apply_is_idempotent() {
        let mut records = vec![
            record("a", Some(Priority::High)),
            record("42", None),
            record("b", Some(Priority::Medium)),
        ];
        let overrides = collect_overrides(&[row("a", "low"), row("42.0", "high")]);

        apply_overrides(&mut records, &overrides);
        let once = records.clone();
        apply_overrides(&mut records, &overrides);
        assert_eq!(records, once);
        assert_eq!(records[1].priority, Some(Priority::High));
        assert_eq!(records[2].priority, Some(Priority::Medium));
    }

    #[test]
    fn keys_match_across_representations() {
        let mut records = vec![record("42", None), record(" 7 ", None)];
        let overrides = collect_overrides(&[row("42.0", "medium"), row("7", "low")]);

        assert_eq!(apply_overrides(&mut records, &overrides), 2);
        assert_eq!(records[0].priority, Some(Priority::Medium));
        assert_eq!(records[1].priority, Some(Priority::Low));
    }

    #[test]
    fn invalid_priorities_are_skipped() {
        let overrides = collect_overrides(&[
            row("a", "urgent"),
            row("b", "high"),
            row("c", ""),
            row("d", "HIGH"),
            row("e", " low"),
        ]);
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides.get("b"), Some(&Priority::High));
    }

    #[test]
    fn no_overrides_leaves_records_alone() {
        let mut records = vec![record("a", Some(Priority::High))];
        assert_eq!(apply_overrides(&mut records, &BTreeMap::new()), 0);
        assert_eq!(records[0].priority, Some(Priority::High));
    }
}
