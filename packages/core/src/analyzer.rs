//! Interval-conflict analysis over a normalized event stream.
//!
//! Events are grouped per student group and calendar day, ordered by start
//! time, and every pair of neighbouring classes is checked for an idle window
//! that is too long and for a room change with too little travel time.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{ConflictIssue, IssueCategory, NormalizedEvent};

/// Thresholds used by [`ConflictAnalyzer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Gaps strictly longer than this are reported as [`IssueCategory::LongGap`].
    pub max_gap_secs: i64,
    /// Room changes with a gap strictly shorter than this are impossible.
    pub min_travel_secs: i64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_gap_secs: 2 * 60 * 60,
            min_travel_secs: 10 * 60,
        }
    }
}

impl AnalyzerConfig {
    pub fn max_gap(&self) -> TimeDelta {
        TimeDelta::seconds(self.max_gap_secs)
    }

    pub fn min_travel(&self) -> TimeDelta {
        TimeDelta::seconds(self.min_travel_secs)
    }
}

/// Pure detector of long gaps and impossible room transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictAnalyzer {
    config: AnalyzerConfig,
}

impl ConflictAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Find all issues in `events`, stamping them with `detected_at`.
    ///
    /// Issues come out group by group and, within a group, day by day, both
    /// in first-seen order. Within a day they follow start order. Overlapping classes in the same room are not reported.
    pub fn analyze(
        &self,
        events: &[NormalizedEvent],
        detected_at: DateTime<Utc>,
    ) -> Vec<ConflictIssue> {
        let max_gap = self.config.max_gap();
        let min_travel = self.config.min_travel();
        let mut issues = Vec::new();

        for mut day in partition(events) {
            if day.len() < 2 {
                continue;
            }
            // Stable: classes starting together keep their feed order.
            day.sort_by_key(|e| e.start);

            for pair in day.windows(2) {
                let (first, second) = (pair[0], pair[1]);
                let gap = second.start - first.end;

                if gap > max_gap {
                    issues.push(issue(
                        IssueCategory::LongGap,
                        first,
                        second,
                        format!("Gap between classes: {}", format_gap(gap)),
                        detected_at,
                    ));
                }

                if first.location != second.location && gap < min_travel {
                    issues.push(issue(
                        IssueCategory::ImpossibleTransition,
                        first,
                        second,
                        format!(
                            "Cannot get from {} to {} in {}.",
                            first.location,
                            second.location,
                            format_gap(gap)
                        ),
                        detected_at,
                    ));
                }
            }
        }

        issues
    }
}

/// Split events into `(group, day)` buckets.
///
/// Groups come in first-seen order, and all days of a group come before the
/// next group, each in first-seen order.
fn partition(events: &[NormalizedEvent]) -> Vec<Vec<&NormalizedEvent>> {
    let mut group_slots: HashMap<&str, usize> = HashMap::new();
    let mut day_slots: HashMap<(&str, NaiveDate), usize> = HashMap::new();
    let mut groups: Vec<Vec<Vec<&NormalizedEvent>>> = Vec::new();

    for event in events {
        let group = event.group.as_str();
        let g = *group_slots.entry(group).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        let days = &mut groups[g];
        let d = *day_slots.entry((group, event.day())).or_insert_with(|| {
            days.push(Vec::new());
            days.len() - 1
        });
        days[d].push(event);
    }

    groups.into_iter().flatten().collect()
}

fn issue(
    category: IssueCategory,
    first: &NormalizedEvent,
    second: &NormalizedEvent,
    description: String,
    detected_at: DateTime<Utc>,
) -> ConflictIssue {
    ConflictIssue {
        category,
        first_event: first.clone(),
        second_event: second.clone(),
        description,
        detected_at,
        last_updated: detected_at,
    }
}

/// Render a duration as `H:MM:SS`, prefixed with `-` when negative.
pub fn format_gap(gap: TimeDelta) -> String {
    let sign = if gap < TimeDelta::zero() { "-" } else { "" };
    let total = gap.num_seconds().abs();
    format!(
        "{}{}:{:02}:{:02}",
        sign,
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use super::*;
    use chrono::{Datelike, FixedOffset, TimeZone};

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, day, hour, minute, 0)
            .unwrap()
    }

    fn event(
        group: &str,
        day: u32,
        start: (u32, u32),
        end: (u32, u32),
        location: &str,
    ) -> NormalizedEvent {
        NormalizedEvent {
            summary: format!("{group} {}:{:02}", start.0, start.1),
            start: at(day, start.0, start.1),
            end: at(day, end.0, end.1),
            location: location.into(),
            teacher: "Ivanov I.I.".into(),
            group: group.into(),
            discipline: "Algebra".into(),
        }
    }

    fn analyze(events: &[NormalizedEvent]) -> Vec<ConflictIssue> {
        ConflictAnalyzer::default().analyze(events, Utc::now())
    }

    #[test]
    fn long_gap_same_room() {
        let a = event("G1", 3, (9, 0), (10, 30), "Room1");
        let b = event("G1", 3, (13, 0), (14, 30), "Room1");

        let issues = analyze(&[a.clone(), b.clone()]);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].category, IssueCategory::LongGap);
        assert_eq!(issues[0].first_event, a);
        assert_eq!(issues[0].second_event, b);
        assert!(issues[0].description.contains("2:30:00"));
    }

    #[test]
    fn impossible_transition_between_rooms() {
        let a = event("G1", 3, (9, 0), (10, 0), "Room1");
        let b = event("G1", 3, (10, 5), (11, 0), "Room2");

        let issues = analyze(&[a, b]);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].category, IssueCategory::ImpossibleTransition);
        assert!(issues[0].description.contains("Room1"));
        assert!(issues[0].description.contains("Room2"));
        assert!(issues[0].description.contains("0:05:00"));
    }

    #[test]
    fn gap_of_exactly_two_hours_is_not_long() {
        let a = event("G1", 3, (9, 0), (10, 0), "Room1");
        let b = event("G1", 3, (12, 0), (13, 0), "Room1");
        assert!(analyze(&[a, b]).is_empty());
    }

    #[test]
    fn gap_of_exactly_ten_minutes_is_reachable() {
        let a = event("G1", 3, (9, 0), (10, 0), "Room1");
        let b = event("G1", 3, (10, 10), (11, 0), "Room2");
        assert!(analyze(&[a, b]).is_empty());
    }

    #[test]
    fn overlap_in_different_rooms_is_impossible_transition() {
        let a = event("G1", 3, (9, 0), (10, 30), "Room1");
        let b = event("G1", 3, (10, 0), (11, 0), "Room2");

        let issues = analyze(&[a, b]);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].category, IssueCategory::ImpossibleTransition);
        assert!(issues[0].description.contains("-0:30:00"));
    }

    #[test]
    fn overlap_in_same_room_is_silent() {
        let a = event("G1", 3, (9, 0), (10, 30), "Room1");
        let b = event("G1", 3, (10, 0), (11, 0), "Room1");
        assert!(analyze(&[a, b]).is_empty());
    }

    #[test]
    fn long_gap_and_transition_can_fire_together() {
        let config = AnalyzerConfig {
            max_gap_secs: 60,
            min_travel_secs: 600,
        };
        let a = event("G1", 3, (9, 0), (10, 0), "Room1");
        let b = event("G1", 3, (10, 5), (11, 0), "Room2");

        let issues = ConflictAnalyzer::new(config).analyze(&[a, b], Utc::now());

        let categories: Vec<_> = issues.iter().map(|i| i.category).collect();
        assert_eq!(
            categories,
            vec![IssueCategory::LongGap, IssueCategory::ImpossibleTransition]
        );
    }

    #[test]
    fn input_order_does_not_matter() {
        let a = event("G1", 3, (9, 0), (10, 30), "Room1");
        let b = event("G1", 3, (13, 0), (14, 30), "Room1");

        let issues = analyze(&[b, a.clone()]);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].first_event, a);
    }

    #[test]
    fn issues_never_cross_groups_or_days() {
        let events = vec![
            event("G1", 3, (9, 0), (10, 0), "Room1"),
            event("G2", 3, (10, 5), (11, 0), "Room2"),
            event("G1", 4, (13, 0), (14, 0), "Room1"),
            event("G2", 4, (8, 0), (9, 0), "Room3"),
        ];

        assert!(analyze(&events).is_empty());
    }

    #[test]
    fn every_event_lands_in_exactly_one_partition() {
        let events = vec![
            event("G1", 3, (9, 0), (10, 0), "Room1"),
            event("G2", 3, (9, 0), (10, 0), "Room1"),
            event("G1", 3, (11, 0), (12, 0), "Room1"),
            event("G1", 4, (9, 0), (10, 0), "Room1"),
        ];

        let buckets = partition(&events);

        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets.iter().map(Vec::len).sum::<usize>(), events.len());
        for bucket in &buckets {
            let (group, day) = (&bucket[0].group, bucket[0].day());
            assert!(bucket.iter().all(|e| &e.group == group && e.day() == day));
        }
    }

    #[test]
    fn issues_follow_partition_discovery_order() {
        let events = vec![
            event("G2", 3, (9, 0), (10, 0), "Room1"),
            event("G1", 3, (9, 0), (10, 0), "Room1"),
            event("G1", 3, (13, 0), (14, 0), "Room1"),
            event("G2", 3, (13, 0), (14, 0), "Room1"),
        ];

        let issues = analyze(&events);

        let groups: Vec<_> = issues.iter().map(|i| i.first_event.group.as_str()).collect();
        assert_eq!(groups, vec!["G2", "G1"]);
    }

    #[test]
    fn all_days_of_a_group_come_before_the_next_group() {
        let events = vec![
            event("G1", 3, (8, 0), (9, 0), "Room1"),
            event("G2", 3, (8, 0), (9, 0), "Room1"),
            event("G1", 4, (8, 0), (9, 0), "Room1"),
            event("G1", 3, (12, 0), (13, 0), "Room1"),
            event("G2", 3, (12, 0), (13, 0), "Room1"),
            event("G1", 4, (12, 0), (13, 0), "Room1"),
        ];

        let issues = analyze(&events);

        let order: Vec<_> = issues
            .iter()
            .map(|i| (i.first_event.group.as_str(), i.first_event.day().day()))
            .collect();
        assert_eq!(order, vec![("G1", 3), ("G1", 4), ("G2", 3)]);
    }

    #[test]
    fn single_event_partitions_produce_nothing() {
        assert!(analyze(&[event("G1", 3, (9, 0), (10, 0), "Room1")]).is_empty());
        assert!(analyze(&[]).is_empty());
    }

    #[test]
    fn issues_are_stamped_with_detection_time() {
        let now = Utc::now();
        let a = event("G1", 3, (9, 0), (10, 30), "Room1");
        let b = event("G1", 3, (13, 0), (14, 30), "Room1");

        let issues = ConflictAnalyzer::default().analyze(&[a, b], now);

        assert_eq!(issues[0].detected_at, now);
        assert_eq!(issues[0].last_updated, now);
    }

    #[test]
    fn format_gap_renders_hours_minutes_seconds() {
        assert_eq!(format_gap(TimeDelta::minutes(150)), "2:30:00");
        assert_eq!(format_gap(TimeDelta::seconds(65)), "0:01:05");
        assert_eq!(format_gap(TimeDelta::minutes(-5)), "-0:05:00");
    }
}
