use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::error;

use crate::domain::ticket::{Priority, Ticket};
use crate::error::AppResult;
use crate::services::TicketStore;

pub const RECENT_LIMIT: usize = 5;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityCounts {
    pub fn get(&self, priority: Priority) -> usize {
        match priority {
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }

    fn record(&mut self, priority: Priority) {
        match priority {
            Priority::High => self.high += 1,
            Priority::Medium => self.medium += 1,
            Priority::Low => self.low += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelinePoint {
    pub date: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSummary {
    pub total: usize,
    pub open: usize,
    pub resolved: usize,
    pub priorities: PriorityCounts,
    /// Ticket counts per creation day, in the order days are first seen.
    pub timeline: Vec<TimelinePoint>,
    pub recent: Vec<Ticket>,
}

impl DashboardSummary {
    pub fn from_tickets(tickets: &[Ticket]) -> Self {
        let resolved = tickets
            .iter()
            .filter(|ticket| ticket.status.is_resolved())
            .count();

        let mut priorities = PriorityCounts::default();
        let mut timeline: Vec<TimelinePoint> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for ticket in tickets {
            priorities.record(ticket.priority);

            let date = date_portion(&ticket.creation_date);
            match positions.get(date) {
                Some(&at) => timeline[at].count += 1,
                None => {
                    positions.insert(date, timeline.len());
                    timeline.push(TimelinePoint {
                        date: date.to_string(),
                        count: 1,
                    });
                }
            }
        }

        Self {
            total: tickets.len(),
            open: tickets.len() - resolved,
            resolved,
            priorities,
            timeline,
            recent: most_recent(tickets, RECENT_LIMIT),
        }
    }

    pub fn timeline_by_date(&self) -> Vec<TimelinePoint> {
        let mut points = self.timeline.clone();
        points.sort_by(|a, b| a.date.cmp(&b.date));
        points
    }
}

pub struct DashboardView {
    store: Arc<dyn TicketStore>,
}

impl DashboardView {
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> AppResult<DashboardSummary> {
        match self.store.read_all().await {
            Ok(tickets) => Ok(DashboardSummary::from_tickets(&tickets)),
            Err(err) => {
                error!(error = %err, "failed to load tickets for dashboard");
                Err(err)
            }
        }
    }
}

/// Text before the first `T` or space separating date from time.
pub fn date_portion(creation_date: &str) -> &str {
    creation_date
        .split_once(['T', ' '])
        .map_or(creation_date, |(date, _)| date)
}

/// Parses the date formats the add form produces or accepts. Offsets are
/// normalized to UTC; naive values are taken as-is.
pub fn parse_creation_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Newest first. Equal dates keep input order; unparseable dates go last.
fn most_recent(tickets: &[Ticket], limit: usize) -> Vec<Ticket> {
    let mut dated: Vec<(Option<NaiveDateTime>, &Ticket)> = tickets
        .iter()
        .map(|ticket| (parse_creation_date(&ticket.creation_date), ticket))
        .collect();
    dated.sort_by(|(a, _), (b, _)| newest_first(a, b));
    dated
        .into_iter()
        .take(limit)
        .map(|(_, ticket)| ticket.clone())
        .collect()
}

fn newest_first(a: &Option<NaiveDateTime>, b: &Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ticket::Status;
    use pretty_assertions::assert_eq;

    fn ticket(id: u64, date: &str, status: Status, priority: Priority) -> Ticket {
        Ticket {
            id,
            number: format!("T-{id}"),
            description: String::new(),
            creation_date: date.to_string(),
            status,
            priority,
            responsible_employee: "Sam".to_string(),
            comments: None,
        }
    }

    fn ids(tickets: &[Ticket]) -> Vec<u64> {
        tickets.iter().map(|ticket| ticket.id).collect()
    }

    #[test]
    fn counts_status_and_priority() {
        let tickets = vec![
            ticket(1, "2024-01-01", Status::New, Priority::High),
            ticket(2, "2024-01-01", Status::Resolved, Priority::Low),
            ticket(3, "2024-01-02", Status::InProgress, Priority::High),
            ticket(4, "2024-01-03", Status::Resolved, Priority::Medium),
        ];

        let summary = DashboardSummary::from_tickets(&tickets);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.open, 2);
        assert_eq!(summary.resolved, 2);
        assert_eq!(
            summary.priorities,
            PriorityCounts {
                high: 2,
                medium: 1,
                low: 1
            }
        );
        assert_eq!(summary.priorities.get(Priority::High), 2);
    }

    #[test]
    fn empty_set_yields_zeroes() {
        let summary = DashboardSummary::from_tickets(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.open, 0);
        assert!(summary.timeline.is_empty());
        assert!(summary.recent.is_empty());
    }

    #[test]
    fn groups_timeline_by_day_in_first_seen_order() {
        let tickets = vec![
            ticket(1, "2024-02-03T10:00", Status::New, Priority::Low),
            ticket(2, "2024-02-01T09:00", Status::New, Priority::Low),
            ticket(3, "2024-02-03T17:45", Status::New, Priority::Low),
            ticket(4, "2024-02-01", Status::New, Priority::Low),
        ];

        let summary = DashboardSummary::from_tickets(&tickets);
        let point = |date: &str, count| TimelinePoint {
            date: date.to_string(),
            count,
        };

        assert_eq!(
            summary.timeline,
            vec![point("2024-02-03", 2), point("2024-02-01", 2)]
        );
        assert_eq!(
            summary.timeline_by_date(),
            vec![point("2024-02-01", 2), point("2024-02-03", 2)]
        );
    }

    #[test]
    fn timeline_merges_space_and_t_separated_times() {
        let tickets = vec![
            ticket(1, "2024-03-05 10:00", Status::New, Priority::Low),
            ticket(2, "2024-03-05 11:00", Status::New, Priority::Low),
            ticket(3, "2024-03-05T09:00", Status::New, Priority::Low),
        ];

        let summary = DashboardSummary::from_tickets(&tickets);

        assert_eq!(
            summary.timeline,
            vec![TimelinePoint {
                date: "2024-03-05".to_string(),
                count: 3,
            }]
        );
    }

    #[test]
    fn recent_returns_five_latest_descending() {
        let tickets: Vec<Ticket> = [
            (1, "2024-03-04"),
            (2, "2024-03-07T12:00"),
            (3, "2024-03-01"),
            (4, "2024-03-06T08:30:00"),
            (5, "2024-03-02"),
            (6, "2024-03-05 10:00"),
            (7, "2024-03-03T00:00:00Z"),
        ]
        .into_iter()
        .map(|(id, date)| ticket(id, date, Status::New, Priority::Low))
        .collect();

        let summary = DashboardSummary::from_tickets(&tickets);

        assert_eq!(ids(&summary.recent), vec![2, 4, 6, 1, 7]);
    }

    #[test]
    fn recent_ties_keep_input_order_and_unparseable_dates_go_last() {
        let tickets = vec![
            ticket(1, "someday", Status::New, Priority::Low),
            ticket(2, "2024-03-01", Status::New, Priority::Low),
            ticket(3, "2024-03-01", Status::New, Priority::Low),
            ticket(4, "2024-02-01", Status::New, Priority::Low),
        ];

        let summary = DashboardSummary::from_tickets(&tickets);

        assert_eq!(ids(&summary.recent), vec![2, 3, 4, 1]);
    }

    #[test]
    fn parses_supported_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();

        assert_eq!(parse_creation_date("2024-03-01T09:30"), Some(expected));
        assert_eq!(parse_creation_date("2024-03-01T09:30:00"), Some(expected));
        assert_eq!(parse_creation_date("2024-03-01 09:30"), Some(expected));
        assert_eq!(
            parse_creation_date("2024-03-01T11:30:00+02:00"),
            Some(expected)
        );
        assert!(parse_creation_date("2024-03-01").is_some());
        assert_eq!(parse_creation_date("yesterday"), None);
    }

    #[test]
    fn date_portion_cuts_at_time_separator() {
        assert_eq!(date_portion("2024-03-01T09:30"), "2024-03-01");
        assert_eq!(date_portion("2024-03-01 09:30"), "2024-03-01");
        assert_eq!(date_portion("2024-03-01"), "2024-03-01");
    }
}
