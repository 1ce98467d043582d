use super::Aggregates;
use crate::model::AuthorRefinement;
use crate::util::day_key;
use std::time::Duration;

/// Aggregates after the refine pass: author ranks and shares are filled in
/// and the author order is fixed.
#[derive(Debug, Clone, PartialEq)]
pub struct Refined {
    aggregates: Aggregates,
    authors_by_commits: Vec<String>,
}

impl Refined {
    pub fn aggregates(&self) -> &Aggregates {
        &self.aggregates
    }

    /// Author names, most commits first; ties order by name.
    pub fn authors_by_commits(&self) -> &[String] {
        &self.authors_by_commits
    }

    pub fn last_active_day(&self) -> Option<&str> {
        self.aggregates.active_days.iter().next_back().map(String::as_str)
    }
}

impl Aggregates {
    pub fn refine(mut self) -> Refined {
        let mut order: Vec<(u64, String)> = self
            .authors
            .iter()
            .map(|(name, entry)| (entry.commit_count, name.clone()))
            .collect();
        order.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        let total = self.total_commits;
        for (rank, (_, name)) in order.iter().enumerate() {
            let Some(entry) = self.authors.get_mut(name) else {
                continue;
            };
            let commit_share = if total == 0 {
                0.0
            } else {
                100.0 * entry.commit_count as f64 / total as f64
            };
            let tenure = match (entry.first_commit_timestamp, entry.last_commit_timestamp) {
                (Some(first), Some(last)) => {
                    Some(Duration::from_secs(last.saturating_sub(first).max(0) as u64))
                }
                _ => None,
            };
            entry.refined = Some(AuthorRefinement {
                rank_by_commits: rank + 1,
                commit_share,
                date_first: entry.first_commit_timestamp.map(day_key),
                date_last: entry.last_commit_timestamp.map(day_key),
                tenure,
            });
        }

        Refined {
            aggregates: self,
            authors_by_commits: order.into_iter().map(|(_, name)| name).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::commit_records;

    #[test]
    fn ranks_and_shares() {
        let text = [
            "1700000000 2023-11-14 22:13:20 +0000 Bob <bob@example.com>",
            "1700086400 2023-11-15 22:13:20 +0000 Ada <ada@example.com>",
            "1700000000 2023-11-14 22:13:20 +0000 Ada <ada@example.com>",
            "1700000500 2023-11-14 22:21:40 +0000 Cy <cy@example.com>",
        ]
        .join("\n");
        let refined = Aggregates::new().fold_commits(commit_records(&text)).refine();

        assert_eq!(refined.authors_by_commits(), ["Ada", "Bob", "Cy"]);
        let ada = refined.aggregates().authors["Ada"].refined.clone().unwrap();
        assert_eq!(ada.rank_by_commits, 1);
        assert_eq!(ada.commit_share, 50.0);
        assert_eq!(ada.date_first.as_deref(), Some("2023-11-14"));
        assert_eq!(ada.date_last.as_deref(), Some("2023-11-15"));
        assert_eq!(ada.tenure, Some(Duration::from_secs(86_400)));
        let cy = refined.aggregates().authors["Cy"].refined.clone().unwrap();
        assert_eq!(cy.rank_by_commits, 3);
        assert_eq!(refined.last_active_day(), Some("2023-11-15"));
    }

    #[test]
    fn empty_history_refines_cleanly() {
        let refined = Aggregates::new().refine();
        assert!(refined.authors_by_commits().is_empty());
        assert_eq!(refined.last_active_day(), None);
    }

    #[test]
    fn share_is_zero_without_commits() {
        let mut stats = Aggregates::new();
        stats.authors.entry("Ghost".to_string()).or_default();
        let refined = stats.refine();
        let ghost = refined.aggregates().authors["Ghost"].refined.clone().unwrap();
        assert_eq!(ghost.commit_share, 0.0);
        assert_eq!(ghost.tenure, None);
    }
}
