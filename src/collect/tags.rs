use super::Aggregates;
use crate::error::Result;
use crate::model::TagRecord;
use crate::parse::{parse_revision_header, ref_lines, shortlog_lines};
use crate::util::day_key;
use std::collections::BTreeMap;

impl Aggregates {
    /// Registers every tag from a `show-ref --tags` listing, asking `header`
    /// for the `<epoch> <author>` of each target. Tags whose header comes
    /// back empty are left out.
    pub fn fold_tag_refs<F>(mut self, refs: &str, mut header: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<String>,
    {
        for parsed in ref_lines(refs) {
            let Some(tag) = self.accept(parsed) else {
                continue;
            };
            let output = header(&tag.revision_id)?;
            let Some(first) = output.lines().find(|line| !line.trim().is_empty()) else {
                continue;
            };
            let Some(head) = self.accept(parse_revision_header(first)) else {
                continue;
            };
            self.tags.insert(
                tag.tag.clone(),
                TagRecord {
                    name: tag.tag,
                    revision_id: tag.revision_id,
                    timestamp: head.timestamp,
                    date: day_key(head.timestamp),
                    commit_count: 0,
                    authors: BTreeMap::new(),
                },
            );
        }
        Ok(self)
    }

    /// Tag names oldest first; equal timestamps order by name.
    pub fn tags_oldest_first(&self) -> Vec<String> {
        let mut order: Vec<(i64, &str)> = self
            .tags
            .values()
            .map(|tag| (tag.timestamp, tag.name.as_str()))
            .collect();
        order.sort();
        order.into_iter().map(|(_, name)| name.to_string()).collect()
    }

    /// Fills each tag's commit and author counts with the commits it adds
    /// over the next-older tag, so ranges never overlap. `shortlog` runs
    /// `shortlog -s` over the given revisions, which are full ref names so a
    /// tag cannot be mistaken for a path.
    pub fn fold_tag_deltas<F>(mut self, mut shortlog: F) -> Result<Self>
    where
        F: FnMut(&[String]) -> Result<String>,
    {
        let mut older: Option<String> = None;
        for name in self.tags_oldest_first() {
            let mut revisions = vec![format!("refs/tags/{name}")];
            if let Some(older) = &older {
                revisions.push(format!("^refs/tags/{older}"));
            }
            let output = shortlog(&revisions)?;
            if output.trim().is_empty() {
                continue;
            }
            let lines = self.accept_all(shortlog_lines(&output));
            if let Some(tag) = self.tags.get_mut(&name) {
                for line in lines {
                    tag.commit_count += line.commits;
                    *tag.authors.entry(line.author).or_insert(0) += line.commits;
                }
            }
            older = Some(name);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const REFS: &str = "\
1111111111111111111111111111111111111111 refs/tags/v0.1
2222222222222222222222222222222222222222 refs/tags/v0.2
3333333333333333333333333333333333333333 refs/tags/v1.0
4444444444444444444444444444444444444444 refs/tags/empty
";

    fn refs(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn headers(rev: &str) -> Result<String> {
        Ok(match &rev[..1] {
            "1" => "1600000000 Ada".to_string(),
            "2" => "1600100000 Ada".to_string(),
            "3" => "1600200000 Bob".to_string(),
            _ => String::new(),
        })
    }

    #[test]
    fn refs_become_tags() {
        let stats = Aggregates::new().fold_tag_refs(REFS, headers).unwrap();
        assert_eq!(stats.tags.len(), 3);
        assert_eq!(stats.tags["v0.2"].timestamp, 1_600_100_000);
        assert_eq!(stats.tags["v0.1"].date, "2020-09-13");
        assert_eq!(stats.tags_oldest_first(), vec!["v0.1", "v0.2", "v1.0"]);
    }

    #[test]
    fn deltas_exclude_the_older_tag() {
        let answers: HashMap<Vec<String>, &str> = HashMap::from([
            (refs(&["refs/tags/v0.1"]), "     3\tAda\n"),
            (
                refs(&["refs/tags/v0.2", "^refs/tags/v0.1"]),
                "     2\tAda\n     1\tBob\n",
            ),
            (refs(&["refs/tags/v1.0", "^refs/tags/v0.2"]), "     4\tBob\n"),
        ]);
        let mut asked = Vec::new();
        let stats = Aggregates::new()
            .fold_tag_refs(REFS, headers)
            .unwrap()
            .fold_tag_deltas(|revs| {
                asked.push(revs.to_vec());
                Ok(answers.get(revs).copied().unwrap_or("").to_string())
            })
            .unwrap();

        assert_eq!(asked.len(), 3);
        assert_eq!(stats.tags["v0.1"].commit_count, 3);
        assert_eq!(stats.tags["v0.2"].commit_count, 3);
        assert_eq!(stats.tags["v0.2"].authors["Bob"], 1);
        assert_eq!(stats.tags["v1.0"].commit_count, 4);
        let sum: u64 = stats.tags.values().map(|t| t.commit_count).sum();
        assert_eq!(sum, 10);
    }

    #[test]
    fn tag_without_new_commits_is_not_a_boundary() {
        let mut asked = Vec::new();
        let stats = Aggregates::new()
            .fold_tag_refs(REFS, headers)
            .unwrap()
            .fold_tag_deltas(|revs| {
                asked.push(revs.to_vec());
                Ok(match revs[0].as_str() {
                    "refs/tags/v0.1" => "     1\tAda\n".to_string(),
                    "refs/tags/v0.2" => String::new(),
                    _ => "     2\tBob\n".to_string(),
                })
            })
            .unwrap();
        assert_eq!(asked[2], refs(&["refs/tags/v1.0", "^refs/tags/v0.1"]));
        assert_eq!(stats.tags["v0.2"].commit_count, 0);
    }

    #[test]
    fn bad_tag_stamp_is_zero_with_warning() {
        let refs = "1111111111111111111111111111111111111111 refs/tags/odd\n";
        let stats = Aggregates::new()
            .fold_tag_refs(refs, |_| Ok("yesterday Someone".to_string()))
            .unwrap();
        assert_eq!(stats.tags["odd"].timestamp, 0);
        assert_eq!(stats.warnings.len(), 1);
    }
}
