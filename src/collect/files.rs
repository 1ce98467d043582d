use super::Aggregates;
use crate::model::{ContentId, TreeEntry};
use crate::util::extension_of;

impl Aggregates {
    /// Records `files_by_stamp` from resolved `(timestamp, tree, files)`
    /// triples. Later revisions sharing a timestamp overwrite earlier ones.
    pub fn fold_file_counts<I>(mut self, counts: I) -> Self
    where
        I: IntoIterator<Item = (i64, ContentId, u64)>,
    {
        for (stamp, _, files) in counts {
            self.files_by_stamp.insert(stamp, files);
        }
        self
    }

    /// Size and extension composition of the tip tree. Hands back one
    /// `(extension, blob)` pair per blob so line counts can be resolved.
    pub fn fold_tree_entries(
        mut self,
        entries: Vec<TreeEntry>,
        max_ext_length: usize,
    ) -> (Self, Vec<(String, ContentId)>) {
        let mut blobs = Vec::with_capacity(entries.len());
        for entry in entries {
            self.total_size += entry.size;
            self.total_files += 1;
            let ext = extension_of(&entry.path, max_ext_length).to_string();
            self.extensions.entry(ext.clone()).or_default().file_count += 1;
            blobs.push((ext, entry.blob_id));
        }
        (self, blobs)
    }

    pub fn fold_blob_lines<I>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = (String, ContentId, u64)>,
    {
        for (ext, _, count) in lines {
            self.extensions.entry(ext).or_default().line_count += count;
        }
        self
    }
}
