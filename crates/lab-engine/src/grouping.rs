//! Display regrouping of report rows.
//!
//! Rows are partitioned by `outer_group` in first-seen order; partitions are
//! never merged, so two included tests of a panel keep their own headings
//! even when they use the same labels. Inside a partition rows are bucketed
//! by canonical `group_by` (see [`canonical_label`]). Buckets come out in
//! first-seen order, followed by rows without a group. Every bucket, and the
//! ungrouped tail, is sorted by `order`.

use lab_model::{FirstSeenLabels, ResolvedParameter, canonical_label};

/// One heading's worth of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSection {
    pub outer_group: String,
    /// First raw label seen for the bucket; None for ungrouped rows.
    pub heading: Option<String>,
    pub items: Vec<ResolvedParameter>,
}

struct Partition {
    outer_group: String,
    labels: FirstSeenLabels,
    buckets: Vec<(String, Vec<ResolvedParameter>)>,
    ungrouped: Vec<ResolvedParameter>,
}

impl Partition {
    fn new(outer_group: &str) -> Self {
        Self {
            outer_group: outer_group.to_string(),
            labels: FirstSeenLabels::default(),
            buckets: Vec::new(),
            ungrouped: Vec::new(),
        }
    }

    fn push(&mut self, row: ResolvedParameter) {
        if row.group_by.trim().is_empty() {
            self.ungrouped.push(row);
            return;
        }
        let key = self.labels.insert(&row.group_by);
        match self.buckets.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, items)) => items.push(row),
            None => self.buckets.push((key, vec![row])),
        }
    }

    fn into_sections(self) -> Vec<GroupSection> {
        let Partition {
            outer_group,
            labels,
            buckets,
            ungrouped,
        } = self;
        let mut sections: Vec<GroupSection> = buckets
            .into_iter()
            .map(|(key, items)| GroupSection {
                outer_group: outer_group.clone(),
                heading: labels.get(&key).map(str::to_string),
                items,
            })
            .collect();
        if !ungrouped.is_empty() {
            sections.push(GroupSection {
                outer_group: outer_group.clone(),
                heading: None,
                items: ungrouped,
            });
        }
        for section in &mut sections {
            section
                .items
                .sort_by(|a, b| a.order.total_cmp(&b.order));
        }
        sections
    }
}

/// Sections in display order.
pub fn group_sections(rows: &[ResolvedParameter]) -> Vec<GroupSection> {
    let mut partitions: Vec<Partition> = Vec::new();
    for row in rows {
        let idx = match partitions
            .iter()
            .position(|partition| partition.outer_group == row.outer_group)
        {
            Some(idx) => idx,
            None => {
                partitions.push(Partition::new(&row.outer_group));
                partitions.len() - 1
            }
        };
        partitions[idx].push(row.clone());
    }
    partitions
        .into_iter()
        .flat_map(Partition::into_sections)
        .collect()
}

/// Rows in display order. Each grouped row's `group_by` is rewritten to
/// its bucket heading, so consecutive rows share one exact label.
pub fn regroup(rows: &[ResolvedParameter]) -> Vec<ResolvedParameter> {
    group_sections(rows)
        .into_iter()
        .flat_map(|section| {
            let heading = section.heading;
            section.items.into_iter().map(move |mut row| {
                if let Some(label) = &heading {
                    row.group_by.clone_from(label);
                }
                row
            })
        })
        .collect()
}

/// True when two labels land in the same bucket.
pub fn same_group(a: &str, b: &str) -> bool {
    canonical_label(a) == canonical_label(b)
}
