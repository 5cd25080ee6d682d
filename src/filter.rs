use crate::types::{JoinedRecord, RegionSelection};
use std::collections::BTreeSet;

/// Records whose region equals the selection, in input order.
///
/// [`RegionSelection::All`] passes every record through. A region with no
/// subzones gives an empty vector.
pub fn filter_region<'a>(
    records: &'a [JoinedRecord],
    selection: &RegionSelection,
) -> Vec<&'a JoinedRecord> {
    match selection {
        RegionSelection::All => records.iter().collect(),
        RegionSelection::Region(name) => records
            .iter()
            .filter(|record| record.region() == Some(name.as_str()))
            .collect(),
    }
}

/// Sorted distinct region names, skipping records without one.
pub fn regions(records: &[JoinedRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(JoinedRecord::region)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Options for the region selector: "All" first.
pub fn selector_options(records: &[JoinedRecord]) -> Vec<String> {
    std::iter::once(RegionSelection::ALL_LABEL.to_string())
        .chain(regions(records))
        .collect()
}
