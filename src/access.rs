//! Which stores an identity may pick from.

use crate::auth::{Grant, Identity, WILDCARD};

pub const NO_ACCESS_LABEL: &str = "No access";

/// One entry of the store selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionChoice {
    /// Every store (wildcard grants only).
    All,
    Store(String),
    /// The grant matches no store in the data; selects nothing.
    NoAccess,
}

impl PartitionChoice {
    pub fn label(&self) -> &str {
        match self {
            PartitionChoice::All => WILDCARD,
            PartitionChoice::Store(name) => name,
            PartitionChoice::NoAccess => NO_ACCESS_LABEL,
        }
    }
}

/// Compute the selector options for `identity` over `dataset_partitions`.
///
/// `dataset_partitions` must be distinct values in first-seen order; the
/// output keeps that order. Never returns an empty list.
pub fn allowed_partitions(
    identity: &Identity,
    dataset_partitions: &[String],
) -> Vec<PartitionChoice> {
    match &identity.grant {
        Grant::All => std::iter::once(PartitionChoice::All)
            .chain(
                dataset_partitions
                    .iter()
                    .map(|p| PartitionChoice::Store(p.clone())),
            )
            .collect(),
        Grant::Stores(granted) => {
            let offered: Vec<PartitionChoice> = dataset_partitions
                .iter()
                .filter(|p| granted.contains(p))
                .map(|p| PartitionChoice::Store(p.clone()))
                .collect();
            if offered.is_empty() {
                vec![PartitionChoice::NoAccess]
            } else {
                offered
            }
        }
    }
}

/// Match a typed label against the offered options.
pub fn find_choice(offered: &[PartitionChoice], label: &str) -> Option<PartitionChoice> {
    let label = label.trim();
    offered.iter().find(|c| c.label() == label).cloned()
}

/// Keep `current` if it is still offered, otherwise fall back to the first option.
pub fn effective_choice(
    offered: &[PartitionChoice],
    current: Option<&PartitionChoice>,
) -> PartitionChoice {
    current
        .filter(|c| offered.contains(c))
        .cloned()
        .or_else(|| offered.first().cloned())
        .unwrap_or(PartitionChoice::NoAccess)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(grant: Grant) -> Identity {
        Identity {
            name: "u".to_string(),
            grant,
        }
    }

    fn parts(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_wildcard_gets_all_first_then_dataset_order() {
        let offered = allowed_partitions(&identity(Grant::All), &parts(&["B", "A"]));
        assert_eq!(
            offered,
            vec![
                PartitionChoice::All,
                PartitionChoice::Store("B".into()),
                PartitionChoice::Store("A".into()),
            ]
        );
    }

    #[test]
    fn test_restricted_gets_intersection_in_dataset_order() {
        let grant = Grant::Stores(parts(&["C", "A", "Q"]));
        let offered = allowed_partitions(&identity(grant), &parts(&["A", "B", "C"]));
        assert_eq!(
            offered,
            vec![
                PartitionChoice::Store("A".into()),
                PartitionChoice::Store("C".into()),
            ]
        );
    }

    #[test]
    fn test_empty_intersection_is_no_access() {
        let grant = Grant::Stores(parts(&["X"]));
        let offered = allowed_partitions(&identity(grant), &parts(&["Y", "Z"]));
        assert_eq!(offered, vec![PartitionChoice::NoAccess]);
        assert_eq!(offered[0].label(), NO_ACCESS_LABEL);
    }

    #[test]
    fn test_find_and_effective_choice() {
        let offered = allowed_partitions(&identity(Grant::All), &parts(&["A"]));
        assert_eq!(find_choice(&offered, " A "), Some(PartitionChoice::Store("A".into())));
        assert_eq!(find_choice(&offered, "Z"), None);

        let stale = PartitionChoice::Store("gone".into());
        assert_eq!(effective_choice(&offered, Some(&stale)), PartitionChoice::All);
        let kept = PartitionChoice::Store("A".into());
        assert_eq!(effective_choice(&offered, Some(&kept)), kept);
        assert_eq!(effective_choice(&[], None), PartitionChoice::NoAccess);
    }
}
