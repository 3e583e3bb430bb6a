use std::collections::HashSet;

use crate::values::canonicalize;

/// Which argument values a contract wants to keep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ArgFilter {
    /// Nothing passes.
    #[default]
    Blocked,
    AllowAll,
    /// Only the listed values pass (compared in canonical form).
    AllowList(HashSet<String>),
}

impl ArgFilter {
    /// An empty list allows everything; duplicates collapse.
    pub fn from_values(values: &[String]) -> Self {
        if values.is_empty() {
            Self::AllowAll
        } else {
            Self::AllowList(values.iter().map(|value| canonicalize(value)).collect())
        }
    }

    pub fn allows(&self, value: &str) -> bool {
        match self {
            Self::Blocked => false,
            Self::AllowAll => true,
            Self::AllowList(values) => values.contains(&canonicalize(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_rejects_everything() {
        let filter = ArgFilter::Blocked;

        assert!(!filter.allows("0x09BbBBE21a5975cAc061D82f7b843bCE061BA391"));
        assert!(!filter.allows(""));
    }

    #[test]
    fn empty_values_allow_everything() {
        let filter = ArgFilter::from_values(&[]);

        assert_eq!(filter, ArgFilter::AllowAll);
        assert!(filter.allows("anything"));
    }

    #[test]
    fn allow_list_matches_listed_values_in_canonical_form() {
        let filter = ArgFilter::from_values(&[
            "0x09bbbbe21a5975cac061d82f7b843bce061ba391".to_string(),
            "1000".to_string(),
        ]);

        assert!(filter.allows("0x09BbBBE21a5975cAc061D82f7b843bCE061BA391"));
        assert!(filter.allows("1000"));
        assert!(!filter.allows("1001"));
        assert!(!filter.allows("0x0000000000000000000000000000000000000001"));
    }
}
