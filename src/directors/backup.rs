//! Backup capability matrix
//!
//! Which role may decide on behalf of which. The matrix is symmetric and a
//! role never backs up itself.

use crate::models::DirectorRole;
use DirectorRole::*;

const PAIRS: &[(DirectorRole, DirectorRole)] = &[
    (Chair, Ceo),
    (Chair, Strategy),
    (Ceo, Strategy),
    (Ceo, Operations),
    (Finance, Ceo),
    (Finance, Operations),
    (Finance, Risk),
    (Strategy, Innovation),
    (Strategy, Product),
    (Operations, Technology),
    (Technology, Security),
    (Technology, Data),
    (Legal, Compliance),
    (Legal, Risk),
    (Security, Compliance),
    (Research, Innovation),
    (Marketing, Product),
    (HumanResources, Operations),
    (Sustainability, Strategy),
];

pub fn can_backup(backup: DirectorRole, primary: DirectorRole) -> bool {
    if backup == primary {
        return false;
    }
    PAIRS
        .iter()
        .any(|&(a, b)| (a == backup && b == primary) || (a == primary && b == backup))
}

/// Roles able to stand in for `primary`, in declaration order
pub fn candidates(primary: DirectorRole) -> Vec<DirectorRole> {
    DirectorRole::ALL
        .iter()
        .copied()
        .filter(|role| can_backup(*role, primary))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_is_symmetric() {
        for a in DirectorRole::ALL {
            for b in DirectorRole::ALL {
                assert_eq!(can_backup(a, b), can_backup(b, a), "{} / {}", a, b);
            }
        }
    }

    #[test]
    fn test_no_self_backup() {
        for role in DirectorRole::ALL {
            assert!(!can_backup(role, role));
        }
    }

    #[test]
    fn test_known_pairs() {
        assert!(can_backup(Chair, Strategy));
        assert!(can_backup(Operations, Finance));
        assert!(can_backup(Compliance, Legal));
        assert!(!can_backup(Legal, Technology));
        assert_eq!(candidates(Chair), vec![Ceo, Strategy]);
    }
}
