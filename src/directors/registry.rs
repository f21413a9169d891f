//! Director registry
//!
//! Owns the instantiated directors keyed by role and resolves who decides for
//! each event, including failover to an active backup.

use super::{
    backup, chair::ChairPolicy, finance::FinancePolicy, legal::LegalPolicy,
    operations::OperationsPolicy, strategy::StrategyPolicy, technology::TechnologyPolicy, Director,
    DirectorPolicy, DirectorStatus,
};
use crate::models::DirectorRole;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// One unit of dispatch work
#[derive(Clone)]
pub struct DispatchTarget {
    pub director: Arc<Director>,
    /// The inactive role this director is covering, if any
    pub on_behalf_of: Option<DirectorRole>,
}

#[derive(Default)]
pub struct DirectorRegistry {
    directors: BTreeMap<DirectorRole, Arc<Director>>,
}

impl DirectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The six standing board directors
    pub fn standard() -> Self {
        let policies: Vec<Box<dyn DirectorPolicy>> = vec![
            Box::new(ChairPolicy),
            Box::new(StrategyPolicy),
            Box::new(OperationsPolicy),
            Box::new(TechnologyPolicy),
            Box::new(FinancePolicy),
            Box::new(LegalPolicy),
        ];

        let mut registry = Self::new();
        for policy in policies {
            registry.register(Director::new(policy));
        }
        info!("👔 Director registry ready with {} directors", registry.len());
        registry
    }

    /// Adds a director, replacing any previous holder of the role
    pub fn register(&mut self, director: Director) {
        self.directors.insert(director.role(), Arc::new(director));
    }

    pub fn get(&self, role: DirectorRole) -> Option<&Arc<Director>> {
        self.directors.get(&role)
    }

    pub fn len(&self) -> usize {
        self.directors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Director>> {
        self.directors.values()
    }

    /// Who decides on the next event. Inactive roles fail over to the first
    /// active director able to back them up; otherwise they are skipped.
    pub fn dispatch_targets(&self) -> Vec<DispatchTarget> {
        let mut targets = Vec::with_capacity(self.directors.len());

        for (role, director) in &self.directors {
            if director.is_active() {
                targets.push(DispatchTarget {
                    director: Arc::clone(director),
                    on_behalf_of: None,
                });
                continue;
            }

            let backup = backup::candidates(*role)
                .into_iter()
                .filter_map(|candidate| self.directors.get(&candidate))
                .find(|candidate| candidate.is_active());

            match backup {
                Some(backup) => {
                    info!(
                        role = %role,
                        backup = %backup.role(),
                        "🔁 Failing over inactive director to backup"
                    );
                    targets.push(DispatchTarget {
                        director: Arc::clone(backup),
                        on_behalf_of: Some(*role),
                    });
                }
                None => warn!(role = %role, "Director inactive with no active backup; skipping"),
            }
        }

        targets
    }

    pub fn status(&self) -> Vec<DirectorStatus> {
        self.directors.values().map(|d| d.status()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_board() {
        let registry = DirectorRegistry::standard();
        let roles: Vec<_> = registry.iter().map(|d| d.role()).collect();
        assert_eq!(
            roles,
            vec![
                DirectorRole::Chair,
                DirectorRole::Strategy,
                DirectorRole::Operations,
                DirectorRole::Technology,
                DirectorRole::Finance,
                DirectorRole::Legal,
            ]
        );
        assert_eq!(registry.dispatch_targets().len(), 6);
    }

    #[test]
    fn test_inactive_director_fails_over() {
        let registry = DirectorRegistry::standard();
        registry.get(DirectorRole::Chair).unwrap().deactivate();

        let targets = registry.dispatch_targets();
        assert_eq!(targets.len(), 6);
        let covering = targets
            .iter()
            .find(|t| t.on_behalf_of == Some(DirectorRole::Chair))
            .expect("chair should be covered");
        assert_eq!(covering.director.role(), DirectorRole::Strategy);
    }

    #[test]
    fn test_inactive_director_without_backup_is_skipped() {
        let registry = DirectorRegistry::standard();
        // Legal's partners (compliance, risk) are not on the board
        registry.get(DirectorRole::Legal).unwrap().deactivate();

        let targets = registry.dispatch_targets();
        assert_eq!(targets.len(), 5);
        assert!(targets.iter().all(|t| t.director.role() != DirectorRole::Legal));
    }
}
