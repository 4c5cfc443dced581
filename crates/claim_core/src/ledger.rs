//! Per-player resource balances.
//!
//! Each owner's balances live behind their own mutex, so debits for one
//! owner are serialized while different owners never contend. A debit
//! checks every resource before touching any of them.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::error::{LedgerError, Shortfall};
use crate::ids::{OwnerId, ResourceCost, ResourceId};

/// One owner's resource quantities.
pub type Balances = BTreeMap<ResourceId, u64>;

/// Atomic read/debit/credit of resource quantities.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    accounts: RwLock<HashMap<OwnerId, Arc<Mutex<Balances>>>>,
}

impl ResourceLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from exported balances.
    #[must_use]
    pub fn from_balances(balances: impl IntoIterator<Item = (OwnerId, Balances)>) -> Self {
        Self {
            accounts: RwLock::new(
                balances
                    .into_iter()
                    .map(|(owner, purse)| (owner, Arc::new(Mutex::new(purse))))
                    .collect(),
            ),
        }
    }

    fn existing(&self, owner: OwnerId) -> Option<Arc<Mutex<Balances>>> {
        self.accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&owner)
            .map(Arc::clone)
    }

    /// Account for `owner`, opened on first credit.
    fn account(&self, owner: OwnerId) -> Arc<Mutex<Balances>> {
        if let Some(account) = self.existing(owner) {
            return account;
        }

        let mut accounts = self
            .accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(accounts.entry(owner).or_default())
    }

    /// Add `quantity` of a resource. Always succeeds; saturates at `u64::MAX`.
    pub fn credit(&self, owner: OwnerId, resource: impl Into<ResourceId>, quantity: u64) {
        let resource = resource.into();
        let account = self.account(owner);
        let mut purse = account.lock().unwrap_or_else(PoisonError::into_inner);
        let held = purse.entry(resource.clone()).or_insert(0);
        *held = held.saturating_add(quantity);
        tracing::debug!(%owner, %resource, quantity, balance = *held, "Credited resource");
    }

    /// Debit every entry of `costs`, or nothing at all.
    ///
    /// Zero-quantity entries are ignored.
    pub fn debit_all(&self, owner: OwnerId, costs: &ResourceCost) -> Result<(), LedgerError> {
        // Owners that never received anything can only pay an empty cost
        let Some(account) = self.existing(owner) else {
            return refuse(owner, shortfalls(&Balances::new(), costs));
        };
        let mut purse = account.lock().unwrap_or_else(PoisonError::into_inner);

        let shortfalls = shortfalls(&purse, costs);
        if !shortfalls.is_empty() {
            return refuse(owner, shortfalls);
        }

        for (resource, &quantity) in costs.iter().filter(|(_, q)| **q > 0) {
            if let Some(held) = purse.get_mut(resource) {
                *held -= quantity;
            }
        }
        tracing::debug!(%owner, resources = costs.len(), "Debited resources");
        Ok(())
    }

    /// Check if the owner could pay `costs` right now.
    #[must_use]
    pub fn can_afford(&self, owner: OwnerId, costs: &ResourceCost) -> bool {
        shortfalls(&self.balances(owner), costs).is_empty()
    }

    /// Quantity of one resource held by an owner.
    #[must_use]
    pub fn quantity(&self, owner: OwnerId, resource: &ResourceId) -> u64 {
        let Some(account) = self.existing(owner) else {
            return 0;
        };
        let purse = account.lock().unwrap_or_else(PoisonError::into_inner);
        purse.get(resource).copied().unwrap_or(0)
    }

    /// Copy of every balance held by an owner.
    #[must_use]
    pub fn balances(&self, owner: OwnerId) -> Balances {
        let Some(account) = self.existing(owner) else {
            return Balances::new();
        };
        let purse = account.lock().unwrap_or_else(PoisonError::into_inner);
        purse.clone()
    }

    /// Copy of all accounts, ordered by owner.
    #[must_use]
    pub fn export(&self) -> Vec<(OwnerId, Balances)> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        let mut exported: Vec<_> = accounts
            .iter()
            .map(|(owner, account)| {
                let purse = account.lock().unwrap_or_else(PoisonError::into_inner);
                (*owner, purse.clone())
            })
            .collect();
        exported.sort_by_key(|(owner, _)| *owner);
        exported
    }
}

fn refuse(owner: OwnerId, shortfalls: Vec<Shortfall>) -> Result<(), LedgerError> {
    if shortfalls.is_empty() {
        return Ok(());
    }
    tracing::warn!(%owner, short = shortfalls.len(), "Debit refused");
    Err(LedgerError::InsufficientResources(shortfalls))
}

/// Every resource in `costs` that `purse` cannot cover.
fn shortfalls(purse: &Balances, costs: &ResourceCost) -> Vec<Shortfall> {
    costs
        .iter()
        .filter_map(|(resource, &required)| {
            let available = purse.get(resource).copied().unwrap_or(0);
            (available < required).then(|| Shortfall {
                resource: resource.clone(),
                required,
                available,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::cost;

    const ALICE: OwnerId = OwnerId::new(1);
    const BOB: OwnerId = OwnerId::new(2);

    fn wood() -> ResourceId {
        ResourceId::from("wood")
    }

    #[test]
    fn test_credit_accumulates() {
        let ledger = ResourceLedger::new();
        ledger.credit(ALICE, "wood", 10);
        ledger.credit(ALICE, "wood", 5);
        assert_eq!(ledger.quantity(ALICE, &wood()), 15);
        assert_eq!(ledger.quantity(BOB, &wood()), 0);
    }

    #[test]
    fn test_credit_saturates() {
        let ledger = ResourceLedger::new();
        ledger.credit(ALICE, "wood", u64::MAX);
        ledger.credit(ALICE, "wood", 1);
        assert_eq!(ledger.quantity(ALICE, &wood()), u64::MAX);
    }

    #[test]
    fn test_debit_all_success() {
        let ledger = ResourceLedger::new();
        ledger.credit(ALICE, "wood", 50);
        ledger.credit(ALICE, "stone", 20);

        ledger
            .debit_all(ALICE, &cost([("wood", 30), ("stone", 20)]))
            .expect("affordable");

        assert_eq!(ledger.quantity(ALICE, &wood()), 20);
        assert_eq!(ledger.quantity(ALICE, &ResourceId::from("stone")), 0);
    }

    #[test]
    fn test_debit_all_is_all_or_nothing() {
        let ledger = ResourceLedger::new();
        ledger.credit(ALICE, "wood", 10);

        let err = ledger
            .debit_all(ALICE, &cost([("wood", 5), ("stone", 20)]))
            .unwrap_err();

        let LedgerError::InsufficientResources(shortfalls) = err;
        assert_eq!(
            shortfalls,
            vec![Shortfall {
                resource: ResourceId::from("stone"),
                required: 20,
                available: 0,
            }]
        );
        // Wood untouched
        assert_eq!(ledger.quantity(ALICE, &wood()), 10);
    }

    #[test]
    fn test_debit_reports_every_shortfall() {
        let ledger = ResourceLedger::new();
        ledger.credit(ALICE, "wood", 1);

        let LedgerError::InsufficientResources(shortfalls) = ledger
            .debit_all(ALICE, &cost([("wood", 5), ("stone", 20)]))
            .unwrap_err();
        assert_eq!(shortfalls.len(), 2);
    }

    #[test]
    fn test_zero_cost_always_succeeds() {
        let ledger = ResourceLedger::new();
        assert!(ledger.can_afford(ALICE, &cost([("wood", 0)])));
        ledger
            .debit_all(ALICE, &cost([("wood", 0)]))
            .expect("zero cost");
        ledger.debit_all(ALICE, &ResourceCost::new()).expect("empty cost");
    }

    #[test]
    fn test_owners_are_isolated() {
        let ledger = ResourceLedger::new();
        ledger.credit(ALICE, "wood", 10);
        assert!(ledger.debit_all(BOB, &cost([("wood", 1)])).is_err());
        assert_eq!(ledger.quantity(ALICE, &wood()), 10);
    }

    #[test]
    fn test_concurrent_debits_never_double_spend() {
        let ledger = Arc::new(ResourceLedger::new());
        ledger.credit(ALICE, "wood", 100);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || ledger.debit_all(ALICE, &cost([("wood", 30)])).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 3);
        assert_eq!(ledger.quantity(ALICE, &wood()), 10);
    }

    #[test]
    fn test_export_round_trip() {
        let ledger = ResourceLedger::new();
        ledger.credit(BOB, "stone", 4);
        ledger.credit(ALICE, "wood", 7);

        let exported = ledger.export();
        assert_eq!(exported[0].0, ALICE);

        let restored = ResourceLedger::from_balances(exported);
        assert_eq!(restored.quantity(BOB, &ResourceId::from("stone")), 4);
        assert_eq!(restored.balances(ALICE), ledger.balances(ALICE));
    }

    #[test]
    fn test_reads_do_not_open_accounts() {
        let ledger = ResourceLedger::new();
        ledger.credit(ALICE, "wood", 5);

        assert_eq!(ledger.quantity(BOB, &wood()), 0);
        assert!(ledger.balances(BOB).is_empty());
        assert!(!ledger.can_afford(BOB, &cost([("wood", 1)])));
        assert!(ledger.can_afford(BOB, &ResourceCost::new()));
        assert!(ledger.debit_all(BOB, &cost([("wood", 1)])).is_err());
        ledger.debit_all(BOB, &cost([("wood", 0)])).expect("zero cost");

        let exported = ledger.export();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].0, ALICE);
    }
}
