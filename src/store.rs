// src/store.rs
use std::collections::HashMap;

use crate::error::StoreError;
use crate::models::{TotalsRecord, TransactionRecord, User};

/// Key-value persistence for the three entity kinds, keyed by string id.
/// Saving an existing id overwrites it.
pub trait Store {
    fn load_user(&self, id: &str) -> Result<Option<User>, StoreError>;
    fn save_user(&mut self, user: &User) -> Result<(), StoreError>;

    fn load_transaction(&self, id: &str) -> Result<Option<TransactionRecord>, StoreError>;
    fn save_transaction(&mut self, tx: &TransactionRecord) -> Result<(), StoreError>;

    fn load_totals(&self, user_address: &str) -> Result<Option<TotalsRecord>, StoreError>;
    fn save_totals(&mut self, totals: &TotalsRecord) -> Result<(), StoreError>;

    /// Persist a transfer record together with the totals it moved.
    ///
    /// Totals are written first, so a failure leaves the record absent and a
    /// retry applies them again. Stores with transactions commit both at once.
    fn commit_transfer(
        &mut self,
        tx: &TransactionRecord,
        totals: Option<&TotalsRecord>,
    ) -> Result<(), StoreError> {
        if let Some(totals) = totals {
            self.save_totals(totals)?;
        }
        self.save_transaction(tx)
    }
}

/// Volatile store, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: HashMap<String, User>,
    transactions: HashMap<String, TransactionRecord>,
    totals: HashMap<String, TotalsRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

impl Store for MemoryStore {
    fn load_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(id).cloned())
    }

    fn save_user(&mut self, user: &User) -> Result<(), StoreError> {
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn load_transaction(&self, id: &str) -> Result<Option<TransactionRecord>, StoreError> {
        Ok(self.transactions.get(id).cloned())
    }

    fn save_transaction(&mut self, tx: &TransactionRecord) -> Result<(), StoreError> {
        self.transactions.insert(tx.id.clone(), tx.clone());
        Ok(())
    }

    fn load_totals(&self, user_address: &str) -> Result<Option<TotalsRecord>, StoreError> {
        Ok(self.totals.get(user_address).cloned())
    }

    fn save_totals(&mut self, totals: &TotalsRecord) -> Result<(), StoreError> {
        self.totals.insert(totals.user_address.clone(), totals.clone());
        Ok(())
    }
}
