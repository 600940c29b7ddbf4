//! Company directory.
//!
//! The set of companies eligible for ranking. Values of companies outside the
//! directory are collected nowhere.

use standings_data::{DataError, SqliteStore};
use std::collections::BTreeSet;

/// Trait for company directories.
pub trait CompanyDirectory {
    /// Get all company names in the directory.
    fn companies(&self) -> Result<BTreeSet<String>, DataError>;

    /// Check if a company is in the directory.
    fn contains(&self, company_name: &str) -> Result<bool, DataError> {
        Ok(self.companies()?.contains(company_name))
    }

    /// Get the number of companies.
    fn size(&self) -> Result<usize, DataError> {
        Ok(self.companies()?.len())
    }
}

impl CompanyDirectory for BTreeSet<String> {
    fn companies(&self) -> Result<BTreeSet<String>, DataError> {
        Ok(self.clone())
    }

    fn contains(&self, company_name: &str) -> Result<bool, DataError> {
        Ok(BTreeSet::contains(self, company_name))
    }
}

impl CompanyDirectory for SqliteStore {
    fn companies(&self) -> Result<BTreeSet<String>, DataError> {
        SqliteStore::companies(self)
    }
}

impl<T: CompanyDirectory + ?Sized> CompanyDirectory for &T {
    fn companies(&self) -> Result<BTreeSet<String>, DataError> {
        (**self).companies()
    }

    fn contains(&self, company_name: &str) -> Result<bool, DataError> {
        (**self).contains(company_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_directory() {
        let directory: BTreeSet<String> = ["Alpha", "Beta"].iter().map(|s| s.to_string()).collect();

        assert!(CompanyDirectory::contains(&directory, "Alpha").unwrap());
        assert!(!CompanyDirectory::contains(&directory, "Gamma").unwrap());
        assert_eq!(directory.size().unwrap(), 2);
    }

    #[test]
    fn test_store_directory() {
        let store = SqliteStore::in_memory().unwrap();
        store.add_company("Alpha").unwrap();
        store.add_company("Beta").unwrap();

        let directory = &store;
        assert!(CompanyDirectory::contains(&directory, "Beta").unwrap());
        assert!(!CompanyDirectory::contains(&directory, "Gamma").unwrap());
        assert_eq!(CompanyDirectory::size(&store).unwrap(), 2);
    }
}
