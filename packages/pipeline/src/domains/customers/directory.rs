//! Customer lookup store.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use super::models::Customer;

/// Read-only lookup keyed by phone number and customer id.
pub trait CustomerDirectory: Send + Sync {
    fn find_by_phone(&self, phone: &str) -> Option<Customer>;
    fn find_by_id(&self, customer_id: &str) -> Option<Customer>;
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to read customer data from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid customer data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Directory loaded once from a JSON array of customers.
#[derive(Debug, Clone, Default)]
pub struct JsonCustomerDirectory {
    customers: Vec<Customer>,
    by_phone: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
}

impl JsonCustomerDirectory {
    pub fn from_customers(customers: Vec<Customer>) -> Self {
        let by_phone = customers
            .iter()
            .enumerate()
            .map(|(i, c)| (c.phone.clone(), i))
            .collect();
        let by_id = customers
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();

        Self {
            customers,
            by_phone,
            by_id,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, DirectoryError> {
        let customers: Vec<Customer> = serde_json::from_str(json)?;
        Ok(Self::from_customers(customers))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| DirectoryError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let directory = Self::from_json(&json)?;
        info!(path = %path.display(), customers = directory.len(), "customer directory loaded");
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }
}

impl CustomerDirectory for JsonCustomerDirectory {
    fn find_by_phone(&self, phone: &str) -> Option<Customer> {
        self.by_phone
            .get(phone)
            .map(|&i| self.customers[i].clone())
    }

    fn find_by_id(&self, customer_id: &str) -> Option<Customer> {
        self.by_id
            .get(customer_id)
            .map(|&i| self.customers[i].clone())
    }
}
