//! Party identities
//!
//! A contract names two parties: the customer receiving service and the
//! worker providing it. Both are immutable per contract instance; replacing
//! the worker creates a new contract rather than editing this one.

use serde::{Deserialize, Serialize};

/// Customer identity as recorded on a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerIdentity {
    /// Customer name
    pub name: String,
    /// Customer phone (the chain key: one chain per customer phone)
    pub phone: String,
    /// National id number, when collected
    pub id_number: Option<String>,
}

impl CustomerIdentity {
    /// Create new customer identity
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            id_number: None,
        }
    }

    /// With id number
    #[inline]
    #[must_use]
    pub fn with_id_number(mut self, id_number: impl Into<String>) -> Self {
        self.id_number = Some(id_number.into());
        self
    }
}

/// Worker identity as recorded on a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerIdentity {
    /// Worker name
    pub name: String,
    /// Worker phone
    pub phone: String,
    /// National id number (required: insurance matching keys on it)
    pub id_number: String,
}

impl WorkerIdentity {
    /// Create new worker identity
    #[inline]
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        id_number: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            id_number: id_number.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_identity_builder() {
        let customer = CustomerIdentity::new("张女士", "13800138000").with_id_number("110101199001011234");
        assert_eq!(customer.name, "张女士");
        assert_eq!(customer.id_number.as_deref(), Some("110101199001011234"));
    }

    #[test]
    fn worker_identity_fields() {
        let worker = WorkerIdentity::new("王阿姨", "13900139000", "110101198001015678");
        assert_eq!(worker.id_number, "110101198001015678");
    }
}
