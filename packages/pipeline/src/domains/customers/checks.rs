//! KYC, offer and credit lookups against the customer records.

use tracing::{debug, info};

use super::directory::CustomerDirectory;
use super::models::{CreditCheck, CustomerNotFound, KycCheck, OfferCheck};

const PRODUCT: &str = "Personal Loan";
const OFFER_VALID_UNTIL: &str = "2025-12-31";
const CREDIT_REPORT_DATE: &str = "2024-01-01";

/// Match a caller to the record registered for `phone`.
///
/// The address check is a case-insensitive substring test in both directions,
/// so "Bandra West, Mumbai" matches "101, Sea View Apts, Bandra West, Mumbai".
pub fn verify_customer(
    directory: &dyn CustomerDirectory,
    phone: &str,
    stated_address: &str,
) -> KycCheck {
    let Some(customer) = directory.find_by_phone(phone) else {
        info!(phone = %phone, "KYC failed: unknown phone");
        return KycCheck::unknown();
    };

    let stated = stated_address.to_lowercase();
    let recorded = customer.address.to_lowercase();
    let address_match = recorded.contains(&stated) || stated.contains(&recorded);
    debug!(customer_id = %customer.id, address_match, "KYC checked");

    KycCheck::matched(&customer, address_match)
}

pub fn check_offer(
    directory: &dyn CustomerDirectory,
    customer_id: &str,
) -> Result<OfferCheck, CustomerNotFound> {
    let customer = directory
        .find_by_id(customer_id)
        .ok_or_else(|| not_found(customer_id))?;

    Ok(OfferCheck {
        customer_id: customer.id,
        pre_approved_limit: customer.pre_approved_limit,
        product: PRODUCT.to_string(),
        valid_until: OFFER_VALID_UNTIL.to_string(),
    })
}

pub fn check_credit(
    directory: &dyn CustomerDirectory,
    customer_id: &str,
) -> Result<CreditCheck, CustomerNotFound> {
    let customer = directory
        .find_by_id(customer_id)
        .ok_or_else(|| not_found(customer_id))?;

    Ok(CreditCheck {
        customer_id: customer.id,
        credit_score: customer.credit_score,
        report_date: CREDIT_REPORT_DATE.to_string(),
    })
}

fn not_found(customer_id: &str) -> CustomerNotFound {
    CustomerNotFound {
        customer_id: customer_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::customers::{Customer, JsonCustomerDirectory};

    fn directory() -> JsonCustomerDirectory {
        JsonCustomerDirectory::from_customers(vec![Customer {
            id: "CUST001".to_string(),
            name: "Arjun Sharma".to_string(),
            phone: "9876543210".to_string(),
            address: "Bandra West, Mumbai".to_string(),
            credit_score: 750,
            pre_approved_limit: 500_000.0,
        }])
    }

    #[test]
    fn test_kyc_unknown_phone() {
        let kyc = verify_customer(&directory(), "0000000000", "Bandra West, Mumbai");

        assert!(!kyc.is_verified());
        assert_eq!(
            serde_json::to_value(&kyc).unwrap(),
            serde_json::json!({"verified": false, "reason": "Customer not found in records"})
        );
    }

    #[test]
    fn test_kyc_address_matches_either_direction_ignoring_case() {
        let partial = verify_customer(&directory(), "9876543210", "bandra west");
        assert!(partial.is_verified());
        assert!(partial.address_match());

        let longer =
            verify_customer(&directory(), "9876543210", "Flat 3, BANDRA WEST, MUMBAI 400050");
        assert!(longer.address_match());
        assert_eq!(longer.customer_id(), Some("CUST001"));
    }

    #[test]
    fn test_kyc_address_mismatch_still_verifies_phone() {
        let kyc = verify_customer(&directory(), "9876543210", "Koramangala, Bengaluru");

        assert_eq!(
            serde_json::to_value(&kyc).unwrap(),
            serde_json::json!({
                "verified": true,
                "phone_match": true,
                "address_match": false,
                "customer_id": "CUST001",
                "customer_name": "Arjun Sharma",
            })
        );
    }

    #[test]
    fn test_offer_for_known_customer() {
        let offer = check_offer(&directory(), "CUST001").unwrap();
        assert_eq!(offer.pre_approved_limit, 500_000.0);
        assert_eq!(offer.product, "Personal Loan");
    }

    #[test]
    fn test_credit_for_known_customer() {
        let credit = check_credit(&directory(), "CUST001").unwrap();
        assert_eq!(credit.credit_score, 750);
        assert_eq!(credit.report_date, "2024-01-01");
    }

    #[test]
    fn test_unknown_customer() {
        let err = check_offer(&directory(), "CUST404").unwrap_err();
        assert_eq!(err.customer_id, "CUST404");
        assert_eq!(err.to_string(), "Customer not found: CUST404");
        assert!(check_credit(&directory(), "CUST404").is_err());
    }
}
