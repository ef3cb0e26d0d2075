//! Purchase transaction identifiers.

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};

const SUFFIX_LEN: usize = 12;

/// Generates a transaction id of the form `TXN-YYYYMMDD-XXXXXXXXXXXX`.
///
/// The suffix is 12 uppercase alphanumerics; the store's unique index is the final arbiter.
pub fn generate_transaction_id(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();
    format!("TXN-{}-{}", now.format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_transaction_id_shape() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let id = generate_transaction_id(now);

        assert!(id.starts_with("TXN-20240309-"));
        assert_eq!(id.len(), "TXN-20240309-".len() + SUFFIX_LEN);
        assert!(id
            .rsplit('-')
            .next()
            .unwrap()
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_transaction_ids_differ() {
        let now = Utc::now();
        assert_ne!(generate_transaction_id(now), generate_transaction_id(now));
    }
}
