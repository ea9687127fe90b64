//! Personnel number allocation.
//!
//! New numbers continue from the highest purely-numeric pernr already in
//! use, never below 30000. Legacy alphanumeric identifiers are ignored.
//! Callers must hold the allocation lock (see `create_employee`) so two
//! concurrent creates cannot observe the same maximum.

pub const PERNR_FLOOR: u64 = 30_000;

pub fn next_pernr<I>(existing: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let max_numeric = existing
        .into_iter()
        .filter(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|id| id.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    (max_numeric + 1).max(PERNR_FLOOR).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_floor_for_empty_pool() {
        assert_eq!(next_pernr(Vec::new()), "30000");
    }

    #[test]
    fn continues_from_highest_numeric() {
        let ids = vec!["30000".to_string(), "30007".to_string(), "30003".to_string()];
        assert_eq!(next_pernr(ids), "30008");
    }

    #[test]
    fn ignores_non_numeric_legacy_ids() {
        let ids = vec![
            "A1234".to_string(),
            "00x99".to_string(),
            String::new(),
            "+4711".to_string(),
        ];
        assert_eq!(next_pernr(ids), "30000");
    }

    #[test]
    fn numeric_ids_below_floor_do_not_lower_the_result() {
        let ids = vec!["12345".to_string(), "29999".to_string()];
        assert_eq!(next_pernr(ids), "30000");
    }

    #[test]
    fn sequential_allocation_is_gap_free() {
        let mut pool: Vec<String> = Vec::new();
        for expected in 30000..30005_u64 {
            let next = next_pernr(pool.clone());
            assert_eq!(next, expected.to_string());
            pool.push(next);
        }
    }
}
