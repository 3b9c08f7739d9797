//! Property-based tests for the row-count and column assertions
//!
//! Each case builds an in-memory database with a generated number of rows
//! and checks that the assertions agree with that count:
//! - existence checks follow whether any row exists
//! - the row-count comparisons hold exactly at their thresholds
//! - single-column matching ignores order but not multiplicity

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use dbassert::assertion::{
        check_if_exists_in_database, check_if_not_exists_in_database, query_for_single_column,
        row_count, row_count_is_0, row_count_is_equal_to_x, row_count_is_greater_than_x,
        row_count_is_less_than_x,
    };
    use dbassert::core::db::{ConnectOptions, ConnectionManager, DbValue, NamedParams};
    use dbassert::DbAssertError;

    // Test infrastructure

    /// Connects to a fresh in-memory database holding `values` in `items(v)`
    fn database_with(values: &[i64]) -> ConnectionManager {
        let mut manager = ConnectionManager::new();
        manager
            .connect("sqlite://", &ConnectOptions::default())
            .unwrap();
        let executor = manager.executor().unwrap();
        executor
            .execute_script("CREATE TABLE items (v INTEGER)")
            .unwrap();
        for value in values {
            executor
                .execute(
                    "INSERT INTO items (v) VALUES (:v)",
                    &NamedParams::new().bind("v", *value),
                )
                .unwrap();
        }
        manager
    }

    const SELECT_ALL: &str = "SELECT v FROM items";

    fn no_params() -> NamedParams {
        NamedParams::new()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_existence_follows_row_count(values in prop::collection::vec(-50i64..50, 0..20)) {
            let db = database_with(&values);

            prop_assert_eq!(row_count(&db, SELECT_ALL, &no_params()).unwrap(), values.len());
            prop_assert_eq!(
                check_if_exists_in_database(&db, SELECT_ALL, &no_params()).is_ok(),
                !values.is_empty()
            );
            prop_assert_eq!(
                check_if_not_exists_in_database(&db, SELECT_ALL, &no_params()).is_ok(),
                values.is_empty()
            );
            prop_assert_eq!(row_count_is_0(&db, SELECT_ALL, &no_params()).is_ok(), values.is_empty());
        }

        #[test]
        fn prop_row_count_thresholds(n in 0usize..25) {
            let values: Vec<i64> = (0..n as i64).collect();
            let db = database_with(&values);
            let n = n as i64;

            prop_assert!(row_count_is_equal_to_x(&db, SELECT_ALL, &n.to_string(), &no_params()).is_ok());
            prop_assert!(row_count_is_equal_to_x(&db, SELECT_ALL, &(n + 1).to_string(), &no_params()).is_err());
            prop_assert!(row_count_is_greater_than_x(&db, SELECT_ALL, &(n - 1).to_string(), &no_params()).is_ok());
            prop_assert!(row_count_is_greater_than_x(&db, SELECT_ALL, &n.to_string(), &no_params()).is_err());
            prop_assert!(row_count_is_less_than_x(&db, SELECT_ALL, &(n + 1).to_string(), &no_params()).is_ok());
            prop_assert!(row_count_is_less_than_x(&db, SELECT_ALL, &n.to_string(), &no_params()).is_err());
        }

        #[test]
        fn prop_single_column_ignores_order(
            values in prop::collection::vec(0i64..5, 1..12).prop_shuffle()
        ) {
            let db = database_with(&values);

            let mut expected: Vec<DbValue> = values.iter().map(|v| DbValue::Integer(*v)).collect();
            expected.reverse();
            let column = query_for_single_column(&db, SELECT_ALL, &expected, &no_params()).unwrap();
            prop_assert_eq!(column.len(), values.len());

            // Dropping one expected value breaks the multiset match
            expected.pop();
            match query_for_single_column(&db, SELECT_ALL, &expected, &no_params()) {
                Err(DbAssertError::AssertionFailed(_)) => {}
                other => prop_assert!(false, "Expected AssertionFailed, got {:?}", other),
            }
        }

        #[test]
        fn prop_unparsable_threshold_is_value_error(text in "[a-z]{1,8}") {
            let db = database_with(&[1, 2]);
            match row_count_is_equal_to_x(&db, SELECT_ALL, &text, &no_params()) {
                Err(DbAssertError::Value(_)) => {}
                other => prop_assert!(false, "Expected Value error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_text_thresholds_are_trimmed() {
        let db = database_with(&[1, 2, 3]);
        row_count_is_equal_to_x(&db, SELECT_ALL, " 3 ", &no_params()).unwrap();
        row_count_is_greater_than_x(&db, SELECT_ALL, "-1", &no_params()).unwrap();
    }
}
