/// # Test Utilities Module
///
/// Shared fixtures for keyword-level tests:
/// - an in-memory `person` database driven through `KeywordLibrary`
/// - helpers for checking `DbAssertError` variants and messages

use crate::core::{DbAssertError, Result};
use crate::keywords::{KeywordLibrary, KeywordOutput};

pub const PERSON_SCHEMA: &str = "
    CREATE TABLE person (
        id INTEGER PRIMARY KEY,
        first_name VARCHAR(20),
        last_name VARCHAR(20)
    );
";

/// A connected library with the `person` table loaded
pub struct PersonFixture {
    pub library: KeywordLibrary,
}

impl PersonFixture {
    /// Empty `person` table
    pub fn empty() -> Result<Self> {
        let mut library = KeywordLibrary::new();
        library.run_keyword("Connect To Database", &cells(&["sqlite://"]))?;
        library.connection().executor()?.execute_script(PERSON_SCHEMA)?;
        Ok(PersonFixture { library })
    }

    /// One row: (1, 'Franz Allan', 'See')
    pub fn new() -> Result<Self> {
        let mut fixture = Self::empty()?;
        fixture.insert(1, "Franz Allan", "See")?;
        Ok(fixture)
    }

    /// Two rows: Franz Allan See and Jerry Schneider
    pub fn with_two_people() -> Result<Self> {
        let mut fixture = Self::new()?;
        fixture.insert(2, "Jerry", "Schneider")?;
        Ok(fixture)
    }

    pub fn insert(&mut self, id: i64, first_name: &str, last_name: &str) -> Result<()> {
        self.library.run_keyword(
            "Execute Sql String",
            &cells(&[
                "INSERT INTO person VALUES (:id, :first_name, :last_name)",
                &format!("id={}", id),
                &format!("first_name={}", first_name),
                &format!("last_name={}", last_name),
            ]),
        )?;
        Ok(())
    }

    /// Runs a keyword with string cells
    pub fn run(&mut self, keyword: &str, args: &[&str]) -> Result<KeywordOutput> {
        self.library.run_keyword(keyword, &cells(args))
    }
}

pub fn cells(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// Error testing utilities specific to DbAssertError patterns
pub mod error_testing {
    use super::DbAssertError;

    /// Asserts an assertion failure whose message contains `fragment`
    pub fn assert_failure_contains<T: std::fmt::Debug>(
        result: &Result<T, DbAssertError>,
        fragment: &str,
    ) {
        match result {
            Err(DbAssertError::AssertionFailed(message)) => assert!(
                message.contains(fragment),
                "Expected '{}' in failure message '{}'",
                fragment,
                message
            ),
            other => panic!("Expected AssertionFailed containing '{}', got {:?}", fragment, other),
        }
    }
}

/// Matches a result against a `DbAssertError` variant pattern
#[macro_export]
macro_rules! assert_db_error {
    ($result:expr, $error_variant:pat, $context:expr) => {
        match $result {
            Err($error_variant) => {}
            Ok(value) => panic!("Expected error but got Ok({:?}) in {}", value, $context),
            Err(other) => panic!(
                "Expected {} but got {:?} in {}",
                stringify!($error_variant),
                other,
                $context
            ),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_fixture() {
        let mut fixture = PersonFixture::with_two_people().unwrap();
        let output = fixture
            .run("Query", &["SELECT id, first_name FROM person ORDER BY id"])
            .unwrap();
        assert_eq!(output.to_string(), "[(1, 'Franz Allan'), (2, 'Jerry')]");
    }

    #[test]
    fn test_empty_fixture() {
        let mut fixture = PersonFixture::empty().unwrap();
        fixture.run("Row Count Is 0", &["SELECT * FROM person"]).unwrap();
    }
}
