//! Assertion layer: every check either passes or fails the whole scenario
//! with a context string naming the step and the mismatched value.

use std::fmt::Debug;

use crate::{Result, ScenarioError};

/// Require `actual == expected`, failing the scenario otherwise.
pub fn expect_eq<T: PartialEq + Debug>(actual: &T, expected: &T, context: &str) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(ScenarioError::Assertion {
            context: context.to_string(),
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        })
    }
}

/// Require `condition`, failing the scenario otherwise.
pub fn expect_true(condition: bool, context: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(ScenarioError::Assertion {
            context: context.to_string(),
            expected: "true".to_string(),
            actual: "false".to_string(),
        })
    }
}
