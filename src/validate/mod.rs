//! Static validation of a built machine.
//!
//! Every rule runs, and all defects are accumulated with
//! [`Validation::all_vec`] so that one report lists everything wrong with a
//! description instead of only the first problem found.

mod defects;
pub mod rules;

pub use defects::{Defect, ValidationReport};
pub use rules::Rule;

use crate::core::Event;
use crate::machine::Machine;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Run every rule against `machine`, accumulating all defects.
pub fn validate<E: Event, C: 'static>(machine: &Machine<E, C>) -> Validation<(), NonEmptyVec<Defect>> {
    let checks: Vec<_> = rules::all().into_iter().map(|rule| rule(machine)).collect();
    Validation::all_vec(checks).map(|_| ())
}

/// [`validate`] folded into a `Result` carrying one combined report.
pub fn check<E: Event, C: 'static>(machine: &Machine<E, C>) -> Result<(), ValidationReport> {
    match validate(machine) {
        Validation::Success(()) => Ok(()),
        Validation::Failure(defects) => Err(ValidationReport::new(defects.iter().cloned().collect())),
    }
}
