//! Crate-wide error type unifying every pipeline stage's failures.

use std::fmt;

use crate::driver::DriverError;
use crate::info::DescriptorError;
use crate::property::ParseError;

/// Everything that can go wrong while compiling a property, tagged by the
/// taxonomy in the driving specification (descriptor/property parsing,
/// elimination, emission, and the external-process driver).
#[derive(Debug)]
pub enum SliverError {
    /// The system descriptor blob could not be parsed.
    ParseDescriptor(DescriptorError),
    /// The property string could not be parsed.
    ParseProperty(ParseError),
    /// The same quantified name was bound twice along one path to a leaf.
    DuplicateBinding { var: String },
    /// An `Of` node referenced an agent variable that no enclosing
    /// quantifier bound.
    UnboundAgent { var: String },
    /// A fresh variable introduced by elimination could not be resolved
    /// through `Info::lookup_var`.
    UnknownVariable { var: String },
    /// The property's modality was not one of the four supported ones.
    UnsupportedModality { modality: String },
    /// An `Of` or `Quant` node survived into the emitter; elimination must
    /// have produced it in error.
    InternalError { detail: String },
    /// The external translator or model checker failed.
    Driver(DriverError),
}

impl fmt::Display for SliverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SliverError::ParseDescriptor(e) => write!(f, "invalid descriptor: {e}"),
            SliverError::ParseProperty(e) => write!(f, "invalid property: {e}"),
            SliverError::DuplicateBinding { var } => {
                write!(f, "variable '{var}' is bound by more than one quantifier")
            }
            SliverError::UnboundAgent { var } => {
                write!(f, "'{var}' is not bound by any enclosing quantifier")
            }
            SliverError::UnknownVariable { var } => {
                write!(f, "no variable named '{var}' in this system")
            }
            SliverError::UnsupportedModality { modality } => {
                write!(f, "unsupported modality '{modality}'")
            }
            SliverError::InternalError { detail } => write!(f, "internal error: {detail}"),
            SliverError::Driver(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SliverError {}

impl From<DescriptorError> for SliverError {
    fn from(e: DescriptorError) -> Self {
        SliverError::ParseDescriptor(e)
    }
}

impl From<ParseError> for SliverError {
    fn from(e: ParseError) -> Self {
        SliverError::ParseProperty(e)
    }
}

impl From<DriverError> for SliverError {
    fn from(e: DriverError) -> Self {
        SliverError::Driver(e)
    }
}

/// A non-fatal condition surfaced during elimination: logged by callers,
/// never raised as an `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A quantifier ranged over a type with no agents in the spawn table;
    /// emission proceeds with an empty conjunction/disjunction.
    EmptyQuantifierDomain { var: String, typename: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::EmptyQuantifierDomain { var, typename } => write!(
                f,
                "no agents of type '{typename}' are spawned; quantifier over '{var}' is vacuous"
            ),
        }
    }
}
