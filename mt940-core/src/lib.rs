pub mod amount;
pub mod details;
pub mod error;
pub mod group;
pub mod model;
pub mod tags;
pub mod validation;
pub mod visitor;

pub use crate::details::StructuredDetails;
pub use crate::error::{BuildError, Mt940Error, ValidationError};
pub use crate::group::{read_statements, split_groups};
pub use crate::model::{
    Balance, Currency, Direction, RawTag, Statement, StatementNumber, Transaction,
};
pub use crate::tags::{StatementLine, Tag, TagFields, TagKind};
pub use crate::validation::validate_group;
pub use crate::visitor::{BuildOptions, StatementVisitor, build_statement};
