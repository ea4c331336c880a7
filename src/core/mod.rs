pub mod controller;
pub mod payload;
pub mod year_toggle;

pub use crate::domain::model::{FormDocument, FormPayload, SubmitOutcome};
pub use crate::domain::ports::{RosterSource, SubmitTransport};
pub use crate::utils::error::Result;
