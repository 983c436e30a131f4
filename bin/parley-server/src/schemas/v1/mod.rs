//! `/api/v1` request / response types.

pub mod conversations;
pub mod users;
