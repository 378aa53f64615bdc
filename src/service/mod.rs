//! CrudService: generic CRUD over the resolved model; FormValidator: form coercion.

mod crud;
mod validation;
pub use crud::{CrudService, ListPage};
pub use validation::{coerce_scalar, parse_datetime, FormData, FormValidator, DATETIME_FORMAT};
