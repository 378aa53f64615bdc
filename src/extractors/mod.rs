//! Request extractors.

mod view;
pub use view::{AdminView, VIEW_PARAM};
