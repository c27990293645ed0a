//! Club operations on top of the hosted backend.
//!
//! Every operation takes the backend as `&dyn Backend` and, where it needs
//! one, an explicit [`Session`]; nothing here holds global state.

pub mod admin;
pub mod auth;
pub mod contact;
pub mod enrollment;
pub mod session;
pub mod showcase;

pub use enrollment::{Enrollment, EnrollmentError, Step};
pub use session::Session;
