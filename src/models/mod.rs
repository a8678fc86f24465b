mod expectation;
mod outcome;
mod request;
mod summary;

pub use expectation::StatusExpectation;
pub use outcome::Outcome;
pub use request::{HttpResponse, Method, RequestSpec};
pub use summary::Summary;
