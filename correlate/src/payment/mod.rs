pub mod capture_request;
pub mod capture_response;
