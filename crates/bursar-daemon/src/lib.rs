//! bursar-daemon library surface.
//!
//! Exposed as a lib so the scenario tests in `tests/` can build the router
//! in-process and drive it with `tower::ServiceExt::oneshot`.

pub mod api_types;
pub mod routes;
pub mod state;
