//! HTTP adapter for job submission and task polling.

mod dto;
mod handlers;
mod routes;

pub use dto::{ErrorResponse, HealthResponse, LongTripQuery, SubmitTaskRequest, TaskResponse};
pub use handlers::TaskHandlers;
pub use routes::task_routes;
