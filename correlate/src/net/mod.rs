pub mod bus;
pub mod correlation_id;
pub mod in_memory_bus;
pub mod random_correlation_id_generator;
mod induced_failure;
