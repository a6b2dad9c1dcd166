pub mod bridge_runtime;
