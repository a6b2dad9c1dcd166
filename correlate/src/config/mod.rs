pub mod bridge_config;
