pub mod response_dispatcher;
