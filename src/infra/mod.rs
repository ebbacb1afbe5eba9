pub mod object_store;
pub mod ticket_repo;
