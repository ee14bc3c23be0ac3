pub mod key_repo;
