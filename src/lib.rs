// Library for tests to access modules

pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod poller;
pub mod port_table;
pub mod routes;
pub mod snmp_repo;
pub mod store;
