pub mod assistant;
pub mod billing;
pub mod clients;
pub mod customers;
pub mod estimates;
pub mod labor;
pub mod materials;
pub mod projects;
pub mod roles;
pub mod supplier;
pub mod users;
