pub mod blueprint;
pub mod client;
pub mod customer;
pub mod estimate;
pub mod estimate_material;
pub mod invoice;
pub mod labor_rate;
pub mod material;
pub mod material_price_history;
pub mod project;
pub mod role;
pub mod subscription;
pub mod user;
