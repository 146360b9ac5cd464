pub mod driver;
pub mod heat_transfer;
pub mod schwarz;
pub mod subdomain;
pub mod tiling;
