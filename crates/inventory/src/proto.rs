//! Wire messages for `edible.inventory.service.EdibleInventoryService`.
//!
//! Standard protobuf encoding via prost. The service client and server
//! stubs are generated by `build.rs`.

#[derive(Clone, PartialEq, prost::Message)]
pub struct InventoryItem {
    #[prost(string, tag = "1")]
    pub product_id: String,
    #[prost(uint32, tag = "2")]
    pub quantity: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct InventoryUseRequest {
    #[prost(message, repeated, tag = "1")]
    pub items: Vec<InventoryItem>,
    #[prost(string, tag = "2")]
    pub idempotency_key: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ItemStatus {
    Unspecified = 0,
    Reserved = 1,
    Insufficient = 2,
    UnknownProduct = 3,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ItemOutcome {
    #[prost(string, tag = "1")]
    pub product_id: String,
    #[prost(enumeration = "ItemStatus", tag = "2")]
    pub status: i32,
    #[prost(string, tag = "3")]
    pub reason: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct InventoryUseResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(message, repeated, tag = "2")]
    pub outcomes: Vec<ItemOutcome>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct InventoryReleaseRequest {
    #[prost(string, tag = "1")]
    pub idempotency_key: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct InventoryReleaseResponse {
    #[prost(bool, tag = "1")]
    pub released: bool,
}

include!(concat!(
    env!("OUT_DIR"),
    "/edible.inventory.service.EdibleInventoryService.rs"
));

pub use edible_inventory_service_client::EdibleInventoryServiceClient;
pub use edible_inventory_service_server::{EdibleInventoryService, EdibleInventoryServiceServer};
