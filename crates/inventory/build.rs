fn main() {
    // Client and server stubs for the remote inventory service. Messages are
    // hand-written prost structs in `src/proto.rs`, so no protoc is needed.
    let service = tonic_build::manual::Service::builder()
        .name("EdibleInventoryService")
        .package("edible.inventory.service")
        .method(
            tonic_build::manual::Method::builder()
                .name("use_inventory")
                .route_name("Use")
                .input_type("crate::proto::InventoryUseRequest")
                .output_type("crate::proto::InventoryUseResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .method(
            tonic_build::manual::Method::builder()
                .name("release")
                .route_name("Release")
                .input_type("crate::proto::InventoryReleaseRequest")
                .output_type("crate::proto::InventoryReleaseResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build();

    tonic_build::manual::Builder::new().compile(&[service]);
}
