//! Canned payloads for datastore and scheduler tests.

/// Sample tenant UUIDs used where tests want stable, readable ids instead
/// of freshly generated ones.
pub mod ids {
    pub const TENANT_A: &str = "11111111-1111-1111-1111-111111111111";
    pub const TENANT_B: &str = "22222222-2222-2222-2222-222222222222";
    pub const WORKLOAD_SMALL: &str = "33333333-3333-3333-3333-333333333333";
    pub const NODE_COMPUTE_A: &str = "44444444-4444-4444-4444-444444444444";
    pub const NODE_NETWORK_A: &str = "55555555-5555-5555-5555-555555555555";
}

/// Sample workload definitions, as a controller would hand them to the
/// scheduler on startup.
pub mod workloads {
    /// A minimal QEMU workload requesting 1 vcpu and 256 MB.
    pub const SMALL_QEMU: &str = r#"
{
  "id": "33333333-3333-3333-3333-333333333333",
  "description": "small test workload",
  "firmware_type": "Efi",
  "hypervisor_type": "Qemu",
  "image_id": "00000000-0000-0000-0000-000000000001",
  "image_name": "test-image",
  "config": {},
  "requested_resources": [
    { "resource_type": "Vcpus", "value": 1, "mandatory": true },
    { "resource_type": "MemoryMb", "value": 256, "mandatory": true }
  ]
}
"#;
}

/// Sample SSNTP wire payloads, in the shape the frame types deserialize.
pub mod frames {
    pub const START: &str = r#"
{
  "instance_uuid": "66666666-6666-6666-6666-666666666666",
  "tenant_uuid": "11111111-1111-1111-1111-111111111111",
  "workload_uuid": "33333333-3333-3333-3333-333333333333"
}
"#;

    pub const START_FAILURE: &str = r#"
{
  "instance_uuid": "66666666-6666-6666-6666-666666666666",
  "reason": "FullCloud",
  "message": "no compute node has capacity"
}
"#;
}
