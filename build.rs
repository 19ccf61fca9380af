//! Build script for the ON24 Cog.
//!
//! Compiles the Cog wire contract in `proto/cog.proto` into `$OUT_DIR/automaton.cog.rs`,
//! included by `src/proto/mod.rs`. A file descriptor set is written alongside it for the
//! optional gRPC reflection service.
//!
//! Requires the `protoc` compiler on the build host.

use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR")?);
    let proto_root = manifest_dir.join("proto");
    let cog_proto = proto_root.join("cog.proto");

    if !cog_proto.exists() {
        return Err(format!("Proto file not found: {}", cog_proto.display()).into());
    }

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .build_transport(true)
        .file_descriptor_set_path(PathBuf::from(std::env::var("OUT_DIR")?).join("cog_descriptor.bin"))
        .emit_rerun_if_changed(true)
        .compile_protos(&[&cog_proto], &[&proto_root])?;

    println!("cargo:rerun-if-changed={}", proto_root.display());

    Ok(())
}
