//! Generated Cog wire types plus conversions to and from the domain types.

pub mod conversions;

#[allow(clippy::all, clippy::pedantic)]
pub mod v1 {
    tonic::include_proto!("automaton.cog");

    /// Encoded descriptors for the reflection service.
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("cog_descriptor");
}
