//! Crate-wide error type.
//!
//! Mirrors the taxonomy of the failure design: configuration and allocation
//! errors are raised at setup time, collective and I/O errors at step
//! boundaries, and `ParticleEscape` flags a migration bug (a particle left
//! outside every rank's extended sub-box after the migration pass).

error_chain! {
    errors {
        ConfigError(msg: String) {
            description("invalid configuration")
            display("invalid configuration: {}", msg)
        }
        AllocationFailure(msg: String) {
            description("allocation failure")
            display("allocation failure: {}", msg)
        }
        CollectiveFailure(msg: String) {
            description("collective communication failure")
            display("collective failure: {}", msg)
        }
        IoFailure(msg: String) {
            description("checkpoint i/o failure")
            display("checkpoint i/o failure: {}", msg)
        }
        ParticleEscape(x: f64, y: f64, z: f64) {
            description("particle escaped its owning rank's sub-box")
            display("particle escaped bounds at ({:.6e}, {:.6e}, {:.6e})", x, y, z)
        }
    }

    foreign_links {
        Io(::std::io::Error);
        Toml(::toml::de::Error);
    }
}
