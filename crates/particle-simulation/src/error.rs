use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("failed to create {label}: {source}")]
    ResourceCreation {
        label: &'static str,
        source: wgpu::Error,
    },
    #[error("{label} needs {requested} bytes but the device allows at most {limit}")]
    BufferTooLarge {
        label: &'static str,
        requested: u64,
        limit: u64,
    },
    #[error("layout mismatch in {what}: expected {expected} bytes, found {actual}")]
    LayoutMismatch {
        what: &'static str,
        expected: u64,
        actual: u64,
    },
}

/// Run `build` inside out-of-memory and validation error scopes and report
/// the first error the device raised while it ran.
pub async fn scoped<T>(device: &wgpu::Device, build: impl FnOnce() -> T) -> Result<T, wgpu::Error> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let value = build();

    let validation = device.pop_error_scope().await;
    let out_of_memory = device.pop_error_scope().await;

    match out_of_memory.or(validation) {
        Some(error) => Err(error),
        None => Ok(value),
    }
}
