// src/wgpu_utils/error_scope.rs
//! Synchronous capture of wgpu validation and out-of-memory errors

/// Runs `f` inside validation and out-of-memory error scopes
///
/// Returns the value of `f` together with the first error either scope
/// caught. The scopes are popped with `pollster::block_on`, which resolves
/// immediately on native backends.
pub fn capture_errors<T>(device: &wgpu::Device, f: impl FnOnce() -> T) -> (T, Option<wgpu::Error>) {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let value = f();

    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());

    (value, validation.or(out_of_memory))
}
